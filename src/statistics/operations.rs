//! Per-year reductions of condition masks
//!
//! This module defines the annual statistics and the [`AnnualAggregate`]
//! they produce, plus the zero-masking and climatological-mean steps that
//! turn an aggregate into a single long-term grid.

use crate::errors::{HazardError, Result};
use ndarray::{Array2, Array3};
use std::collections::BTreeMap;

/// Supported annual statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnualStatistic {
    /// Number of qualifying timesteps per year
    Count,
    /// Fraction of timesteps per year that qualify
    Probability,
}

impl AnnualStatistic {
    /// Units of the persisted climatological mean
    #[must_use]
    pub const fn output_units(self) -> &'static str {
        match self {
            Self::Count => "number",
            Self::Probability => "%",
        }
    }

    /// Factor applied to the climatological mean before it is persisted
    #[must_use]
    pub const fn output_scale(self) -> f32 {
        match self {
            Self::Count => 1.0,
            Self::Probability => 100.0,
        }
    }
}

/// Timesteps belonging to one calendar year
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearGroup {
    pub year: i32,
    pub indices: Vec<usize>,
}

/// Group timestep indices by calendar year, in ascending year order.
#[must_use]
pub fn group_by_year(years: &[i32]) -> Vec<YearGroup> {
    let mut groups: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (t, &year) in years.iter().enumerate() {
        groups.entry(year).or_default().push(t);
    }
    groups
        .into_iter()
        .map(|(year, indices)| YearGroup { year, indices })
        .collect()
}

/// A `(year, lat, lon)` reduction of a condition mask
#[derive(Debug, Clone)]
pub struct AnnualAggregate {
    /// Aggregated values; NaN marks masked cells
    pub data: Array3<f32>,
    /// Calendar year of every slice along axis 0
    pub years: Vec<i32>,
    /// Timesteps that contributed to every year
    pub timesteps_per_year: Vec<usize>,
    pub statistic: AnnualStatistic,
}

impl AnnualAggregate {
    /// Replace every exact zero with NaN.
    ///
    /// A zero count cannot be told apart from a cell without data afterwards.
    /// Masking twice yields the same result as masking once.
    #[must_use]
    pub fn mask_zeros(mut self) -> Self {
        self.data = super::parallel::mask_zeros(self.data);
        self
    }

    /// Multiply every value by `factor`; NaN stays NaN.
    #[must_use]
    pub fn scaled(mut self, factor: f32) -> Self {
        if factor != 1.0 {
            self.data.par_mapv_inplace(|x| x * factor);
        }
        self
    }

    /// Mean over the year axis, skipping masked years.
    ///
    /// A cell masked in every year stays NaN.
    ///
    /// # Errors
    ///
    /// Returns [`HazardError::StatisticsError`] when the aggregate holds no years.
    pub fn climatological_mean(&self) -> Result<Array2<f32>> {
        if self.years.is_empty() {
            return Err(HazardError::StatisticsError(
                "cannot average an aggregate with no years".to_string(),
            ));
        }
        Ok(super::parallel::parallel_nanmean_years(&self.data))
    }

    /// First and last year covered
    #[must_use]
    pub fn period(&self) -> Option<(i32, i32)> {
        Some((*self.years.first()?, *self.years.last()?))
    }
}

/// Trait for condition masks that can be reduced per calendar year
pub trait AnnualReduction {
    /// Reduce along the time axis, one slice per calendar year.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `years` does not have one entry per timestep
    /// - the mask has no timesteps
    fn reduce_by_year(&self, years: &[i32], statistic: AnnualStatistic)
        -> Result<AnnualAggregate>;
}

impl AnnualReduction for Array3<bool> {
    fn reduce_by_year(
        &self,
        years: &[i32],
        statistic: AnnualStatistic,
    ) -> Result<AnnualAggregate> {
        let nt = self.dim().0;
        if years.len() != nt {
            return Err(HazardError::StatisticsError(format!(
                "{} year labels for {} timesteps",
                years.len(),
                nt
            )));
        }
        if nt == 0 {
            return Err(HazardError::StatisticsError(
                "condition mask has no timesteps".to_string(),
            ));
        }

        let groups = group_by_year(years);
        let counts = super::parallel::parallel_count_by_year(self.view(), &groups)?;

        let data = match statistic {
            AnnualStatistic::Count => counts,
            AnnualStatistic::Probability => {
                super::parallel::counts_to_fractions(counts, &groups)
            }
        };

        Ok(AnnualAggregate {
            data,
            years: groups.iter().map(|g| g.year).collect(),
            timesteps_per_year: groups.iter().map(|g| g.indices.len()).collect(),
            statistic,
        })
    }
}
