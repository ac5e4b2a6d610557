//! Hazard conditions and the catalogue of persisted indicators
//!
//! Conditions are evaluated cell by cell and timestep by timestep. All
//! comparisons are strict, and a NaN input never satisfies a condition.

use crate::config::Thresholds;
use crate::errors::{HazardError, Result};
use crate::field::Field;
use crate::statistics::AnnualStatistic;
use crate::units::Unit;
use ndarray::{Array3, Zip};

/// Wind speed `sqrt(u² + v²)` from the two horizontal components.
///
/// Both components are brought to m/s first and must share one grid. They
/// are consumed, so their storage is released once the speed exists.
///
/// # Errors
///
/// Returns an error if either component has non-speed units or the grids differ.
pub fn wind_speed(u: Field, v: Field) -> Result<Field> {
    let u = u.convert_units(Unit::MetrePerSecond)?;
    let v = v.convert_units(Unit::MetrePerSecond)?;
    u.ensure_aligned(&v)?;

    let speed = Zip::from(u.data())
        .and(v.data())
        .par_map_collect(|&a, &b| (a * a + b * b).sqrt());

    Ok(Field::new(
        "wspd",
        speed,
        u.times().to_vec(),
        u.grid().clone(),
        Unit::MetrePerSecond.symbol(),
    )?
    .with_metadata(Unit::MetrePerSecond.symbol(), "Wind Speed"))
}

/// Blizzard days: temperature below, snow depth above and wind speed above
/// their limits at the same time.
///
/// # Errors
///
/// Returns an error if the fields are not in degC, cm and m/s, or are not
/// aligned.
pub fn blizzard_mask(
    temperature: &Field,
    snow_depth: &Field,
    wind: &Field,
    thresholds: &Thresholds,
) -> Result<Array3<bool>> {
    expect_units(temperature, Unit::Celsius)?;
    expect_units(snow_depth, Unit::Centimetre)?;
    expect_units(wind, Unit::MetrePerSecond)?;
    temperature.ensure_aligned(snow_depth)?;
    temperature.ensure_aligned(wind)?;

    let t_lim = thresholds.temperature_limit;
    let s_lim = thresholds.snow_limit;
    let w_lim = thresholds.wind_gust_limit;

    Ok(Zip::from(temperature.data())
        .and(snow_depth.data())
        .and(wind.data())
        .par_map_collect(|&t, &s, &w| t < t_lim && s > s_lim && w > w_lim))
}

/// Days with snow depth strictly above `limit_cm`.
///
/// # Errors
///
/// Returns an error if `snow_depth` is not in cm.
pub fn exceedance_mask(snow_depth: &Field, limit_cm: f32) -> Result<Array3<bool>> {
    expect_units(snow_depth, Unit::Centimetre)?;
    Ok(Zip::from(snow_depth.data()).par_map_collect(|&s| s > limit_cm))
}

fn expect_units(field: &Field, unit: Unit) -> Result<()> {
    if Unit::parse(field.units()) == Some(unit) {
        Ok(())
    } else {
        Err(HazardError::UnitConversion {
            from: field.units().to_string(),
            to: unit.symbol().to_string(),
        })
    }
}

/// Hazard a condition mask describes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Hazard {
    Blizzard,
    /// Snow depth above the given limit (cm)
    SnowDays { limit_cm: f32 },
}

/// One persisted output: a hazard reduced with an annual statistic
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Indicator {
    pub hazard: Hazard,
    pub statistic: AnnualStatistic,
}

impl Hazard {
    /// Every hazard evaluated for the given thresholds: blizzard first, then
    /// one snow-day hazard per configured limit.
    #[must_use]
    pub fn all(thresholds: &Thresholds) -> Vec<Hazard> {
        std::iter::once(Hazard::Blizzard)
            .chain(
                thresholds
                    .snow_day_limits
                    .iter()
                    .map(|&limit_cm| Hazard::SnowDays { limit_cm }),
            )
            .collect()
    }

    /// The count and probability indicators of this hazard
    #[must_use]
    pub const fn indicators(self) -> [Indicator; 2] {
        [
            Indicator {
                hazard: self,
                statistic: AnnualStatistic::Count,
            },
            Indicator {
                hazard: self,
                statistic: AnnualStatistic::Probability,
            },
        ]
    }
}

impl Indicator {
    /// All outputs for the given thresholds, in the order they are produced.
    #[must_use]
    pub fn catalogue(thresholds: &Thresholds) -> Vec<Indicator> {
        Hazard::all(thresholds)
            .into_iter()
            .flat_map(Hazard::indicators)
            .collect()
    }

    /// Output file name
    #[must_use]
    pub fn file_name(&self) -> String {
        match (self.hazard, self.statistic) {
            (Hazard::Blizzard, AnnualStatistic::Count) => "BdayCount_annual_mean.nc".to_string(),
            (Hazard::Blizzard, AnnualStatistic::Probability) => {
                "BdayCount_AnaProb_mean.nc".to_string()
            }
            (Hazard::SnowDays { limit_cm }, AnnualStatistic::Count) => {
                format!("snow{}Count_annual_mean.nc", limit_label(limit_cm))
            }
            (Hazard::SnowDays { limit_cm }, AnnualStatistic::Probability) => {
                format!("snow{}Prob_annual_mean.nc", limit_label(limit_cm))
            }
        }
    }

    /// NetCDF variable holding the grid
    #[must_use]
    pub const fn variable_name(&self) -> &'static str {
        match self.hazard {
            Hazard::Blizzard => "blizzard_days",
            Hazard::SnowDays { .. } => "snow_days",
        }
    }

    #[must_use]
    pub const fn units(&self) -> &'static str {
        self.statistic.output_units()
    }

    /// `long_name` attribute
    #[must_use]
    pub fn long_name(&self) -> String {
        let quantity = match self.statistic {
            AnnualStatistic::Count => "Annual number",
            AnnualStatistic::Probability => "Annual probability",
        };
        match self.hazard {
            Hazard::Blizzard => format!("{quantity} of blizzard days"),
            Hazard::SnowDays { limit_cm } => {
                format!("{quantity} of snow days (snow depth > {limit_cm} cm)")
            }
        }
    }
}

/// `6.0` -> `"6"`, `12.5` -> `"12p5"`
fn limit_label(limit_cm: f32) -> String {
    format!("{limit_cm}").replace('.', "p")
}
