//! Gridded, time-indexed scalar fields
//!
//! A [`Field`] owns a `(time, latitude, longitude)` array together with its
//! coordinates and descriptive metadata. Fields that are combined cell by
//! cell must be on the same grid; [`Field::ensure_aligned`] enforces that.

use crate::errors::{HazardError, Result};
use crate::time_axis::years_of;
use crate::units::{Conversion, Unit};
use chrono::NaiveDateTime;
use ndarray::{concatenate, Array3, ArrayView3, Axis};
use std::collections::HashSet;

const COORD_TOLERANCE: f64 = 1e-6;

/// Horizontal grid shared by all fields of a run
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
}

impl Grid {
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.latitudes.len(), self.longitudes.len())
    }

    fn matches(&self, other: &Grid) -> bool {
        coords_match(&self.latitudes, &other.latitudes)
            && coords_match(&self.longitudes, &other.longitudes)
    }
}

/// Basic statistics over the finite values of a field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSummary {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub valid: usize,
    pub total: usize,
}

/// A (time, lat, lon) field with units and metadata
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    data: Array3<f32>,
    times: Vec<NaiveDateTime>,
    grid: Grid,
    units: String,
    description: String,
}

impl Field {
    /// Assemble a field, checking that coordinates match the array shape.
    ///
    /// # Errors
    ///
    /// Returns [`HazardError::InvalidShape`] if any coordinate length differs
    /// from the corresponding array axis.
    pub fn new(
        name: impl Into<String>,
        data: Array3<f32>,
        times: Vec<NaiveDateTime>,
        grid: Grid,
        units: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let (nt, nlat, nlon) = data.dim();
        if times.len() != nt || grid.latitudes.len() != nlat || grid.longitudes.len() != nlon {
            return Err(HazardError::InvalidShape {
                var: name,
                message: format!(
                    "array shape ({nt}, {nlat}, {nlon}) does not match coordinates ({}, {}, {})",
                    times.len(),
                    grid.latitudes.len(),
                    grid.longitudes.len()
                ),
            });
        }
        Ok(Self {
            name,
            data,
            times,
            grid,
            units: units.into(),
            description: String::new(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn units(&self) -> &str {
        &self.units
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn data(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    #[must_use]
    pub fn times(&self) -> &[NaiveDateTime] {
        &self.times
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// `(time, lat, lon)` lengths
    #[must_use]
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Calendar year of every timestep
    #[must_use]
    pub fn years(&self) -> Vec<i32> {
        years_of(&self.times)
    }

    /// Replace units and description without touching the values
    #[must_use]
    pub fn with_metadata(mut self, units: impl Into<String>, description: impl Into<String>) -> Self {
        self.units = units.into();
        self.description = description.into();
        self
    }

    /// Convert the values to `target` units, consuming the field.
    ///
    /// # Errors
    ///
    /// Returns [`HazardError::UnitConversion`] when the current units are
    /// unknown or measure a different quantity.
    pub fn convert_units(mut self, target: Unit) -> Result<Self> {
        let conversion = Conversion::from_str_to(&self.units, target)?;
        conversion.apply_inplace(&mut self.data);
        self.units = target.symbol().to_string();
        Ok(self)
    }

    /// Check that `other` lies on the same grid and time axis.
    ///
    /// # Errors
    ///
    /// Returns [`HazardError::GridMismatch`] naming both fields.
    pub fn ensure_aligned(&self, other: &Field) -> Result<()> {
        if self.dim() != other.dim() {
            return Err(HazardError::GridMismatch {
                message: format!(
                    "'{}' has shape {:?} but '{}' has shape {:?}",
                    self.name,
                    self.dim(),
                    other.name,
                    other.dim()
                ),
            });
        }
        if self.times != other.times {
            return Err(HazardError::GridMismatch {
                message: format!("'{}' and '{}' have different time axes", self.name, other.name),
            });
        }
        if !self.grid.matches(&other.grid) {
            return Err(HazardError::GridMismatch {
                message: format!(
                    "'{}' and '{}' have different latitude/longitude coordinates",
                    self.name, other.name
                ),
            });
        }
        Ok(())
    }

    /// Join fields of consecutive periods along the time axis.
    ///
    /// # Errors
    ///
    /// Returns [`HazardError::GridMismatch`] when the parts differ in grid or
    /// units or share a timestamp, and [`HazardError::InvalidShape`] for an
    /// empty list.
    pub fn concat_time(parts: Vec<Field>) -> Result<Field> {
        let mut iter = parts.into_iter();
        let first = iter.next().ok_or_else(|| HazardError::InvalidShape {
            var: "<none>".to_string(),
            message: "no parts to concatenate".to_string(),
        })?;
        let rest: Vec<Field> = iter.collect();
        if rest.is_empty() {
            return Ok(first);
        }

        for part in &rest {
            if !first.grid.matches(&part.grid) {
                return Err(HazardError::GridMismatch {
                    message: format!("parts of '{}' use different spatial grids", first.name),
                });
            }
            if part.units != first.units {
                return Err(HazardError::GridMismatch {
                    message: format!(
                        "parts of '{}' use different units ('{}' vs '{}')",
                        first.name, first.units, part.units
                    ),
                });
            }
        }

        let views: Vec<ArrayView3<'_, f32>> = std::iter::once(first.data.view())
            .chain(rest.iter().map(|p| p.data.view()))
            .collect();
        let data = concatenate(Axis(0), &views)?;

        let mut times = first.times.clone();
        for part in &rest {
            times.extend_from_slice(&part.times);
        }

        // Overlapping parts would count the same day twice.
        let mut seen = HashSet::with_capacity(times.len());
        if let Some(duplicate) = times.iter().find(|t| !seen.insert(**t)) {
            return Err(HazardError::GridMismatch {
                message: format!(
                    "parts of '{}' overlap in time, {} appears more than once",
                    first.name, duplicate
                ),
            });
        }

        Ok(Field {
            name: first.name.clone(),
            data,
            times,
            grid: first.grid.clone(),
            units: first.units.clone(),
            description: first.description.clone(),
        })
    }

    /// Min/mean/max over finite values
    #[must_use]
    pub fn summary(&self) -> FieldSummary {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0_f64;
        let mut valid = 0_usize;
        for &x in self.data.iter().filter(|x| x.is_finite()) {
            min = min.min(x);
            max = max.max(x);
            sum += f64::from(x);
            valid += 1;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        let mean = if valid > 0 {
            (sum / valid as f64) as f32
        } else {
            f32::NAN
        };
        if valid == 0 {
            min = f32::NAN;
            max = f32::NAN;
        }
        FieldSummary {
            min,
            max,
            mean,
            valid,
            total: self.data.len(),
        }
    }
}

fn coords_match(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| (x - y).abs() <= COORD_TOLERANCE || (x.is_nan() && y.is_nan()))
}
