//! Run configuration: hazard thresholds and input sources
//!
//! Defaults reproduce the ERA5-Land setup the indicators were defined for.
//! A JSON file may override any subset of fields.

use crate::errors::{HazardError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Physical limits defining the hazard conditions.
///
/// All comparisons against these limits are strict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Blizzard requires temperature below this value (degC)
    pub temperature_limit: f32,
    /// Blizzard requires snow depth above this value (cm)
    pub snow_limit: f32,
    /// Blizzard requires wind speed above this value (m/s)
    pub wind_gust_limit: f32,
    /// Heavy-snowfall limits (cm), one pair of outputs per entry
    pub snow_day_limits: Vec<f32>,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            temperature_limit: 0.0,
            snow_limit: 10.0,
            wind_gust_limit: 17.0,
            snow_day_limits: vec![6.0, 25.0],
        }
    }
}

impl Thresholds {
    /// Check that every limit is usable.
    ///
    /// # Errors
    ///
    /// Returns [`HazardError::InvalidConfig`] for non-finite limits, negative
    /// snow limits, or an empty or repeating `snow_day_limits` list.
    pub fn validate(&self) -> Result<()> {
        let named = [
            ("temperature_limit", self.temperature_limit),
            ("snow_limit", self.snow_limit),
            ("wind_gust_limit", self.wind_gust_limit),
        ];
        for (name, value) in named {
            if !value.is_finite() {
                return Err(invalid(format!("{name} must be finite, got {value}")));
            }
        }
        if self.snow_limit < 0.0 {
            return Err(invalid(format!(
                "snow_limit must be non-negative, got {}",
                self.snow_limit
            )));
        }
        if self.snow_day_limits.is_empty() {
            return Err(invalid("snow_day_limits must not be empty".to_string()));
        }
        for (i, &limit) in self.snow_day_limits.iter().enumerate() {
            if !limit.is_finite() || limit < 0.0 {
                return Err(invalid(format!(
                    "snow_day_limits entries must be finite and non-negative, got {limit}"
                )));
            }
            if self.snow_day_limits[..i].contains(&limit) {
                return Err(invalid(format!(
                    "snow_day_limits lists {limit} more than once"
                )));
            }
        }
        Ok(())
    }
}

/// Where one physical quantity is read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSource {
    /// File name pattern inside the input directory (`*` and `?` wildcards)
    pub pattern: String,
    /// NetCDF variable name
    pub variable: String,
    /// Units used when the variable carries no `units` attribute
    pub assumed_units: String,
}

impl VariableSource {
    pub fn new(
        pattern: impl Into<String>,
        variable: impl Into<String>,
        assumed_units: impl Into<String>,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            variable: variable.into(),
            assumed_units: assumed_units.into(),
        }
    }

    fn validate(&self, role: &str) -> Result<()> {
        if self.pattern.trim().is_empty() {
            return Err(invalid(format!("{role}.pattern must not be empty")));
        }
        if self.variable.trim().is_empty() {
            return Err(invalid(format!("{role}.variable must not be empty")));
        }
        Ok(())
    }
}

/// The four source fields of the pipeline.
///
/// When deserialized, each role starts from its default source and only the
/// fields present in the input replace it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PartialInputs")]
pub struct InputSources {
    pub u_wind: VariableSource,
    pub v_wind: VariableSource,
    pub temperature: VariableSource,
    pub snow_depth: VariableSource,
}

impl Default for InputSources {
    fn default() -> Self {
        Self {
            u_wind: VariableSource::new(
                "10m_u_component_of_wind_DMIN_era5Land_202*.nc",
                "u10",
                "m s-1",
            ),
            v_wind: VariableSource::new(
                "10m_v_component_of_wind_DMIN_era5Land_202*.nc",
                "v10",
                "m s-1",
            ),
            temperature: VariableSource::new("2m_temperature_DMIN_era5Land_202*.nc", "t2m", "K"),
            snow_depth: VariableSource::new("snow_depth_DMIN_era5Land_202*.nc", "sde", "m"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PartialSource {
    pattern: Option<String>,
    variable: Option<String>,
    assumed_units: Option<String>,
}

impl PartialSource {
    fn merged_onto(self, base: VariableSource) -> VariableSource {
        VariableSource {
            pattern: self.pattern.unwrap_or(base.pattern),
            variable: self.variable.unwrap_or(base.variable),
            assumed_units: self.assumed_units.unwrap_or(base.assumed_units),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PartialInputs {
    u_wind: PartialSource,
    v_wind: PartialSource,
    temperature: PartialSource,
    snow_depth: PartialSource,
}

impl From<PartialInputs> for InputSources {
    fn from(partial: PartialInputs) -> Self {
        let base = InputSources::default();
        Self {
            u_wind: partial.u_wind.merged_onto(base.u_wind),
            v_wind: partial.v_wind.merged_onto(base.v_wind),
            temperature: partial.temperature.merged_onto(base.temperature),
            snow_depth: partial.snow_depth.merged_onto(base.snow_depth),
        }
    }
}

/// Complete configuration of a pipeline run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardConfig {
    pub thresholds: Thresholds,
    pub inputs: InputSources,
}

impl HazardConfig {
    /// Load a configuration from a JSON file. Missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails [`HazardConfig::validate`].
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Parse and validate a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`HazardError::ConfigParse`] or [`HazardError::InvalidConfig`].
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate thresholds and input sources.
    ///
    /// # Errors
    ///
    /// Returns [`HazardError::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        self.inputs.u_wind.validate("u_wind")?;
        self.inputs.v_wind.validate("v_wind")?;
        self.inputs.temperature.validate("temperature")?;
        self.inputs.snow_depth.validate("snow_depth")?;
        Ok(())
    }
}

fn invalid(message: String) -> HazardError {
    HazardError::InvalidConfig { message }
}
