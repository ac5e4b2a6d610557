//! Unit normalization for source fields
//!
//! Only the handful of units met in reanalysis products are recognized.
//! Every unit is an affine map onto the SI base of its quantity
//! (kelvin, metre, metre per second), which makes any conversion within a
//! quantity a single multiply-add.

use crate::errors::{HazardError, Result};
use ndarray::{ArrayBase, DataMut, Dimension};
use std::fmt;

/// Physical quantity a unit measures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Temperature,
    Length,
    Speed,
}

/// Recognized units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Kelvin,
    Celsius,
    Fahrenheit,
    Metre,
    Centimetre,
    Millimetre,
    MetrePerSecond,
    KilometrePerHour,
    Knot,
}

impl Unit {
    /// Parse a CF/UDUNITS-style unit string.
    pub fn parse(text: &str) -> Option<Self> {
        let normalized = text.trim().to_lowercase();
        let unit = match normalized.as_str() {
            "k" | "kelvin" | "degk" | "deg_k" | "degrees_k" | "degree_k" => Self::Kelvin,
            "degc" | "°c" | "c" | "celsius" | "deg_c" | "degrees_c" | "degree_c"
            | "degrees_celsius" | "degree_celsius" => Self::Celsius,
            "degf" | "°f" | "f" | "fahrenheit" | "deg_f" | "degrees_f" | "degree_f" => {
                Self::Fahrenheit
            }
            "m" | "meter" | "meters" | "metre" | "metres" => Self::Metre,
            "cm" | "centimeter" | "centimeters" | "centimetre" | "centimetres" => Self::Centimetre,
            "mm" | "millimeter" | "millimeters" | "millimetre" | "millimetres" => Self::Millimetre,
            "m/s" | "m s-1" | "m s**-1" | "m s^-1" | "m.s-1" | "m/sec" | "meter/second"
            | "meters per second" | "metres per second" => Self::MetrePerSecond,
            "km/h" | "km h-1" | "km h**-1" | "kmh" | "kph" => Self::KilometrePerHour,
            "kt" | "kts" | "knot" | "knots" => Self::Knot,
            _ => return None,
        };
        Some(unit)
    }

    #[must_use]
    pub const fn quantity(self) -> Quantity {
        match self {
            Self::Kelvin | Self::Celsius | Self::Fahrenheit => Quantity::Temperature,
            Self::Metre | Self::Centimetre | Self::Millimetre => Quantity::Length,
            Self::MetrePerSecond | Self::KilometrePerHour | Self::Knot => Quantity::Speed,
        }
    }

    /// Symbol written to output `units` attributes
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Kelvin => "K",
            Self::Celsius => "degC",
            Self::Fahrenheit => "degF",
            Self::Metre => "m",
            Self::Centimetre => "cm",
            Self::Millimetre => "mm",
            Self::MetrePerSecond => "m/s",
            Self::KilometrePerHour => "km/h",
            Self::Knot => "kt",
        }
    }

    /// `(scale, offset)` such that `base = value * scale + offset`
    fn to_base(self) -> (f64, f64) {
        match self {
            Self::Kelvin => (1.0, 0.0),
            Self::Celsius => (1.0, 273.15),
            Self::Fahrenheit => (5.0 / 9.0, 273.15 - 32.0 * 5.0 / 9.0),
            Self::Metre => (1.0, 0.0),
            Self::Centimetre => (0.01, 0.0),
            Self::Millimetre => (0.001, 0.0),
            Self::MetrePerSecond => (1.0, 0.0),
            Self::KilometrePerHour => (1.0 / 3.6, 0.0),
            Self::Knot => (1852.0 / 3600.0, 0.0),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Affine conversion between two units of the same quantity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion {
    scale: f64,
    offset: f64,
}

impl Conversion {
    /// Build the conversion from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`HazardError::UnitConversion`] when the units measure
    /// different quantities.
    pub fn between(from: Unit, to: Unit) -> Result<Self> {
        if from.quantity() != to.quantity() {
            return Err(HazardError::UnitConversion {
                from: from.symbol().to_string(),
                to: to.symbol().to_string(),
            });
        }
        let (s_from, o_from) = from.to_base();
        let (s_to, o_to) = to.to_base();
        Ok(Self {
            scale: s_from / s_to,
            offset: (o_from - o_to) / s_to,
        })
    }

    /// Parse `from` and build the conversion to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`HazardError::UnitConversion`] for unrecognized or incompatible units.
    pub fn from_str_to(from: &str, to: Unit) -> Result<Self> {
        let parsed = Unit::parse(from).ok_or_else(|| HazardError::UnitConversion {
            from: from.to_string(),
            to: to.symbol().to_string(),
        })?;
        Self::between(parsed, to).map_err(|_| HazardError::UnitConversion {
            from: from.to_string(),
            to: to.symbol().to_string(),
        })
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.scale == 1.0 && self.offset == 0.0
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn apply(&self, value: f32) -> f32 {
        (f64::from(value) * self.scale + self.offset) as f32
    }

    /// Convert every element in place; NaN stays NaN.
    pub fn apply_inplace<S, D>(&self, data: &mut ArrayBase<S, D>)
    where
        S: DataMut<Elem = f32>,
        D: Dimension,
    {
        if self.is_identity() {
            return;
        }
        let conversion = *self;
        data.par_mapv_inplace(|v| conversion.apply(v));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn kelvin_to_celsius() {
        let c = Conversion::from_str_to("K", Unit::Celsius).unwrap();
        assert!((c.apply(273.15) - 0.0).abs() < 1e-4);
        assert!((c.apply(268.15) + 5.0).abs() < 1e-4);
    }

    #[test]
    fn metres_to_centimetres_in_place() {
        let c = Conversion::from_str_to("m", Unit::Centimetre).unwrap();
        let mut data = array![[0.15_f32, f32::NAN], [0.0, 1.0]];
        c.apply_inplace(&mut data);
        assert!((data[[0, 0]] - 15.0).abs() < 1e-4);
        assert!(data[[0, 1]].is_nan());
        assert!((data[[1, 1]] - 100.0).abs() < 1e-4);
    }

    #[test]
    fn cf_wind_units_are_identity() {
        let c = Conversion::from_str_to("m s**-1", Unit::MetrePerSecond).unwrap();
        assert!(c.is_identity());
    }

    #[test]
    fn incompatible_units_fail() {
        assert!(Conversion::from_str_to("K", Unit::Centimetre).is_err());
        assert!(Conversion::from_str_to("furlongs", Unit::Centimetre).is_err());
    }
}
