//! Centralized error handling for snow_hazard
//!
//! Every stage of the pipeline reports failures through [`HazardError`]. The
//! first error aborts the run; nothing is retried.

use std::fmt;
use std::path::PathBuf;

/// Main error type for hazard indicator computations
#[derive(Debug)]
pub enum HazardError {
    /// NetCDF file operation errors
    NetCDFError(netcdf::Error),

    /// I/O operation errors
    IoError(std::io::Error),

    /// Array shape or dimension error
    ArrayError(ndarray::ShapeError),

    /// Configuration file could not be parsed
    ConfigParse(serde_json::Error),

    /// Configuration values are out of range or empty
    InvalidConfig { message: String },

    /// A filename pattern matched nothing in the input directory
    NoInputFiles { dir: PathBuf, pattern: String },

    /// Variable not found in NetCDF file
    VariableNotFound { var: String, path: PathBuf },

    /// Variable does not have the expected (time, lat, lon) layout
    InvalidShape { var: String, message: String },

    /// Fields that must share a grid do not
    GridMismatch { message: String },

    /// Source units cannot be converted to the requested units
    UnitConversion { from: String, to: String },

    /// Time coordinate could not be decoded
    TimeDecode { message: String },

    /// Calendar other than standard/gregorian/proleptic_gregorian
    UnsupportedCalendar { calendar: String },

    /// Thread pool configuration error
    ThreadPoolError(String),

    /// Statistics computation errors
    StatisticsError(String),
}

impl fmt::Display for HazardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HazardError::NetCDFError(e) => write!(f, "NetCDF error: {}", e),
            HazardError::IoError(e) => write!(f, "I/O error: {}", e),
            HazardError::ArrayError(e) => write!(f, "Array error: {}", e),
            HazardError::ConfigParse(e) => write!(f, "Configuration parse error: {}", e),
            HazardError::InvalidConfig { message } => {
                write!(f, "Invalid configuration: {}", message)
            }
            HazardError::NoInputFiles { dir, pattern } => write!(
                f,
                "No input files matching '{}' in {}",
                pattern,
                dir.display()
            ),
            HazardError::VariableNotFound { var, path } => {
                write!(f, "Variable '{}' not found in {}", var, path.display())
            }
            HazardError::InvalidShape { var, message } => {
                write!(f, "Invalid shape for variable '{}': {}", var, message)
            }
            HazardError::GridMismatch { message } => write!(f, "Grid mismatch: {}", message),
            HazardError::UnitConversion { from, to } => {
                write!(f, "Cannot convert units '{}' to '{}'", from, to)
            }
            HazardError::TimeDecode { message } => {
                write!(f, "Cannot decode time axis: {}", message)
            }
            HazardError::UnsupportedCalendar { calendar } => {
                write!(f, "Unsupported calendar '{}'", calendar)
            }
            HazardError::ThreadPoolError(msg) => write!(f, "Thread pool error: {}", msg),
            HazardError::StatisticsError(msg) => {
                write!(f, "Statistics computation error: {}", msg)
            }
        }
    }
}

impl std::error::Error for HazardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HazardError::NetCDFError(e) => Some(e),
            HazardError::IoError(e) => Some(e),
            HazardError::ArrayError(e) => Some(e),
            HazardError::ConfigParse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<netcdf::Error> for HazardError {
    fn from(error: netcdf::Error) -> Self {
        HazardError::NetCDFError(error)
    }
}

impl From<std::io::Error> for HazardError {
    fn from(error: std::io::Error) -> Self {
        HazardError::IoError(error)
    }
}

impl From<ndarray::ShapeError> for HazardError {
    fn from(error: ndarray::ShapeError) -> Self {
        HazardError::ArrayError(error)
    }
}

impl From<serde_json::Error> for HazardError {
    fn from(error: serde_json::Error) -> Self {
        HazardError::ConfigParse(error)
    }
}

/// Result type alias for hazard operations
pub type Result<T> = std::result::Result<T, HazardError>;
