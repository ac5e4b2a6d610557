//! snow_hazard: climatological blizzard and heavy-snowfall indicators
//!
//! Computes, from gridded daily reanalysis fields (10 m wind components, 2 m
//! temperature and snow depth), how often blizzard and heavy-snowfall
//! conditions occur, reduced to long-term mean annual grids.
//!
//! ## Pipeline
//!
//! 1. wind speed from the U/V components, temperature to degC, snow depth to cm
//! 2. per-day condition masks (blizzard, snow depth above each limit)
//! 3. per-year count or fraction of qualifying days
//! 4. zero-valued years masked as missing
//! 5. mean over years, written to one NetCDF file per indicator
//!
//! ## Module Organization
//!
//! - [`config`]: thresholds and input sources
//! - [`units`]: unit normalization
//! - [`time_axis`]: CF time decoding
//! - [`field`]: gridded time series
//! - [`netcdf_io`]: reading inputs, writing result grids
//! - [`indicators`]: hazard conditions and output catalogue
//! - [`statistics`]: annual reductions and the climatological mean
//! - [`pipeline`]: the end-to-end run
//! - [`parallel`]: thread pool configuration
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//! ```rust,no_run
//! use snow_hazard::prelude::*;
//! use std::path::Path;
//!
//! let config = HazardConfig::default();
//! let report = run_pipeline(&config, Path::new("era5land"), Path::new("out")).unwrap();
//! for output in &report.outputs {
//!     println!("{}", output.path.display());
//! }
//! ```

pub mod config;
pub mod errors;
pub mod field;
pub mod indicators;
pub mod netcdf_io;
pub mod parallel;
pub mod pipeline;
pub mod statistics;
pub mod time_axis;
pub mod units;

pub use config::*;
pub use errors::*;
pub use field::*;
pub use indicators::*;
pub use pipeline::*;

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::config::{HazardConfig, InputSources, Thresholds, VariableSource};
    pub use crate::errors::{HazardError, Result};
    pub use crate::field::{Field, Grid};
    pub use crate::indicators::{Hazard, Indicator};
    pub use crate::parallel::ParallelConfig;
    pub use crate::pipeline::{compute_indicators, run_pipeline, IndicatorSink, PipelineReport};
    pub use crate::statistics::{AnnualReduction, AnnualStatistic};
}
