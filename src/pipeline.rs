//! End-to-end hazard indicator run
//!
//! Source fields are loaded once and moved through the steps that consume
//! them. Each intermediate is dropped right after its last use, so peak
//! memory holds at most the three normalized inputs and one condition mask.

use crate::config::{HazardConfig, InputSources, Thresholds};
use crate::errors::Result;
use crate::field::{Field, Grid};
use crate::indicators::{blizzard_mask, exceedance_mask, wind_speed, Hazard, Indicator};
use crate::netcdf_io::{read_field, write_grid_to_netcdf, GridAttributes};
use crate::statistics::AnnualReduction;
use crate::units::Unit;
use ndarray::{Array2, Array3};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// The four source fields, as read from storage
#[derive(Debug, Clone)]
pub struct SourceFields {
    pub u_wind: Field,
    pub v_wind: Field,
    pub temperature: Field,
    pub snow_depth: Field,
}

/// One finished indicator: its climatological mean and the years it covers
#[derive(Debug, Clone)]
pub struct IndicatorGrid {
    pub indicator: Indicator,
    pub mean: Array2<f32>,
    pub period: Option<(i32, i32)>,
}

impl IndicatorGrid {
    /// Cells holding a value (not masked)
    #[must_use]
    pub fn valid_cells(&self) -> usize {
        self.mean.iter().filter(|x| x.is_finite()).count()
    }
}

/// Destination for finished indicator grids
pub trait IndicatorSink {
    /// Persist one indicator on the given horizontal grid.
    ///
    /// # Errors
    ///
    /// Returns any error raised while storing the grid.
    fn persist(&mut self, grid: &Grid, result: &IndicatorGrid) -> Result<()>;
}

/// Keeps results in memory
impl IndicatorSink for Vec<IndicatorGrid> {
    fn persist(&mut self, _grid: &Grid, result: &IndicatorGrid) -> Result<()> {
        self.push(result.clone());
        Ok(())
    }
}

/// What was written for one indicator
#[derive(Debug, Clone)]
pub struct OutputRecord {
    pub indicator: Indicator,
    pub path: PathBuf,
    pub valid_cells: usize,
    pub total_cells: usize,
}

/// Writes every indicator to its own NetCDF file in one directory
#[derive(Debug)]
pub struct NetCDFSink {
    output_dir: PathBuf,
    records: Vec<OutputRecord>,
}

impl NetCDFSink {
    /// Create a sink writing into `output_dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created.
    pub fn new(output_dir: &Path) -> Result<Self> {
        fs::create_dir_all(output_dir)?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            records: Vec::new(),
        })
    }

    #[must_use]
    pub fn into_records(self) -> Vec<OutputRecord> {
        self.records
    }
}

impl IndicatorSink for NetCDFSink {
    fn persist(&mut self, grid: &Grid, result: &IndicatorGrid) -> Result<()> {
        let indicator = result.indicator;
        let path = self.output_dir.join(indicator.file_name());
        let long_name = indicator.long_name();
        let attrs = GridAttributes {
            variable: indicator.variable_name(),
            units: indicator.units(),
            long_name: &long_name,
            period: result.period,
        };

        write_grid_to_netcdf(&result.mean, grid, &attrs, &path)?;
        info!(path = %path.display(), "saved {}", long_name);

        self.records.push(OutputRecord {
            indicator,
            path,
            valid_cells: result.valid_cells(),
            total_cells: result.mean.len(),
        });
        Ok(())
    }
}

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub outputs: Vec<OutputRecord>,
    pub period: Option<(i32, i32)>,
}

/// Read the four source fields from `input_dir`.
///
/// # Errors
///
/// Propagates any discovery or read error.
pub fn load_sources(input_dir: &Path, inputs: &InputSources) -> Result<SourceFields> {
    Ok(SourceFields {
        u_wind: read_field(input_dir, &inputs.u_wind)?,
        v_wind: read_field(input_dir, &inputs.v_wind)?,
        temperature: read_field(input_dir, &inputs.temperature)?,
        snow_depth: read_field(input_dir, &inputs.snow_depth)?,
    })
}

/// Reduce one condition mask to the climatological mean of `indicator`.
///
/// Per-year values are zero-masked and scaled to output units before the
/// mean over years, which skips masked years.
///
/// # Errors
///
/// Returns an error if the mask and year labels disagree or there are no years.
pub fn reduce_indicator(
    mask: &Array3<bool>,
    years: &[i32],
    indicator: Indicator,
) -> Result<IndicatorGrid> {
    let aggregate = mask
        .reduce_by_year(years, indicator.statistic)?
        .mask_zeros()
        .scaled(indicator.statistic.output_scale());

    Ok(IndicatorGrid {
        indicator,
        mean: aggregate.climatological_mean()?,
        period: aggregate.period(),
    })
}

/// Compute every indicator from the source fields and hand each to `sink`.
///
/// Returns the first and last year of the analysis period.
///
/// # Errors
///
/// Returns the first unit, grid, statistics or sink error encountered.
pub fn compute_indicators<S: IndicatorSink>(
    sources: SourceFields,
    thresholds: &Thresholds,
    sink: &mut S,
) -> Result<Option<(i32, i32)>> {
    thresholds.validate()?;

    let SourceFields {
        u_wind,
        v_wind,
        temperature,
        snow_depth,
    } = sources;

    let wind = wind_speed(u_wind, v_wind)?;
    let temperature = temperature
        .convert_units(Unit::Celsius)?
        .with_metadata(Unit::Celsius.symbol(), "Temperature");
    let snow = snow_depth
        .convert_units(Unit::Centimetre)?
        .with_metadata(Unit::Centimetre.symbol(), "Snow depth");

    let grid = snow.grid().clone();
    let years = snow.years();
    let period = years.iter().min().copied().zip(years.iter().max().copied());
    info!(
        timesteps = years.len(),
        cells = grid.latitudes.len() * grid.longitudes.len(),
        "inputs normalized for {:?}",
        period
    );

    let blizzard = blizzard_mask(&temperature, &snow, &wind, thresholds)?;
    drop(temperature);
    drop(wind);
    emit(&blizzard, &years, Hazard::Blizzard, &grid, sink)?;
    drop(blizzard);

    for &limit_cm in &thresholds.snow_day_limits {
        let mask = exceedance_mask(&snow, limit_cm)?;
        emit(&mask, &years, Hazard::SnowDays { limit_cm }, &grid, sink)?;
    }

    Ok(period)
}

fn emit<S: IndicatorSink>(
    mask: &Array3<bool>,
    years: &[i32],
    hazard: Hazard,
    grid: &Grid,
    sink: &mut S,
) -> Result<()> {
    for indicator in hazard.indicators() {
        let result = reduce_indicator(mask, years, indicator)?;
        info!(
            valid_cells = result.valid_cells(),
            "computed {}",
            indicator.long_name()
        );
        sink.persist(grid, &result)?;
    }
    Ok(())
}

/// Run the whole pipeline: read inputs, compute, write one file per indicator.
///
/// # Errors
///
/// Aborts on the first configuration, read, computation or write error.
pub fn run_pipeline(
    config: &HazardConfig,
    input_dir: &Path,
    output_dir: &Path,
) -> Result<PipelineReport> {
    config.validate()?;

    let sources = load_sources(input_dir, &config.inputs)?;
    let mut sink = NetCDFSink::new(output_dir)?;
    let period = compute_indicators(sources, &config.thresholds, &mut sink)?;

    Ok(PipelineReport {
        outputs: sink.into_records(),
        period,
    })
}
