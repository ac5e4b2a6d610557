//! NetCDF I/O: reading source fields and writing indicator grids
//!
//! Inputs are sets of files selected by a wildcard pattern, each holding one
//! `(time, lat, lon)` variable; they are unpacked, decoded and joined along
//! time. Outputs are single 2-D grids with coordinates and CF attributes.

use crate::config::VariableSource;
use crate::errors::{HazardError, Result};
use crate::field::{Field, Grid};
use crate::time_axis::decode_times;
use chrono::Utc;
use ndarray::{Array2, Array3};
use netcdf::{create, AttributeValue, File, Variable};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

const LAT_ALIASES: &[&str] = &["latitude", "lat", "y"];
const LON_ALIASES: &[&str] = &["longitude", "lon", "x"];
const TIME_ALIASES: &[&str] = &["time", "valid_time", "t"];

/// Match a file name against a pattern with `*` (any run) and `?` (any one
/// character) wildcards.
#[must_use]
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();
    let (mut pi, mut ni) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ni < n.len() {
        if pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, ni));
            pi += 1;
        } else if pi < p.len() && (p[pi] == '?' || p[pi] == n[ni]) {
            pi += 1;
            ni += 1;
        } else if let Some((star_p, star_n)) = backtrack {
            pi = star_p + 1;
            ni = star_n + 1;
            backtrack = Some((star_p, star_n + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}

/// Files in `dir` whose names match `pattern`, sorted by name.
///
/// # Errors
///
/// Returns [`HazardError::NoInputFiles`] when nothing matches, or an I/O
/// error if the directory cannot be listed.
pub fn find_input_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| wildcard_match(pattern, n))
        })
        .collect();

    if files.is_empty() {
        return Err(HazardError::NoInputFiles {
            dir: dir.to_path_buf(),
            pattern: pattern.to_string(),
        });
    }
    files.sort();
    Ok(files)
}

/// Read one source quantity from every matching file and join along time.
///
/// # Errors
///
/// Propagates discovery, read, decode and grid errors.
pub fn read_field(dir: &Path, source: &VariableSource) -> Result<Field> {
    let files = find_input_files(dir, &source.pattern)?;
    info!(
        variable = %source.variable,
        files = files.len(),
        "reading '{}'",
        source.pattern
    );

    let parts = files
        .iter()
        .map(|path| read_field_file(path, source))
        .collect::<Result<Vec<_>>>()?;
    let field = Field::concat_time(parts)?;

    let summary = field.summary();
    debug!(
        variable = %source.variable,
        shape = ?field.dim(),
        units = field.units(),
        min = summary.min,
        mean = summary.mean,
        max = summary.max,
        valid = summary.valid,
        total = summary.total,
        "loaded field"
    );
    Ok(field)
}

/// Read a `(time, lat, lon)` variable from a single file.
///
/// Packed values are unpacked with `scale_factor`/`add_offset`, and values
/// equal to `_FillValue` or `missing_value` become NaN.
///
/// # Errors
///
/// Returns an error for a missing variable or coordinate, a rank other than 3,
/// or an undecodable time axis.
pub fn read_field_file(path: &Path, source: &VariableSource) -> Result<Field> {
    let file = netcdf::open(path)?;
    let var = file
        .variable(&source.variable)
        .ok_or_else(|| HazardError::VariableNotFound {
            var: source.variable.clone(),
            path: path.to_path_buf(),
        })?;

    let dim_names: Vec<String> = var
        .dimensions()
        .iter()
        .map(|d| d.name().to_string())
        .collect();
    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

    let &[nt, nlat, nlon] = shape.as_slice() else {
        return Err(HazardError::InvalidShape {
            var: source.variable.clone(),
            message: format!(
                "expected (time, lat, lon), got dimensions [{}]",
                dim_names.join(", ")
            ),
        });
    };

    let raw: Vec<f32> = var.get_values::<f32, _>(..)?;
    let values = unpack(&var, raw);
    let data = Array3::from_shape_vec((nt, nlat, nlon), values)?;

    let units = string_attribute(&var, "units").unwrap_or_else(|| {
        warn!(
            variable = %source.variable,
            assumed = %source.assumed_units,
            "no units attribute, using assumed units"
        );
        source.assumed_units.clone()
    });

    let time_var = coordinate(&file, &dim_names[0], TIME_ALIASES, path)?;
    let time_units =
        string_attribute(&time_var, "units").ok_or_else(|| HazardError::TimeDecode {
            message: format!("time coordinate in {} has no units", path.display()),
        })?;
    let calendar = string_attribute(&time_var, "calendar");
    let offsets: Vec<f64> = time_var.get_values::<f64, _>(..)?;
    let times = decode_times(&offsets, &time_units, calendar.as_deref())?;

    let grid = Grid {
        latitudes: coordinate(&file, &dim_names[1], LAT_ALIASES, path)?
            .get_values::<f64, _>(..)?,
        longitudes: coordinate(&file, &dim_names[2], LON_ALIASES, path)?
            .get_values::<f64, _>(..)?,
    };

    debug!(path = %path.display(), timesteps = nt, "read file");
    Field::new(source.variable.clone(), data, times, grid, units)
}

/// Coordinate variable named after the dimension, else the first alias present
fn coordinate<'f>(
    file: &'f File,
    dim_name: &str,
    aliases: &[&str],
    path: &Path,
) -> Result<Variable<'f>> {
    std::iter::once(dim_name)
        .chain(aliases.iter().copied())
        .find_map(|name| file.variable(name))
        .ok_or_else(|| HazardError::VariableNotFound {
            var: dim_name.to_string(),
            path: path.to_path_buf(),
        })
}

#[allow(clippy::cast_possible_truncation)]
fn unpack(var: &Variable<'_>, raw: Vec<f32>) -> Vec<f32> {
    let scale = numeric_attribute(var, "scale_factor").unwrap_or(1.0);
    let offset = numeric_attribute(var, "add_offset").unwrap_or(0.0);
    let missing: Vec<f32> = ["_FillValue", "missing_value"]
        .iter()
        .filter_map(|name| numeric_attribute(var, name))
        .map(|m| m as f32)
        .collect();

    if scale == 1.0 && offset == 0.0 && missing.is_empty() {
        return raw;
    }

    raw.into_iter()
        .map(|v| {
            if missing.contains(&v) {
                f32::NAN
            } else {
                (f64::from(v) * scale + offset) as f32
            }
        })
        .collect()
}

fn numeric_attribute(var: &Variable<'_>, name: &str) -> Option<f64> {
    let value = var.attribute(name)?.value().ok()?;
    match value {
        AttributeValue::Double(v) => Some(v),
        AttributeValue::Float(v) => Some(f64::from(v)),
        AttributeValue::Int(v) => Some(f64::from(v)),
        AttributeValue::Short(v) => Some(f64::from(v)),
        AttributeValue::Uchar(v) => Some(f64::from(v)),
        AttributeValue::Ushort(v) => Some(f64::from(v)),
        AttributeValue::Uint(v) => Some(f64::from(v)),
        AttributeValue::Doubles(v) => v.first().copied(),
        AttributeValue::Floats(v) => v.first().map(|&x| f64::from(x)),
        AttributeValue::Shorts(v) => v.first().map(|&x| f64::from(x)),
        AttributeValue::Ints(v) => v.first().map(|&x| f64::from(x)),
        _ => None,
    }
}

fn string_attribute(var: &Variable<'_>, name: &str) -> Option<String> {
    match var.attribute(name)?.value().ok()? {
        AttributeValue::Str(s) => Some(s),
        AttributeValue::Strs(mut v) if !v.is_empty() => Some(v.swap_remove(0)),
        _ => None,
    }
}

/// Descriptive attributes of a persisted grid
#[derive(Debug, Clone)]
pub struct GridAttributes<'a> {
    pub variable: &'a str,
    pub units: &'a str,
    pub long_name: &'a str,
    /// First and last year the grid was averaged over
    pub period: Option<(i32, i32)>,
}

/// Writer for 2-D `(latitude, longitude)` result grids
pub struct NetCDFWriter<'a> {
    grid: &'a Grid,
    output_path: &'a Path,
}

impl<'a> NetCDFWriter<'a> {
    /// Create a new NetCDF writer
    pub fn new(grid: &'a Grid, output_path: &'a Path) -> Self {
        Self { grid, output_path }
    }

    /// Write `data` with coordinates and attributes, replacing any existing file.
    ///
    /// NaN cells are stored as-is and flagged by a NaN `_FillValue`.
    ///
    /// # Errors
    ///
    /// Returns [`HazardError::GridMismatch`] if `data` does not fit the grid,
    /// or any I/O or NetCDF error.
    pub fn write_result(&self, data: &Array2<f32>, attrs: &GridAttributes<'_>) -> Result<()> {
        if data.dim() != self.grid.shape() {
            return Err(HazardError::GridMismatch {
                message: format!(
                    "result shape {:?} does not fit grid {:?}",
                    data.dim(),
                    self.grid.shape()
                ),
            });
        }

        if self.output_path.exists() {
            fs::remove_file(self.output_path)?;
        }

        let mut file = create(self.output_path)?;

        let (nlat, nlon) = self.grid.shape();
        file.add_dimension("latitude", nlat)?;
        file.add_dimension("longitude", nlon)?;

        {
            let mut lat = file.add_variable::<f64>("latitude", &["latitude"])?;
            lat.put_attribute("units", "degrees_north")?;
            lat.put_attribute("standard_name", "latitude")?;
            lat.put_values(&self.grid.latitudes, ..)?;
        }

        {
            let mut lon = file.add_variable::<f64>("longitude", &["longitude"])?;
            lon.put_attribute("units", "degrees_east")?;
            lon.put_attribute("standard_name", "longitude")?;
            lon.put_values(&self.grid.longitudes, ..)?;
        }

        {
            let mut var = file.add_variable::<f32>(attrs.variable, &["latitude", "longitude"])?;
            var.put_attribute("_FillValue", f32::NAN)?;
            var.put_attribute("units", attrs.units)?;
            var.put_attribute("long_name", attrs.long_name)?;

            let values: Vec<f32> = data.iter().copied().collect();
            var.put_values(&values, ..)?;
        }

        file.add_attribute("title", attrs.long_name)?;
        if let Some((first, last)) = attrs.period {
            file.add_attribute("period", format!("{first}-{last}"))?;
        }
        file.add_attribute(
            "history",
            format!("Created by snow_hazard on {}", Utc::now().to_rfc3339()),
        )?;

        Ok(())
    }
}

/// Writes a climatological-mean grid to a new NetCDF file.
pub fn write_grid_to_netcdf(
    data: &Array2<f32>,
    grid: &Grid,
    attrs: &GridAttributes<'_>,
    output_path: &Path,
) -> Result<()> {
    NetCDFWriter::new(grid, output_path).write_result(data, attrs)
}
