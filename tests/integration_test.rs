use netcdf::{create, open, AttributeValue};
use snow_hazard::{
    config::{HazardConfig, VariableSource},
    errors::HazardError,
    netcdf_io::{find_input_files, read_field, wildcard_match},
    pipeline::run_pipeline,
    Indicator,
};
use std::path::Path;
use tempfile::tempdir;

const NLAT: usize = 2;
const NLON: usize = 3;
const YEARS: [i32; 2] = [2021, 2022];
const SDE_FILL: i16 = -32767;

/// How a synthetic variable is stored on disk
enum Storage {
    Float { units: Option<&'static str> },
    /// Packed as i16 with `scale_factor` 0.001 and a `_FillValue`
    PackedMetres,
}

/// Write one year of daily data for `var` into `dir/<prefix>_<year>.nc`.
///
/// `value(year_index, lat, lon)` gives the physical value; `None` is written
/// as missing.
fn write_year(
    dir: &Path,
    prefix: &str,
    var_name: &str,
    year_index: usize,
    latitudes: &[f64],
    storage: &Storage,
    value: impl Fn(usize, usize, usize) -> Option<f32>,
) {
    let year = YEARS[year_index];
    let path = dir.join(format!("{prefix}_{year}.nc"));
    let first_day = 365 * year_index;
    let nt = 365;

    let mut file = create(&path).expect("Failed to create NetCDF file");
    file.add_dimension("time", nt)
        .expect("Failed to add dimension time");
    file.add_dimension("latitude", NLAT)
        .expect("Failed to add dimension latitude");
    file.add_dimension("longitude", NLON)
        .expect("Failed to add dimension longitude");

    {
        let mut time = file
            .add_variable::<f64>("time", &["time"])
            .expect("Failed to add time");
        time.put_attribute("units", "days since 2021-01-01 00:00:00")
            .expect("Failed to set time units");
        time.put_attribute("calendar", "gregorian")
            .expect("Failed to set calendar");
        let offsets: Vec<f64> = (first_day..first_day + nt).map(|d| d as f64).collect();
        time.put_values(&offsets, ..).expect("Failed to write time");
    }
    {
        let mut lat = file
            .add_variable::<f64>("latitude", &["latitude"])
            .expect("Failed to add latitude");
        lat.put_values(latitudes, ..).expect("Failed to write latitude");
    }
    {
        let mut lon = file
            .add_variable::<f64>("longitude", &["longitude"])
            .expect("Failed to add longitude");
        let longitudes: Vec<f64> = (0..NLON).map(|i| 24.0 + i as f64 * 0.1).collect();
        lon.put_values(&longitudes, ..)
            .expect("Failed to write longitude");
    }

    let cells = (0..nt).flat_map(|_| (0..NLAT).flat_map(|j| (0..NLON).map(move |i| (j, i))));
    let dims = ["time", "latitude", "longitude"];
    match storage {
        Storage::Float { units } => {
            let mut var = file
                .add_variable::<f32>(var_name, &dims)
                .expect("Failed to add variable");
            if let Some(units) = units {
                var.put_attribute("units", *units)
                    .expect("Failed to set units");
            }
            let values: Vec<f32> = cells
                .map(|(j, i)| value(year_index, j, i).unwrap_or(f32::NAN))
                .collect();
            var.put_values(&values, ..).expect("Failed to write data");
        }
        Storage::PackedMetres => {
            let mut var = file
                .add_variable::<i16>(var_name, &dims)
                .expect("Failed to add variable");
            var.put_attribute("_FillValue", SDE_FILL)
                .expect("Failed to set fill value");
            var.put_attribute("scale_factor", 0.001_f64)
                .expect("Failed to set scale factor");
            var.put_attribute("add_offset", 0.0_f64)
                .expect("Failed to set offset");
            var.put_attribute("units", "m").expect("Failed to set units");
            let values: Vec<i16> = cells
                .map(|(j, i)| match value(year_index, j, i) {
                    Some(v) => (v * 1000.0).round() as i16,
                    None => SDE_FILL,
                })
                .collect();
            var.put_values(&values, ..).expect("Failed to write data");
        }
    }
}

fn default_latitudes() -> Vec<f64> {
    (0..NLAT).map(|j| 60.0 + j as f64 * 0.1).collect()
}

/// Two years of ERA5-Land-like inputs on a 2 x 3 grid.
///
/// 2021 is cold and windy everywhere; snow lies at (0,0) at 15 cm and at
/// (1,1) at 30 cm, and (1,2) has no snow data at all. 2022 is mild, calm and
/// snow-free.
fn write_scenario(dir: &Path, latitudes: &[f64]) {
    let defaults = HazardConfig::default().inputs;
    let prefix = |source: &VariableSource| {
        source
            .pattern
            .trim_end_matches(".nc")
            .trim_end_matches("_202*")
            .to_string()
    };

    for year_index in 0..YEARS.len() {
        write_year(
            dir,
            &prefix(&defaults.u_wind),
            "u10",
            year_index,
            latitudes,
            &Storage::Float {
                units: Some("m s**-1"),
            },
            |y, _, _| Some(if y == 0 { 12.0 } else { 1.0 }),
        );
        write_year(
            dir,
            &prefix(&defaults.v_wind),
            "v10",
            year_index,
            latitudes,
            &Storage::Float {
                units: Some("m s**-1"),
            },
            |y, _, _| Some(if y == 0 { 16.0 } else { 1.0 }),
        );
        // No units attribute: the assumed Kelvin applies.
        write_year(
            dir,
            &prefix(&defaults.temperature),
            "t2m",
            year_index,
            latitudes,
            &Storage::Float { units: None },
            |y, _, _| Some(if y == 0 { 268.15 } else { 280.0 }),
        );
        write_year(
            dir,
            &prefix(&defaults.snow_depth),
            "sde",
            year_index,
            latitudes,
            &Storage::PackedMetres,
            |y, j, i| match (y, j, i) {
                (_, 1, 2) => None,
                (0, 0, 0) => Some(0.15),
                (0, 1, 1) => Some(0.30),
                _ => Some(0.0),
            },
        );
    }
}

fn read_grid(path: &Path, var_name: &str) -> Vec<f32> {
    let file = open(path).expect("Failed to open output");
    let var = file.variable(var_name).expect("Variable not found");
    assert_eq!(var.dimensions().len(), 2);
    var.get_values::<f32, _>(..).expect("Failed to read output")
}

fn string_attr(value: AttributeValue) -> String {
    match value {
        AttributeValue::Str(s) => s,
        other => panic!("expected a string attribute, got {other:?}"),
    }
}

fn assert_cells(values: &[f32], expected: [Option<f32>; NLAT * NLON], name: &str) {
    for (cell, (actual, want)) in values.iter().zip(expected).enumerate() {
        match want {
            Some(want) => assert!(
                (actual - want).abs() < 1e-3,
                "{name} cell {cell}: expected {want}, got {actual}"
            ),
            None => assert!(actual.is_nan(), "{name} cell {cell}: expected NaN, got {actual}"),
        }
    }
}

#[test]
fn test_full_pipeline_two_years() {
    let input = tempdir().expect("Failed to create temp dir");
    let output = tempdir().expect("Failed to create temp dir");
    write_scenario(input.path(), &default_latitudes());

    let out_dir = output.path().join("indicators");
    let report = run_pipeline(&HazardConfig::default(), input.path(), &out_dir)
        .expect("Pipeline failed");

    assert_eq!(report.period, Some((2021, 2022)));
    assert_eq!(report.outputs.len(), 6);
    for record in &report.outputs {
        assert!(record.path.exists(), "missing {}", record.path.display());
        assert_eq!(record.total_cells, NLAT * NLON);
    }

    let full_year = Some(365.0);
    let always = Some(100.0);
    let expectations: [(&str, &str, [Option<f32>; 6]); 6] = [
        (
            "BdayCount_annual_mean.nc",
            "blizzard_days",
            [full_year, None, None, None, full_year, None],
        ),
        (
            "BdayCount_AnaProb_mean.nc",
            "blizzard_days",
            [always, None, None, None, always, None],
        ),
        (
            "snow6Count_annual_mean.nc",
            "snow_days",
            [full_year, None, None, None, full_year, None],
        ),
        (
            "snow6Prob_annual_mean.nc",
            "snow_days",
            [always, None, None, None, always, None],
        ),
        (
            "snow25Count_annual_mean.nc",
            "snow_days",
            [None, None, None, None, full_year, None],
        ),
        (
            "snow25Prob_annual_mean.nc",
            "snow_days",
            [None, None, None, None, always, None],
        ),
    ];

    for (file_name, var_name, expected) in expectations {
        let values = read_grid(&out_dir.join(file_name), var_name);
        assert_cells(&values, expected, file_name);
    }
}

#[test]
fn test_output_metadata() {
    let input = tempdir().expect("Failed to create temp dir");
    write_scenario(input.path(), &default_latitudes());

    let report = run_pipeline(&HazardConfig::default(), input.path(), input.path())
        .expect("Pipeline failed");

    for record in &report.outputs {
        let indicator: Indicator = record.indicator;
        let file = open(&record.path).expect("Failed to open output");
        let var = file
            .variable(indicator.variable_name())
            .expect("Variable not found");

        let units = var
            .attribute("units")
            .expect("units missing")
            .value()
            .expect("Failed to read units");
        assert_eq!(string_attr(units), indicator.units());

        let long_name = var
            .attribute("long_name")
            .expect("long_name missing")
            .value()
            .expect("Failed to read long_name");
        assert_eq!(string_attr(long_name), indicator.long_name());

        let period = file
            .attribute("period")
            .expect("period missing")
            .value()
            .expect("Failed to read period");
        assert_eq!(string_attr(period), "2021-2022");

        let latitudes = file
            .variable("latitude")
            .expect("latitude missing")
            .get_values::<f64, _>(..)
            .expect("Failed to read latitude");
        assert_eq!(latitudes, default_latitudes());
    }
}

#[test]
fn test_probabilities_are_bounded() {
    let input = tempdir().expect("Failed to create temp dir");
    write_scenario(input.path(), &default_latitudes());
    let report = run_pipeline(&HazardConfig::default(), input.path(), input.path())
        .expect("Pipeline failed");

    for record in report
        .outputs
        .iter()
        .filter(|r| r.indicator.units() == "%")
    {
        let values = read_grid(&record.path, record.indicator.variable_name());
        for p in values {
            assert!(p.is_nan() || (0.0..=100.0).contains(&p), "probability {p}");
        }
    }
}

#[test]
fn test_rerun_replaces_outputs() {
    let input = tempdir().expect("Failed to create temp dir");
    write_scenario(input.path(), &default_latitudes());
    let config = HazardConfig::default();

    let first = run_pipeline(&config, input.path(), input.path()).expect("First run failed");
    let second = run_pipeline(&config, input.path(), input.path()).expect("Second run failed");
    assert_eq!(first.outputs.len(), second.outputs.len());

    // Outputs live next to the inputs but never match the input patterns.
    let inputs = find_input_files(input.path(), &config.inputs.snow_depth.pattern)
        .expect("Inputs not found");
    assert_eq!(inputs.len(), YEARS.len());
}

#[test]
fn test_read_field_unpacks_and_masks() {
    let input = tempdir().expect("Failed to create temp dir");
    write_scenario(input.path(), &default_latitudes());

    let field = read_field(input.path(), &HazardConfig::default().inputs.snow_depth)
        .expect("Failed to read snow depth");
    assert_eq!(field.dim(), (730, NLAT, NLON));
    assert_eq!(field.units(), "m");
    assert_eq!(field.years()[0], 2021);
    assert_eq!(field.years()[729], 2022);

    let data = field.data();
    assert!((data[[0, 0, 0]] - 0.15).abs() < 1e-6);
    assert!((data[[0, 1, 1]] - 0.30).abs() < 1e-6);
    assert!(data[[0, 1, 2]].is_nan());
    assert_eq!(data[[400, 0, 0]], 0.0);
}

#[test]
fn test_missing_inputs_fail() {
    let input = tempdir().expect("Failed to create temp dir");
    let result = run_pipeline(&HazardConfig::default(), input.path(), input.path());
    assert!(matches!(result, Err(HazardError::NoInputFiles { .. })));
}

#[test]
fn test_missing_variable_fails() {
    let input = tempdir().expect("Failed to create temp dir");
    write_scenario(input.path(), &default_latitudes());

    let mut config = HazardConfig::default();
    config.inputs.temperature.variable = "tas".to_string();
    let result = run_pipeline(&config, input.path(), input.path());
    assert!(matches!(result, Err(HazardError::VariableNotFound { .. })));
}

#[test]
fn test_mismatched_grids_fail() {
    let input = tempdir().expect("Failed to create temp dir");
    write_scenario(input.path(), &default_latitudes());

    // Overwrite the snow depth files with a shifted latitude axis.
    let shifted: Vec<f64> = default_latitudes().iter().map(|l| l + 1.0).collect();
    let snow = HazardConfig::default().inputs.snow_depth;
    let prefix = snow.pattern.trim_end_matches("_202*.nc");
    for year_index in 0..YEARS.len() {
        let path = input.path().join(format!("{prefix}_{}.nc", YEARS[year_index]));
        std::fs::remove_file(&path).expect("Failed to remove file");
        write_year(
            input.path(),
            prefix,
            "sde",
            year_index,
            &shifted,
            &Storage::PackedMetres,
            |_, _, _| Some(0.2),
        );
    }

    let result = run_pipeline(&HazardConfig::default(), input.path(), input.path());
    assert!(matches!(result, Err(HazardError::GridMismatch { .. })));
}

#[test]
fn test_overlapping_input_files_fail() {
    let input = tempdir().expect("Failed to create temp dir");
    write_scenario(input.path(), &default_latitudes());

    // A second copy of 2021 that the default pattern also picks up.
    let snow = HazardConfig::default().inputs.snow_depth;
    let copy_prefix = format!("{}_2021", snow.pattern.trim_end_matches("_202*.nc"));
    write_year(
        input.path(),
        &copy_prefix,
        "sde",
        0,
        &default_latitudes(),
        &Storage::PackedMetres,
        |_, _, _| Some(0.15),
    );
    assert_eq!(
        find_input_files(input.path(), &snow.pattern)
            .expect("Inputs not found")
            .len(),
        YEARS.len() + 1
    );

    let result = read_field(input.path(), &snow);
    assert!(matches!(result, Err(HazardError::GridMismatch { .. })));

    let result = run_pipeline(&HazardConfig::default(), input.path(), input.path());
    assert!(matches!(result, Err(HazardError::GridMismatch { .. })));
}

#[test]
fn test_wildcard_patterns() {
    assert!(wildcard_match(
        "2m_temperature_DMIN_era5Land_202*.nc",
        "2m_temperature_DMIN_era5Land_2021.nc"
    ));
    assert!(!wildcard_match(
        "2m_temperature_DMIN_era5Land_202*.nc",
        "2m_temperature_DMIN_era5Land_2019.nc"
    ));
    assert!(wildcard_match("sde_20??.nc", "sde_2023.nc"));
    assert!(!wildcard_match("sde_20??.nc", "sde_202.nc"));
    assert!(wildcard_match("*", "anything.nc"));
    assert!(!wildcard_match("*.nc", "BdayCount_annual_mean.nc.bak"));
    assert!(wildcard_match("*a", "*ba"));
    assert!(wildcard_match("sde_*_v2.nc", "sde_*_2021_v2.nc"));
}
