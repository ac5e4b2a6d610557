//! Defines command-line interface options using `clap`.

use clap::Parser;
use std::path::PathBuf;

/// Blizzard and heavy-snowfall indicators from daily NetCDF reanalysis data
#[derive(Parser, Debug)]
#[command(
    name = "snow_hazard",
    version,
    about = "Mean annual blizzard and heavy-snowfall indicators from gridded daily data"
)]
pub struct Args {
    /// Directory holding the daily input files
    #[arg(short, long)]
    pub input_dir: PathBuf,

    /// Directory for the indicator files. Defaults to the input directory.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// JSON file overriding thresholds and input sources
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of threads to use for parallel processing. Defaults to number of CPU cores.
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Enable verbose output.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Args {
    /// Output directory, falling back to the input directory
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.input_dir.clone())
    }
}
