//! Entry point for snow_hazard.
//! Parses the CLI, loads the configuration and runs the indicator pipeline.

use clap::Parser;
use snow_hazard::{parallel::ParallelConfig, run_pipeline, HazardConfig};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod cli;

use cli::Args;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &args.config {
        Some(path) => HazardConfig::from_json_file(path)?,
        None => HazardConfig::default(),
    };

    if args.print_config {
        println!("{}", config.to_json_pretty()?);
        return Ok(());
    }

    let pool = ParallelConfig::new(args.threads).setup_global_pool()?;

    let output_dir = args.output_dir();
    let report = run_pipeline(&config, &args.input_dir, &output_dir)?;

    if let Some((first, last)) = report.period {
        println!("Period: {}-{}", first, last);
    }
    println!(
        "Threads: {} ({} cores available)",
        pool.threads, pool.available_cores
    );
    for output in &report.outputs {
        println!(
            "✅ {} -> {} ({} of {} cells with data)",
            output.indicator.long_name(),
            output.path.display(),
            output.valid_cells,
            output.total_cells
        );
    }

    Ok(())
}
