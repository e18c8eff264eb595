use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::time::Instant;

mod output;
mod scenarios;
mod session;

use shrinkage_common::config::{validate_correction_factor, validate_glass};
use shrinkage_common::{RunConfig, ScanDirection, SimulationParams};
use session::ParamsSession;

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ScanArg {
    LongAxis,
    ShortAxis,
}

impl From<ScanArg> for ScanDirection {
    fn from(arg: ScanArg) -> Self {
        match arg {
            ScanArg::LongAxis => ScanDirection::LongAxis,
            ScanArg::ShortAxis => ScanDirection::ShortAxis,
        }
    }
}

/// Command-line arguments for the shrinkage engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run configuration (TOML)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Start from the built-in default parameters instead of the config's [glass]/[process] values.
    /// A missing config file is then tolerated and the run uses default output settings.
    #[arg(long)]
    defaults: bool,

    /// Glass width in mm
    #[arg(long)]
    width: Option<f64>,

    /// Glass height in mm
    #[arg(long)]
    height: Option<f64>,

    /// Block metal layer present
    #[arg(long)]
    bml: Option<bool>,

    /// ELA scan direction
    #[arg(long, value_enum)]
    scan: Option<ScanArg>,

    /// Process correction factor (suggested range 0.5 - 2.0)
    #[arg(long)]
    correction_factor: Option<f64>,

    /// Base filename for the report and CSV, overrides [output].base_filename
    #[arg(short, long)]
    output: Option<String>,
}

impl Args {
    fn has_edits(&self) -> bool {
        self.width.is_some()
            || self.height.is_some()
            || self.bml.is_some()
            || self.scan.is_some()
            || self.correction_factor.is_some()
    }

    /// Applies the command-line overrides to the editing copy of the parameters.
    fn apply_edits(&self, params: &mut SimulationParams) {
        if let Some(width) = self.width {
            params.width = width;
        }
        if let Some(height) = self.height {
            params.height = height;
        }
        if let Some(has_bml) = self.bml {
            params.has_bml = has_bml;
        }
        if let Some(scan) = self.scan {
            params.scan_direction = scan.into();
        }
        if let Some(correction_factor) = self.correction_factor {
            params.correction_factor = correction_factor;
        }
    }
}

/// Loads the run configuration. With `--defaults` a missing config file falls back to built-in values.
fn load_config(args: &Args) -> Result<RunConfig> {
    if args.defaults && !args.config.exists() {
        warn!("Config file '{}' not found, using built-in defaults.", args.config.display());
        return Ok(RunConfig::default());
    }
    RunConfig::load(&args.config)
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();

    let args = Args::parse();
    info!("Starting ELA Shrinkage Engine...");

    // --- Load Configuration ---
    let mut config = load_config(&args)?;
    if let Some(base) = &args.output {
        config.output.base_filename = base.clone();
    }

    // --- Edit & Commit Parameters ---
    let mut session = ParamsSession::new(config.params());
    if args.defaults {
        info!("Resetting parameters to built-in defaults.");
        session.reset();
    }
    if args.has_edits() {
        session.edit(|params| args.apply_edits(params));
    }
    validate_glass(session.editing().width, session.editing().height, "command line")?;
    validate_correction_factor(session.editing().correction_factor, "command line")?;
    if session.commit() {
        info!("Using edited parameters instead of the config values.");
    }
    debug!("Committed parameters: {:#?}", session.committed());

    // --- Run ---
    let start_time = Instant::now();
    let baseline = session.run();
    info!("Committed run: width {} PPM, height {} PPM.",
        baseline.shrinkage_width_ppm, baseline.shrinkage_height_ppm);

    let scenarios = scenarios::build_scenarios(session.committed(), &config.scenarios);
    let report = scenarios::run_scenarios(session.cache_mut(), scenarios);
    info!("Calculation finished in {:.3} ms.", start_time.elapsed().as_secs_f64() * 1000.0);
    debug!("Result cache: {} hits, {} misses.", session.cache().hits(), session.cache().misses());

    for record in &report.scenarios {
        output::log_summary(record);
    }

    // --- Save Results ---
    let report_path = output::save_report(&report, &config.output)?;
    debug!("Report path: {}", report_path.display());

    if config.output.save_cells_csv {
        let csv_path = PathBuf::from(format!("{}_cells.csv", config.output.base_filename));
        output::save_cells_csv(&report, &csv_path)?;
    } else {
        warn!("Skipping cell CSV export as per config (save_cells_csv is false).");
    }

    info!("Shrinkage run complete.");
    Ok(())
}
