//! Postage-stamp command-line tool.
//!
//! Extracts cutouts, PSF images and PSF-subtracted residuals for a list of
//! sky positions, builds synthetic repositories to run against, and queries
//! object and light-curve catalogs.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use sky_common::StampError;
use stamp_tool::commands::{self, SimulateOptions};
use stamp_tool::run_file::RunFile;
use storage::SyntheticSky;

#[derive(Parser, Debug)]
#[command(name = "stamp-tool")]
#[command(about = "Postage stamps and PSF residuals from coadd repositories")]
struct Args {
    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract stamps for every target of a run file
    Stamps {
        /// YAML run file
        run: PathBuf,

        /// Process targets on all cores
        #[arg(long)]
        parallel: bool,
    },

    /// Show the tract, patch and pixel of a sky position
    Resolve {
        /// Repository root
        #[arg(long, env = "STAMP_REPOSITORY")]
        repo: PathBuf,

        /// Right ascension, degrees
        #[arg(long, allow_hyphen_values = true)]
        ra: f64,

        /// Declination, degrees
        #[arg(long, allow_hyphen_values = true)]
        dec: f64,
    },

    /// Write a single-tract synthetic repository
    Simulate {
        /// Repository root to create
        dir: PathBuf,

        #[arg(long, default_value = "synthetic")]
        name: String,

        /// Tract centre right ascension, degrees
        #[arg(long, default_value = "61.863", allow_hyphen_values = true)]
        ra: f64,

        /// Tract centre declination, degrees
        #[arg(long, default_value = "-35.79", allow_hyphen_values = true)]
        dec: f64,

        /// Patches per tract side
        #[arg(long, default_value = "2")]
        patches: u32,

        /// Comma separated bands
        #[arg(long, default_value = "r")]
        bands: String,

        #[arg(long, default_value = "42")]
        seed: u64,

        #[arg(long, default_value = "20")]
        stars_per_patch: usize,

        /// Gaussian PSF width, pixels
        #[arg(long, default_value = "2.0")]
        psf_sigma: f64,
    },

    /// Retrieve catalog columns
    Query {
        /// Catalog JSON file, or a catalog name in --catalog-dir
        catalog: String,

        #[arg(long, env = "STAMP_CATALOG_DIR")]
        catalog_dir: Option<PathBuf>,

        /// Comma separated columns (default: all)
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,

        /// Row filter, e.g. "mag_r < 24" (repeatable)
        #[arg(long)]
        filter: Vec<String>,

        /// Partition filter, e.g. "tract == 4850" (repeatable)
        #[arg(long)]
        native_filter: Vec<String>,

        /// Print JSON instead of a tab separated table
        #[arg(long)]
        json: bool,
    },

    /// Print light curves
    Lightcurves {
        /// Catalog JSON file, or a catalog name in --catalog-dir
        catalog: String,

        #[arg(long, env = "STAMP_CATALOG_DIR")]
        catalog_dir: Option<PathBuf>,

        /// Object filter, e.g. "sn_type == 'Ia'" (repeatable)
        #[arg(long)]
        object_filter: Vec<String>,

        /// Row filter on mjd, band or mag (repeatable)
        #[arg(long)]
        filter: Vec<String>,

        /// Stop after this many objects
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr);
    if args.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    let result = run(args.command);
    if let Err(err) = &result {
        match err.downcast_ref::<StampError>() {
            Some(stamp_err) => error!(kind = stamp_err.kind(), error = %stamp_err, "Command failed"),
            None => error!(error = %err, "Command failed"),
        }
    }
    result
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Stamps { run, parallel } => {
            let mut run_file = RunFile::load(&run)?;
            run_file.stamp.parallel |= parallel;
            let report = commands::stamps(&run_file)?;
            info!(
                processed = report.processed,
                failed = report.failures.len(),
                "Stamps written"
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Resolve { repo, ra, dec } => {
            let resolution = commands::resolve(&repo, ra, dec)?;
            println!("{}", serde_json::to_string_pretty(&resolution)?);
        }
        Command::Simulate {
            dir,
            name,
            ra,
            dec,
            patches,
            bands,
            seed,
            stars_per_patch,
            psf_sigma,
        } => {
            let options = SimulateOptions {
                name,
                ra,
                dec,
                patches,
                sky: SyntheticSky {
                    seed,
                    stars_per_patch,
                    psf: psf::PsfDescriptor::gaussian(psf_sigma),
                    bands: commands::parse_bands(&bands)?,
                    ..SyntheticSky::default()
                },
            };
            let report = commands::simulate(&dir, &options)?;
            info!(
                dir = %dir.display(),
                tiles = report.tiles_written,
                stars = report.stars.len(),
                "Synthetic repository written"
            );
        }
        Command::Query {
            catalog,
            catalog_dir,
            columns,
            filter,
            native_filter,
            json,
        } => {
            let catalog = commands::open_catalog(&catalog, catalog_dir.as_deref())?;
            let table = commands::query(catalog.as_ref(), &columns, &filter, &native_filter)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&table)?);
            } else {
                print!("{}", commands::format_table(&table));
            }
        }
        Command::Lightcurves {
            catalog,
            catalog_dir,
            object_filter,
            filter,
            limit,
        } => {
            let catalog = commands::open_catalog(&catalog, catalog_dir.as_deref())?;
            for curve in commands::light_curves(catalog.as_ref(), &object_filter, &filter, limit)? {
                print!("{}", commands::format_light_curve(&curve));
            }
        }
    }
    Ok(())
}
