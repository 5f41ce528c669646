//! Fieldrec CLI - manage field recordings and their metadata documents.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use fieldrec_core::{GeorefFormat, TrimMode};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod exit_codes;
mod utils;

/// Storage area used when neither `--store` nor `FIELDREC_STORAGE_DIR` is set.
const DEFAULT_STORE_DIR: &str = "recordings";

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success
  1   General error (including partially failed batches)
  64  Usage error (bad selection, unknown field)
  65  Data error (corrupt metadata document, invalid capture filename)
  66  Input error (unknown record, unreadable input file)
  69  Unavailable (storage area unreachable, sharing unsupported)
  74  I/O error (cannot write output)";

#[derive(Parser)]
#[command(name = "fieldrec")]
#[command(author, version, about = "Field recording record management", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Storage area holding recordings and metadata documents
    #[arg(long, global = true, value_name = "DIR")]
    store: Option<PathBuf>,

    /// Asset-only mode: no metadata documents are read or written
    #[arg(long, global = true)]
    legacy: bool,

    /// Suppress all non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// When to use colors
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

/// Records a batch command applies to.
#[derive(Args, Debug)]
pub struct SelectionArgs {
    /// Record indices (as shown by `list`) or base names
    #[arg(value_name = "RECORD")]
    pub records: Vec<String>,

    /// Select every record
    #[arg(long, conflicts_with = "records")]
    pub all: bool,
}

/// Options shared by every command.
#[derive(Debug, Clone)]
pub struct GlobalOpts {
    pub store: PathBuf,
    pub legacy: bool,
    pub quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List records, newest capture first
    List {
        /// Print summaries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a record's metadata document and capture details
    Show {
        /// Record index or base name
        #[arg(value_name = "RECORD")]
        record: String,

        /// Print the document as JSON only
        #[arg(long)]
        json: bool,
    },

    /// Copy capture recordings into the storage area
    Import {
        /// Recording files named by their capture identity
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Set one field of a record's metadata document
    Set {
        /// Record index or base name
        #[arg(value_name = "RECORD")]
        record: String,

        /// Field id (e.g. scientific-name)
        #[arg(value_name = "FIELD")]
        field: String,

        #[arg(value_name = "VALUE")]
        value: String,
    },

    /// Delete records
    Delete {
        /// Delete recordings only, keeping metadata documents
        #[arg(long)]
        asset_only: bool,

        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Export recordings and documents into a directory
    Download {
        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        out: PathBuf,

        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Share records through the platform share capability
    Share {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Export one CSV of the selected records' fields
    Csv {
        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        out: PathBuf,

        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Trim export history (none, last or all per category)
    Trim {
        #[arg(long, value_name = "MODE", default_value = "none")]
        downloads: TrimMode,

        #[arg(long, value_name = "MODE", default_value = "none")]
        shares: TrimMode,

        #[arg(long, value_name = "MODE", default_value = "none")]
        csvs: TrimMode,

        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Recompute a record's grid reference at another precision
    Regrid {
        /// Record index or base name
        #[arg(value_name = "RECORD")]
        record: String,

        /// Requested precision, in the units of the stored reference's grid
        /// (geohash length, or OS grid cell size in metres)
        #[arg(short, long)]
        precision: usize,

        /// Store the recomputed reference in the document
        #[arg(long)]
        save: bool,
    },

    /// Grid reference (and optionally a place name) for a coordinate
    Locate {
        #[arg(allow_negative_numbers = true)]
        lat: f64,

        #[arg(allow_negative_numbers = true)]
        lon: f64,

        /// Grid to use (geohash or osgr); defaults to FIELDREC_GEOREF_FORMAT
        #[arg(long, value_name = "FORMAT")]
        grid: Option<GeorefFormat>,

        /// Precision (geohash length, or OS grid cell size in metres)
        #[arg(short, long)]
        precision: Option<usize>,

        /// Look up a place name (network)
        #[arg(long)]
        describe: bool,
    },
}

fn init_tracing(verbose: u8, ansi: bool) {
    let default_filter = match verbose {
        0 => "fieldrec_core=warn,fieldrec=warn",
        1 => "fieldrec_core=info,fieldrec=info",
        _ => "fieldrec_core=debug,fieldrec=debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(ansi)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let opts = GlobalOpts {
        store: cli
            .store
            .or_else(|| std::env::var_os("FIELDREC_STORAGE_DIR").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_DIR)),
        legacy: cli.legacy,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::List { json } => commands::list::execute(&opts, json).await,
        Commands::Show { record, json } => commands::show::execute(&opts, record, json).await,
        Commands::Import { files } => commands::import::execute(&opts, files).await,
        Commands::Set {
            record,
            field,
            value,
        } => commands::set::execute(&opts, record, field, value).await,
        Commands::Delete {
            asset_only,
            selection,
        } => commands::delete::execute(&opts, selection, asset_only).await,
        Commands::Download { out, selection } => {
            commands::download::execute(&opts, selection, out).await
        }
        Commands::Share { selection } => commands::share::execute(&opts, selection).await,
        Commands::Csv { out, selection } => commands::csv::execute(&opts, selection, out).await,
        Commands::Trim {
            downloads,
            shares,
            csvs,
            selection,
        } => commands::trim::execute(&opts, selection, downloads, shares, csvs).await,
        Commands::Regrid {
            record,
            precision,
            save,
        } => commands::regrid::execute(&opts, record, precision, save).await,
        Commands::Locate {
            lat,
            lon,
            grid,
            precision,
            describe,
        } => commands::locate::execute(&opts, lat, lon, grid, precision, describe).await,
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let ansi = match cli.color {
        ColorChoice::Always => {
            colored::control::set_override(true);
            true
        }
        ColorChoice::Never => {
            colored::control::set_override(false);
            false
        }
        ColorChoice::Auto => colored::control::SHOULD_COLORIZE.should_colorize(),
    };
    init_tracing(cli.verbose, ansi);

    match run(cli).await {
        Ok(()) => std::process::ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            let exit = exit_codes::ExitCode::from_anyhow(&err);
            if let Some(message) = &exit.message {
                eprintln!("{} {}", "Error:".red().bold(), message);
            }
            std::process::ExitCode::from(exit.code as u8)
        }
    }
}
