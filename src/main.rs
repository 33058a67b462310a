//! hypostat command-line interface
//!
//! Usage:
//!   hypostat analyze --glucose cgm.csv [--insulin pump.csv] [--format csv|json]
//!   hypostat analyze --db                - Analyze readings from the local database
//!   hypostat analyze --db --from 2024-03-01 --to 2024-03-07
//!   hypostat import --glucose cgm.csv    - Store readings in the local database
//!   hypostat paths                       - Show data file locations
//!   HYPOSTAT_DBG=1 hypostat ...          - Enable debug output

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use std::env;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use hypostat::config::{config_file_path, default_database_path, ensure_data_dir, get_data_dir, Config};
use hypostat::export::{report_to_json, write_daily_csv, write_events_csv};
use hypostat::source::{load_glucose, load_insulin};
use hypostat::risk::RiskBand;
use hypostat::storage::Storage;
use hypostat::units::MmolL;
use hypostat::{analyze, HypoError, HypoReport};

#[derive(Parser)]
#[command(name = "hypostat")]
#[command(version)]
#[command(about = "Detect and summarize hypoglycemia episodes in CGM data", long_about = None)]
struct Cli {
    /// Config file (defaults to the data directory's config.txt)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect episodes and print events and daily summaries
    Analyze {
        /// Glucose readings file (.csv or .json)
        #[arg(short, long, required_unless_present = "db")]
        glucose: Option<PathBuf>,

        /// Insulin records file (.csv or .json)
        #[arg(short, long)]
        insulin: Option<PathBuf>,

        /// Read glucose and insulin from the local database instead
        #[arg(long, conflicts_with_all = ["glucose", "insulin"])]
        db: bool,

        /// First day (YYYY-MM-DD) to read from the database
        #[arg(long, requires_all = ["db", "to"])]
        from: Option<NaiveDate>,

        /// Last day (YYYY-MM-DD) to read from the database, inclusive
        #[arg(long, requires_all = ["db", "from"])]
        to: Option<NaiveDate>,

        #[arg(short, long, default_value = "csv")]
        format: OutputFormat,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import readings into the local database
    Import {
        #[arg(short, long)]
        glucose: Option<PathBuf>,

        #[arg(short, long)]
        insulin: Option<PathBuf>,
    },
    /// Show data file locations
    Paths,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

fn main() -> Result<(), HypoError> {
    if env::var("HYPOSTAT_DBG").is_ok() {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp(None)
            .init();
    }

    let cli = Cli::parse();
    let config = load_config(cli.config)?;

    match cli.command {
        Commands::Analyze { glucose, insulin, db, from, to, format, output } => {
            let source = if db {
                Source::Database(from.zip(to))
            } else {
                Source::Files { glucose, insulin }
            };
            cmd_analyze(&config, source, format, output)
        }
        Commands::Import { glucose, insulin } => cmd_import(&config, glucose, insulin),
        Commands::Paths => {
            cmd_show_paths(&config);
            Ok(())
        }
    }
}

/// Explicit config must load; the default location falls back to built-in values
fn load_config(path: Option<PathBuf>) -> Result<Config, HypoError> {
    if let Some(path) = path {
        return Config::load(path);
    }

    let cfg_path = config_file_path();
    if !cfg_path.exists() {
        if let Err(e) = ensure_data_dir().and_then(|_| Config::create_default(&cfg_path)) {
            warn!("Could not create default config: {}", e);
        }
    }

    Ok(Config::load(&cfg_path).unwrap_or_else(|e| {
        warn!("Could not load config: {}. Using defaults.", e);
        Config::default()
    }))
}

/// Where `analyze` reads its readings from
enum Source {
    Files {
        glucose: Option<PathBuf>,
        insulin: Option<PathBuf>,
    },
    /// Local database, optionally limited to an inclusive day range
    Database(Option<(NaiveDate, NaiveDate)>),
}

fn cmd_analyze(
    config: &Config,
    source: Source,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<(), HypoError> {
    let thresholds = config.thresholds()?;

    let (glucose, insulin) = match source {
        Source::Database(days) => {
            let storage = Storage::new(config.database_path())?;
            let glucose = match days {
                Some((from, to)) => {
                    info!("Reading glucose from {} to {}", from, to);
                    storage.glucose_on_days(from, to)?
                }
                None => storage.glucose_readings()?,
            };
            // insulin stays unfiltered so lookbacks before the first day still resolve
            (glucose, storage.insulin_readings()?)
        }
        Source::Files { glucose, insulin } => {
            let glucose = match glucose {
                Some(path) => load_glucose(path)?,
                None => Vec::new(),
            };
            let insulin = match insulin {
                Some(path) => load_insulin(path)?,
                None => Vec::new(),
            };
            (glucose, insulin)
        }
    };

    let report = analyze(&glucose, &insulin, &thresholds)?;

    let mut out: Box<dyn Write> = match output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };

    match format {
        OutputFormat::Csv => {
            write_events_csv(&mut out, &report.events)?;
            writeln!(out)?;
            write_daily_csv(&mut out, &report.daily)?;
        }
        OutputFormat::Json => {
            writeln!(out, "{}", report_to_json(&report)?)?;
        }
    }

    eprintln!("Hypoglycemia band: {}", thresholds.format_low_band());
    print_summary(&report);
    Ok(())
}

fn print_summary(report: &HypoReport) {
    let overall = &report.overall;
    eprintln!(
        "{} episodes ({} severe) over {} days, average LBGI {:.2}",
        overall.total_hypo_events, overall.total_severe_events, overall.total_days, overall.average_lbgi
    );
    eprintln!(
        "Days with hypos: {} ({:.0}%)",
        overall.days_with_hypos,
        overall.hypo_day_percent()
    );

    if let Some(lowest) = overall.lowest_value {
        let lowest = MmolL(lowest);
        eprintln!("Lowest nadir: {} ({})", lowest.format(), lowest.to_mgdl().format());
    }

    for day in report.daily.iter().filter(|d| d.risk_band() != RiskBand::Low) {
        eprintln!(
            "  {} {}: {} risk, LBGI {:.2}",
            day.date,
            day.day_of_week,
            day.risk_band().label(),
            day.lbgi
        );
    }
}

fn cmd_import(
    config: &Config,
    glucose: Option<PathBuf>,
    insulin: Option<PathBuf>,
) -> Result<(), HypoError> {
    let db_path = config.database_path();
    let mut storage = Storage::new(&db_path)?;

    if let Some(path) = glucose {
        let readings = load_glucose(path)?;
        let new_count = storage.import_glucose(&readings)?;
        info!("Imported {} new glucose readings", new_count);
        eprintln!("Glucose readings: {} read, {} new", readings.len(), new_count);
    }

    if let Some(path) = insulin {
        let records = load_insulin(path)?;
        let new_count = storage.import_insulin(&records)?;
        eprintln!("Insulin records:  {} read, {} new", records.len(), new_count);
    }

    eprintln!("Total glucose readings in DB: {}", storage.count()?);
    eprintln!("Saved to: {}", db_path.display());
    Ok(())
}

fn cmd_show_paths(config: &Config) {
    println!("hypostat data paths:");
    println!("  Data directory:  {}", get_data_dir().display());
    println!("  Database:        {}", config.database_path().display());
    println!("  Default DB:      {}", default_database_path().display());
    println!("  Config file:     {}", config_file_path().display());
}
