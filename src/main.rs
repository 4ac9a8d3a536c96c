use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;

use sat_o_vis::batch::{BatchRunner, BatchUnit, CancelToken};
use sat_o_vis::config::{Config, ConfigError};
use sat_o_vis::predict::{
    parse_multi_tle, parse_tle_file, ObserverInput, OrbitalElementSet, PassCache, PredictError,
    TleLoader, VisibilityEngine,
};
use sat_o_vis::report::{ReportView, ScheduleView};

#[derive(Parser)]
#[command(name = "sat-o-vis")]
#[command(about = "Satellite pass and common visibility prediction")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Passes over one station for one day
    Passes(PredictArgs),
    /// Passes over two or more stations and their common visibility windows
    Common(PredictArgs),
    /// Passes over every selected station for several consecutive days
    Schedule {
        #[command(flatten)]
        args: PredictArgs,
        /// Number of UTC days starting at --date
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Age of an element set
    Freshness {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long)]
        json: bool,
    },
    /// Validate a TLE file
    Validate { tle: PathBuf },
}

#[derive(Args)]
struct SourceArgs {
    /// TLE file; the first entry is used unless --norad or --satellite is given
    #[arg(long)]
    tle: Option<PathBuf>,
    /// Catalog number, looked up in --tle or the configured TLE folder
    #[arg(long, conflicts_with = "satellite")]
    norad: Option<u64>,
    /// Satellite name, looked up in --tle or the configured TLE folder
    #[arg(long)]
    satellite: Option<String>,
}

#[derive(Args)]
struct PredictArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Configured station name or name:lat,lon[,alt_m]; repeatable.
    /// Defaults to the configured stations
    #[arg(long = "station")]
    stations: Vec<String>,
    /// UTC day (YYYY-MM-DD), defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Minimum elevation in degrees, defaults to the configured value
    #[arg(long)]
    min_elevation: Option<f64>,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Predict(#[from] PredictError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Usage(String),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match Config::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level.as_str()),
    )
    .init();

    let result = match cli.command {
        Commands::Passes(args) => predict(&config, &args, false),
        Commands::Common(args) => predict(&config, &args, true),
        Commands::Schedule { args, days } => schedule(&config, &args, days),
        Commands::Freshness { source, json } => freshness(&config, &source, json),
        Commands::Validate { tle } => validate(&tle),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn predict(config: &Config, args: &PredictArgs, common: bool) -> Result<ExitCode, CliError> {
    let elements = load_elements(config, &args.source)?;

    let inputs = station_inputs(config, args)?;

    let inputs = match (common, inputs.len()) {
        (true, n) if n < 2 => {
            return Err(CliError::Usage(
                "common windows need at least two stations".into(),
            ))
        }
        (false, 0) => return Err(CliError::Usage("no station given".into())),
        (false, _) => inputs[..1].to_vec(),
        (true, _) => inputs,
    };

    let date = args.date.unwrap_or_else(|| Utc::now().date_naive());
    let threshold = args
        .min_elevation
        .unwrap_or(config.prediction.min_elevation_deg);

    let engine = VisibilityEngine::new(config.propagator(), config.engine_settings())?;
    let report = engine.day_report(&elements, &inputs, date, threshold, Utc::now());
    let view = ReportView::new(&elements, &report);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print!("{}", view.render_text());
    }

    if view.stations.iter().any(|s| s.error.is_some()) {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Per-day pass lists computed on the batch worker pool.
fn schedule(config: &Config, args: &PredictArgs, days: u32) -> Result<ExitCode, CliError> {
    let elements = load_elements(config, &args.source)?;
    let inputs = station_inputs(config, args)?;
    if inputs.is_empty() {
        return Err(CliError::Usage("no station given".into()));
    }

    let mut observers = Vec::new();
    let mut rejected = Vec::new();
    for input in &inputs {
        match input.validate() {
            Ok(observer) => observers.push(observer),
            Err(e) => {
                log::warn!("Rejected observer {}: {}", input.name, e);
                rejected.push((input.name.clone(), e));
            }
        }
    }

    let start = args.date.unwrap_or_else(|| Utc::now().date_naive());
    let threshold = args
        .min_elevation
        .unwrap_or(config.prediction.min_elevation_deg);

    let engine = VisibilityEngine::new(config.propagator(), config.engine_settings())?;
    let units = BatchUnit::schedule(&elements, &observers, start, days, threshold);
    let runner = BatchRunner::new(config.batch.workers).with_cache(Arc::new(PassCache::new()));
    let outcomes = runner.run(&engine, &units, &CancelToken::new());

    let freshness = engine.freshness(&elements, Utc::now());
    if let Some(warning) = &freshness.warning {
        log::warn!("{}", warning);
    }
    let view = rejected.iter().fold(
        ScheduleView::new(&elements, freshness, threshold, &units, &outcomes),
        |view, (name, e)| view.with_rejected(name, e),
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print!("{}", view.render_text());
    }

    if view.has_errors() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn freshness(config: &Config, source: &SourceArgs, json: bool) -> Result<ExitCode, CliError> {
    let elements = load_elements(config, source)?;
    let engine = VisibilityEngine::new(config.propagator(), config.engine_settings())?;
    let freshness = engine.freshness(&elements, Utc::now());

    if json {
        println!("{}", serde_json::to_string_pretty(&freshness)?);
    } else {
        println!(
            "{} ({}): epoch {}, {:.1} days old, {}",
            elements.name,
            elements.norad_id,
            freshness.epoch.format("%Y-%m-%d %H:%M:%S UTC"),
            freshness.age_days,
            freshness.status
        );
        if let Some(warning) = &freshness.warning {
            println!("WARNING: {}", warning);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn validate(path: &Path) -> Result<ExitCode, CliError> {
    let content = fs::read_to_string(path).map_err(PredictError::from)?;
    let entries = parse_multi_tle(&content);
    if entries.is_empty() {
        return Err(CliError::Usage(format!(
            "no TLE entries found in {}",
            path.display()
        )));
    }

    let mut failed = 0;
    for (i, (name, line1, line2)) in entries.into_iter().enumerate() {
        match OrbitalElementSet::from_lines(name, line1, line2) {
            Ok(set) => println!(
                "  {}: {} ({}) epoch {}, period {:.2} min",
                i + 1,
                set.name,
                set.norad_id,
                set.epoch.format("%Y-%m-%d %H:%M:%S"),
                set.period_minutes()
            ),
            Err(e) => {
                failed += 1;
                println!("  {}: {}", i + 1, e);
            }
        }
    }

    if failed == 0 {
        println!("TLE file is valid");
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("{} invalid entries", failed);
        Ok(ExitCode::FAILURE)
    }
}

fn load_elements(config: &Config, source: &SourceArgs) -> Result<OrbitalElementSet, CliError> {
    let wanted = |set: &OrbitalElementSet| match (source.norad, &source.satellite) {
        (Some(id), _) => set.norad_id == id,
        (None, Some(name)) => set.name.eq_ignore_ascii_case(name.trim()),
        (None, None) => true,
    };

    if let Some(path) = &source.tle {
        return parse_tle_file(path)?
            .into_iter()
            .find(|set| wanted(set))
            .ok_or_else(|| {
                CliError::Usage(format!("no matching element set in {}", path.display()))
            });
    }

    let mut loader = TleLoader::new(config.tle_folder.clone());
    let found = match (source.norad, &source.satellite) {
        (Some(id), _) => {
            loader.load_all()?;
            loader.by_norad_id(id)
        }
        (None, Some(name)) => {
            loader.load_all()?;
            loader.by_name(name)
        }
        (None, None) => {
            return Err(CliError::Usage(
                "one of --tle, --norad or --satellite is required".into(),
            ))
        }
    };
    found.cloned().ok_or_else(|| {
        CliError::Usage(format!(
            "no matching element set in {}",
            config.tle_folder.display()
        ))
    })
}

/// Stations named on the command line, or the configured ones.
fn station_inputs(config: &Config, args: &PredictArgs) -> Result<Vec<ObserverInput>, CliError> {
    if args.stations.is_empty() {
        return Ok(config.observer_inputs());
    }
    let inputs = args
        .stations
        .iter()
        .map(|s| config.station_input(s))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(inputs)
}
