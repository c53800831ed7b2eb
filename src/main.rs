use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};

use iss_predict::config::Config;
use iss_predict::orbit::parse_tle;
use iss_predict::predict::{LocationSample, PathRequest, PredictionEngine};
use iss_predict::refresh::{lock_engine, Refresher};
use iss_predict::sweep::{run_sweep, SweepGrid};
use iss_predict::web::run_server;

#[derive(Parser)]
#[command(name = "iss-predict")]
#[command(about = "ISS ground track prediction")]
struct Cli {
    /// YAML configuration file; defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the prediction API
    Serve,
    /// Predict a single position
    Predict {
        #[command(flatten)]
        position: PositionArgs,
        /// Minutes ahead of the current position
        #[arg(short, long)]
        minutes: f64,
    },
    /// Predict a sequence of positions
    Path {
        #[command(flatten)]
        position: PositionArgs,
        #[arg(long, default_value_t = 5.0)]
        start: f64,
        #[arg(long, default_value_t = 90.0)]
        end: f64,
        #[arg(long, default_value_t = 5.0)]
        step: f64,
    },
    /// Parse a TLE file and print the derived orbital parameters
    Tle {
        file: PathBuf,
        #[arg(long)]
        norad_id: Option<u32>,
    },
    /// Backtest blend settings against a recorded history
    Sweep {
        /// JSON array of samples
        history: PathBuf,
        /// Horizons to score, in minutes
        #[arg(long, value_delimiter = ',')]
        horizons: Option<Vec<f64>>,
    },
}

#[derive(Args)]
struct PositionArgs {
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,
    /// Observation time (RFC3339), now when omitted
    #[arg(long)]
    at: Option<DateTime<Utc>>,
    /// JSON array of earlier samples, newest first
    #[arg(long)]
    history: Option<PathBuf>,
    /// Skip fetching TLE and polynomial models
    #[arg(long)]
    offline: bool,
}

impl PositionArgs {
    fn current(&self) -> LocationSample {
        LocationSample::new(self.at.unwrap_or_else(Utc::now), self.lat, self.lon)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match Config::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Predict { position, minutes } => predict(config, &position, minutes).await,
        Commands::Path {
            position,
            start,
            end,
            step,
        } => path(config, &position, start, end, step).await,
        Commands::Tle { file, norad_id } => tle(&file, norad_id),
        Commands::Sweep { history, horizons } => sweep(&config, &history, horizons),
    }
}

async fn serve(config: Config) -> ExitCode {
    let engine = Arc::new(Mutex::new(PredictionEngine::new(config.engine_settings())));
    match run_server(config, engine).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn prepare_engine(config: &Config, offline: bool) -> Mutex<PredictionEngine> {
    let engine = Mutex::new(PredictionEngine::new(config.engine_settings()));
    if !offline {
        Refresher::from_config(config).refresh_due(&engine).await;
    }
    engine
}

async fn predict(config: Config, position: &PositionArgs, minutes: f64) -> ExitCode {
    let history = match load_history(position.history.as_deref()) {
        Ok(h) => h,
        Err(code) => return code,
    };
    let engine = prepare_engine(&config, position.offline).await;
    let result = lock_engine(&engine).predict(&position.current(), minutes, &history);

    match result {
        Ok(Some(prediction)) => print_json(&prediction),
        Ok(None) => {
            eprintln!("No prediction available");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Invalid request: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn path(config: Config, position: &PositionArgs, start: f64, end: f64, step: f64) -> ExitCode {
    let history = match load_history(position.history.as_deref()) {
        Ok(h) => h,
        Err(code) => return code,
    };
    let request = PathRequest {
        current: position.current(),
        start_minutes: start,
        end_minutes: end,
        step_minutes: step,
        history,
    };
    let engine = prepare_engine(&config, position.offline).await;
    let mut engine = lock_engine(&engine);

    match engine.path(&request) {
        Ok(steps) => {
            let predictions: Vec<_> = steps.collect();
            print_json(&predictions)
        }
        Err(e) => {
            eprintln!("Invalid request: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn tle(file: &Path, norad_id: Option<u32>) -> ExitCode {
    let content = match fs::read_to_string(file) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match parse_tle(&content, norad_id, Utc::now()) {
        Ok(record) => {
            println!("{}", record.name);
            println!("  inclination:   {:.4} deg", record.inclination);
            println!("  eccentricity:  {:.7}", record.eccentricity);
            println!("  mean motion:   {:.8} rev/day", record.mean_motion);
            println!("  period:        {:.3} min", record.derived_period_minutes);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Parse error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn sweep(config: &Config, history: &Path, horizons: Option<Vec<f64>>) -> ExitCode {
    let samples = match load_history(Some(history)) {
        Ok(h) => h,
        Err(code) => return code,
    };
    let mut grid = SweepGrid::default();
    if let Some(horizons) = horizons {
        grid.horizons = horizons;
    }

    let results = run_sweep(&samples, &config.engine_settings(), &grid);
    if results.is_empty() {
        eprintln!("History too short to score any prediction");
        return ExitCode::FAILURE;
    }
    print_json(&results)
}

fn load_history(path: Option<&Path>) -> Result<Vec<LocationSample>, ExitCode> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let content = fs::read_to_string(path).map_err(|e| {
        eprintln!("Error reading history {}: {}", path.display(), e);
        ExitCode::FAILURE
    })?;
    serde_json::from_str(&content).map_err(|e| {
        eprintln!("Invalid history {}: {}", path.display(), e);
        ExitCode::FAILURE
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Serialization error: {}", e);
            ExitCode::FAILURE
        }
    }
}
