//! # Supply Chain Watchtower
//!
//! Command-line front end for the `demand_forecast` library.
//!
//! ## Usage
//!
//! ```bash
//! # Two years of synthetic daily demand
//! watchtower generate --out-path data/synthetic_demand.csv --periods 730 --seed 42
//!
//! # Score on the last 30 days, then forecast 30 days ahead
//! watchtower forecast --data-path data/synthetic_demand.csv --test-periods 30 \
//!     --horizon 30 --out-forecast out/forecast.csv --plot-path out/forecast.svg
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `info`,
//! `debug` with `--verbose`).

mod plot;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use demand_forecast::export::{save_forecast, save_metrics, save_series};
use demand_forecast::models::seasonal::SeasonalTrendForecaster;
use demand_forecast::pipeline::{forecast_series, holdout_evaluation};
use demand_forecast::{
    Frequency, Result, SeasonalityMode, SeriesLoader, SyntheticSeriesGenerator, SyntheticSpec,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "watchtower")]
#[command(about = "Supply Chain Watchtower CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate synthetic demand data
    Generate {
        /// CSV output path
        #[arg(long, default_value = "data/synthetic_demand.csv")]
        out_path: PathBuf,

        /// Start date (YYYY-MM-DD), defaults to January 1st of the current year
        #[arg(long)]
        start_date: Option<NaiveDate>,

        /// Number of rows
        #[arg(long, default_value_t = 730)]
        periods: usize,

        /// Date frequency (H, D, W, M)
        #[arg(long, default_value = "D")]
        freq: Frequency,

        /// Random seed
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Train the seasonal trend model and forecast demand
    Forecast {
        /// Input CSV path
        #[arg(long, default_value = "data/synthetic_demand.csv")]
        data_path: PathBuf,

        /// Date column name
        #[arg(long, default_value = "ds")]
        date_col: String,

        /// Value column name
        #[arg(long, default_value = "y")]
        value_col: String,

        /// Date frequency (H, D, W, M)
        #[arg(long, default_value = "D")]
        freq: Frequency,

        /// Forecast horizon in periods (0 = history only)
        #[arg(long, default_value_t = 30)]
        horizon: usize,

        /// Holdout periods for MAE/MAPE evaluation, 0 to skip
        #[arg(long, default_value_t = 0)]
        test_periods: usize,

        /// Seasonality mode (additive, multiplicative)
        #[arg(long, default_value = "multiplicative")]
        seasonality_mode: SeasonalityMode,

        /// Coverage of the uncertainty interval
        #[arg(long, default_value_t = 0.8)]
        interval_width: f64,

        /// Save forecast plot (SVG)
        #[arg(long)]
        plot_path: Option<PathBuf>,

        /// Save forecast CSV
        #[arg(long)]
        out_forecast: Option<PathBuf>,

        /// Save holdout metrics JSON
        #[arg(long)]
        metrics_out: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Generate {
            out_path,
            start_date,
            periods,
            freq,
            seed,
        } => run_generate(out_path, start_date, periods, freq, seed),
        Commands::Forecast {
            data_path,
            date_col,
            value_col,
            freq,
            horizon,
            test_periods,
            seasonality_mode,
            interval_width,
            plot_path,
            out_forecast,
            metrics_out,
        } => {
            let args = ForecastArgs {
                data_path,
                date_col,
                value_col,
                freq,
                horizon,
                test_periods,
                seasonality_mode,
                interval_width,
                plot_path,
                out_forecast,
                metrics_out,
            };
            run_forecast(&args)
        }
    }
}

fn run_generate(
    out_path: PathBuf,
    start_date: Option<NaiveDate>,
    periods: usize,
    freq: Frequency,
    seed: u64,
) -> Result<()> {
    let start_date = start_date.unwrap_or_else(|| SyntheticSpec::default().start_date());
    let spec = SyntheticSpec::new(start_date, periods, freq, seed)?;
    info!(?spec, "generating synthetic demand");

    let series = SyntheticSeriesGenerator::new().generate(&spec)?;
    save_series(&series, &out_path)?;

    println!("Generated {} rows -> {}", series.len(), out_path.display());
    Ok(())
}

/// Options of the `forecast` command
#[derive(Debug)]
struct ForecastArgs {
    data_path: PathBuf,
    date_col: String,
    value_col: String,
    freq: Frequency,
    horizon: usize,
    test_periods: usize,
    seasonality_mode: SeasonalityMode,
    interval_width: f64,
    plot_path: Option<PathBuf>,
    out_forecast: Option<PathBuf>,
    metrics_out: Option<PathBuf>,
}

fn run_forecast(args: &ForecastArgs) -> Result<()> {
    let forecaster = SeasonalTrendForecaster::new().with_interval_width(args.interval_width)?;
    let series = SeriesLoader::new(&args.date_col, &args.value_col).load_csv(&args.data_path)?;

    // Optional holdout evaluation before final training
    let metrics = if args.test_periods > 0 {
        let metrics = holdout_evaluation(
            &forecaster,
            &series,
            args.test_periods,
            args.seasonality_mode,
            args.freq,
        )?;
        println!("{}", metrics);
        Some(metrics)
    } else {
        None
    };

    // Train on all data and forecast the requested horizon
    let forecast = forecast_series(
        &forecaster,
        &series,
        args.horizon,
        args.seasonality_mode,
        args.freq,
    )?;

    if let (Some(metrics), Some(path)) = (&metrics, &args.metrics_out) {
        save_metrics(metrics, path)?;
        println!("Saved metrics -> {}", path.display());
    }

    if let Some(path) = &args.out_forecast {
        save_forecast(&forecast, path)?;
        println!("Saved forecast -> {}", path.display());
    }

    if let Some(path) = &args.plot_path {
        plot::render_svg(&series, &forecast, path)?;
        println!("Saved plot -> {}", path.display());
    }

    Ok(())
}
