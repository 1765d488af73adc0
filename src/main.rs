//! AlertAir CLI
//!
//! SO₂ forecast and alert dashboard for the Gabès industrial zone.

use alertair::{
    config::{Config, SourceConfig},
    core::{backtest, quality::QualityReport, ForecastArtifacts, Forecaster, Pollutant},
    dashboard::{render_text, DashboardBuilder},
    source::{self, DataSource},
    tally::{create_shared_tally, SharedRenderTally},
    DEMO_NOTICE, VERSION,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "alertair")]
#[command(version = VERSION)]
#[command(about = "SO2 forecast and health alert dashboard for Gabès", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast and render the dashboard
    Render {
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Use the synthetic fixture source instead of the configured one
        #[arg(long)]
        fixture: bool,

        /// Re-render every N seconds until Ctrl+C
        #[arg(long)]
        watch: Option<u64>,
    },

    /// Check the data source and artifacts
    Validate {
        /// Use the synthetic fixture source instead of the configured one
        #[arg(long)]
        fixture: bool,
    },

    /// Measure forecast accuracy on past observations
    Backtest {
        /// Only evaluate the most recent N windows
        #[arg(long)]
        last: Option<usize>,

        /// Use the synthetic fixture source instead of the configured one
        #[arg(long)]
        fixture: bool,
    },

    /// Show the alert thresholds
    Thresholds,

    /// Show configuration
    Config,

    /// Display the demonstration notice
    Notice,

    /// Serve the dashboard over HTTP
    #[cfg(feature = "server")]
    Serve {
        /// Port to bind on 127.0.0.1
        #[arg(long, default_value = "8050")]
        port: u16,

        /// Use the synthetic fixture source instead of the configured one
        #[arg(long)]
        fixture: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "alertair=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config_path = cli.config;

    match cli.command {
        Commands::Render {
            format,
            fixture,
            watch,
        } => cmd_render(load_config(&config_path, fixture), format, watch),
        Commands::Validate { fixture } => cmd_validate(load_config(&config_path, fixture)),
        Commands::Backtest { last, fixture } => {
            cmd_backtest(load_config(&config_path, fixture), last)
        }
        Commands::Thresholds => cmd_thresholds(load_config(&config_path, false)),
        Commands::Config => cmd_config(load_config(&config_path, false), &config_path),
        Commands::Notice => cmd_notice(),
        #[cfg(feature = "server")]
        Commands::Serve { port, fixture } => cmd_serve(load_config(&config_path, fixture), port),
    }
}

/// Load the explicit or default config; exits on error.
fn load_config(path: &Option<PathBuf>, fixture: bool) -> Config {
    let result = match path {
        Some(path) => Config::load_from(path),
        None => Config::load().and_then(|c| c.validate().map(|_| c)),
    };
    let mut config = result.unwrap_or_else(|e| fail(format!("Error loading config: {e}")));
    if fixture {
        config.source = SourceConfig::default_fixture();
    }
    config
}

fn load_forecaster(config: &Config) -> Forecaster {
    let artifacts = ForecastArtifacts::load(&config.model_path, &config.scaler_path)
        .unwrap_or_else(|e| fail(format!("Error loading model: {e}")));
    Forecaster::new(
        Arc::new(artifacts),
        config.alert.clone(),
        config.feature_columns.clone(),
        config.horizon_hours,
    )
}

fn load_source(config: &Config) -> Box<dyn DataSource> {
    source::from_config(config).unwrap_or_else(|e| fail(format!("Error: {e}")))
}

fn fail(message: String) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}

fn cmd_render(config: Config, format: OutputFormat, watch: Option<u64>) {
    let forecaster = load_forecaster(&config);
    let source = load_source(&config);
    let builder = DashboardBuilder::new(&config).unwrap_or_else(|e| fail(format!("Error: {e}")));
    let tally = create_shared_tally();

    let render_once = |tally: &SharedRenderTally| -> Result<(), String> {
        let table = source.load().map_err(|e| format!("Error loading data: {e}"))?;
        let forecast = forecaster
            .forecast(&table)
            .map_err(|e| format!("Error [{}]: {e}", e.code()))?;
        let view = builder.build(&table, &forecast);
        tally.record_level(view.alert.level);

        match format {
            OutputFormat::Text => println!("{}", render_text(&view)),
            OutputFormat::Json => println!(
                "{}",
                serde_json::to_string_pretty(&view).map_err(|e| format!("Error: {e}"))?
            ),
        }
        Ok(())
    };

    let Some(interval) = watch else {
        if let Err(message) = render_once(&tally) {
            fail(message);
        }
        return;
    };

    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc_handler(stop_tx);
    eprintln!("Refreshing every {interval}s. Press Ctrl+C to stop");

    loop {
        if let Err(message) = render_once(&tally) {
            tally.record_failure();
            eprintln!("{message}");
        }
        match stop_rx.recv_timeout(Duration::from_secs(interval.max(1))) {
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }
    }

    eprintln!();
    eprintln!("{}", tally.summary());
}

fn cmd_validate(config: Config) {
    println!("AlertAir Validation");
    println!("===================");
    println!();

    let source = load_source(&config);
    println!("Source: {}", source.describe());
    let table = source
        .load()
        .unwrap_or_else(|e| fail(format!("Error loading data: {e}")));
    let report = QualityReport::inspect(&table, &config.feature_columns, &config.target_column);
    println!("{}", report.summary());
    println!();

    let artifacts = ForecastArtifacts::load(&config.model_path, &config.scaler_path);
    match &artifacts {
        Ok(_) => println!("Artifacts: OK ({:?}, {:?})", config.model_path, config.scaler_path),
        Err(e) => println!("Artifacts: {e}"),
    }

    if !report.valid || artifacts.is_err() {
        std::process::exit(1);
    }
}

fn cmd_backtest(config: Config, last: Option<usize>) {
    let forecaster = load_forecaster(&config);
    let table = load_source(&config)
        .load()
        .unwrap_or_else(|e| fail(format!("Error loading data: {e}")));

    let report = backtest(&forecaster, &table, &config.target_column, last)
        .unwrap_or_else(|e| fail(format!("Error [{}]: {e}", e.code())));

    let Some(report) = report else {
        println!("No window has an observed target {}h later.", config.horizon_hours);
        return;
    };

    println!("Backtest ({}h horizon)", config.horizon_hours);
    println!("======================");
    println!();
    println!("  Samples: {}", report.sample_size);
    println!("  RMSE: {:.2} µg/m³", report.rmse);
    println!("  MAE: {:.2} µg/m³", report.mae);
    println!("  R²: {:.3}", report.r2);
    println!("  Level agreement: {:.1}%", report.level_agreement * 100.0);
    println!();
    println!("Predicted levels:");
    for (level, count) in &report.predicted_levels {
        println!("  {:<8} {count}", level.label());
    }
}

fn cmd_thresholds(config: Config) {
    println!("Alert thresholds ({})", config.target_column);
    println!("================");
    println!();
    for entry in config.alert.legend() {
        println!("  {:<8} {:<10} {:<14} {}", entry.level.label(), entry.name, entry.range, entry.color);
    }

    for pollutant in Pollutant::ALL {
        println!();
        println!("Current {} thresholds", pollutant.label());
        for entry in config.current_alerts.get(pollutant).legend() {
            println!("  {:<8} {:<10} {}", entry.level.label(), entry.name, entry.range);
        }
    }
}

fn cmd_config(config: Config, path: &Option<PathBuf>) {
    println!("Configuration");
    println!("=============");
    println!();
    println!(
        "Config file: {:?}",
        path.clone().unwrap_or_else(Config::config_path)
    );
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

fn cmd_notice() {
    println!("{DEMO_NOTICE}");
}

#[cfg(feature = "server")]
fn cmd_serve(config: Config, port: u16) {
    use alertair::server::{run, ServerConfig};

    let runtime = tokio::runtime::Runtime::new()
        .unwrap_or_else(|e| fail(format!("Error starting runtime: {e}")));

    let (addr, shutdown_tx) = runtime
        .block_on(run(ServerConfig::new(port, config)))
        .unwrap_or_else(|e| fail(format!("Error starting server: {e}")));

    println!("AlertAir v{VERSION}");
    println!("Dashboard: http://{addr}/dashboard");
    println!("Press Ctrl+C to stop");

    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc_handler(stop_tx);
    let _ = stop_rx.recv();

    println!("Stopping server...");
    let _ = shutdown_tx.send(());
    runtime.shutdown_timeout(Duration::from_secs(5));
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(stop: crossbeam_channel::Sender<()>) {
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = stop.try_send(());
    }) {
        eprintln!("Warning: Could not set Ctrl+C handler: {e}");
    }
}
