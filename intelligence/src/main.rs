//! Gasroute - cross-chain swap cost optimizer
//!
//! Prices a swap request on every supported chain and prints the recommendation.

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gasroute_dataplane::{HttpMarketDataFeed, MarketDataProvider, StaticMarketDataFeed};
use gasroute_intelligence::{
    ControllerSettings, EngineConfig, OptimizationEngine, QuoteEvent, RefreshController,
    SwapRequest, UserPreferences, VERSION,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let matches = Command::new("gasroute")
        .version(VERSION)
        .about("Cross-chain swap cost optimizer")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path (YAML)"),
        )
        .arg(
            Arg::new("snapshot")
                .short('s')
                .long("snapshot")
                .value_name("FILE")
                .help("Market data snapshot (JSON) to evaluate against")
                .conflicts_with("api-url"),
        )
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .value_name("URL")
                .help("Market data API base URL (overrides config)"),
        )
        .arg(
            Arg::new("request")
                .short('r')
                .long("request")
                .value_name("FILE")
                .help("Swap request (JSON)")
                .required_unless_present("generate-config"),
        )
        .arg(
            Arg::new("preferences")
                .short('p')
                .long("preferences")
                .value_name("FILE")
                .help("User preferences (JSON); defaults from config otherwise"),
        )
        .arg(
            Arg::new("watch")
                .short('w')
                .long("watch")
                .help("Keep refreshing the quote until interrupted")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("OUTPUT")
                .help("Generate example config and exit"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)")
                .default_value("info"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Emit logs as JSON")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    // Initialize logging
    let log_level = matches
        .get_one::<String>("log-level")
        .map(String::as_str)
        .unwrap_or("info");
    init_logging(log_level, matches.get_flag("json-logs"));

    // Handle config generation
    if let Some(output_path) = matches.get_one::<String>("generate-config") {
        EngineConfig::default()
            .save_to_file(output_path)
            .with_context(|| format!("writing config to {}", output_path))?;
        info!("Generated example config at: {}", output_path);
        return Ok(());
    }

    info!(version = VERSION, "⛽ Gasroute starting...");

    let config_path = matches.get_one::<String>("config").map(|p| Path::new(p.as_str()));
    let mut config = EngineConfig::load(config_path).context("loading configuration")?;
    if let Some(api_url) = matches.get_one::<String>("api-url") {
        config.market_data.http.base_url = api_url.clone();
    }

    let provider: Arc<dyn MarketDataProvider> = match matches.get_one::<String>("snapshot") {
        Some(path) => {
            info!("Using market data snapshot: {}", path);
            Arc::new(
                StaticMarketDataFeed::from_file(path)
                    .with_context(|| format!("loading snapshot {}", path))?,
            )
        }
        None => {
            info!("Using market data API: {}", config.market_data.http.base_url);
            Arc::new(HttpMarketDataFeed::new(&config.market_data.http)?)
        }
    };

    let request_path = matches
        .get_one::<String>("request")
        .context("--request is required")?;
    let request: SwapRequest = read_json(request_path)?;

    let preferences = match matches.get_one::<String>("preferences") {
        Some(path) => read_json::<UserPreferences>(path)?,
        None => config.default_preferences(),
    };

    let settings = ControllerSettings::from_config(&config);
    let engine = OptimizationEngine::new(config, provider);

    if matches.get_flag("watch") {
        return run_watch(engine, request, preferences, settings).await;
    }

    match engine.get_optimization_quote(&request, &preferences).await {
        Ok(quote) => {
            println!("{}", serde_json::to_string_pretty(&quote)?);
            Ok(())
        }
        Err(e) => {
            error!(kind = e.kind(), "Evaluation failed: {}", e);
            Err(e.into())
        }
    }
}

/// Run the refresh controller and print every transition until interrupted
async fn run_watch(
    engine: OptimizationEngine,
    request: SwapRequest,
    preferences: UserPreferences,
    settings: ControllerSettings,
) -> Result<()> {
    let (handle, task) = RefreshController::spawn(engine, preferences, settings);
    let mut events = handle.subscribe();
    handle.submit(request).await?;

    info!(
        "🔁 Watching quote (refresh every {}s)",
        settings.refresh_interval.as_secs()
    );

    let shutdown_signal = setup_shutdown_signal();
    tokio::pin!(shutdown_signal);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(QuoteEvent::Evaluating { generation }) => {
                    info!(generation, "Evaluating...");
                }
                Ok(QuoteEvent::Ready { generation, quote }) => {
                    info!(generation, should_optimize = quote.should_optimize, "✅ Quote ready");
                    println!("{}", serde_json::to_string_pretty(quote.as_ref())?);
                }
                Ok(QuoteEvent::Failed { generation, error }) => {
                    warn!(generation, kind = error.kind(), "❌ Evaluation failed: {}", error);
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Missed quote events");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            _ = &mut shutdown_signal => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    handle.shutdown().await.ok();
    task.await.ok();
    info!("Gasroute stopped");
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path))
}

/// Initialize logging
fn init_logging(log_level: &str, json: bool) {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => {
            eprintln!("Invalid log level: {}. Using 'info'", log_level);
            tracing::Level::INFO
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "gasroute_intelligence={},gasroute_dataplane={}",
            level, level
        )
        .into()
    });

    // Quotes go to stdout, logs to stderr
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text_layer =
        (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

/// Set up graceful shutdown signal handling
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
