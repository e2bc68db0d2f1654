//! CareWatch monitor - main entry point
//!
//! Wires configuration, the Telegram transport, the acknowledgement
//! listener, and the frame-processing engine together, then runs until the
//! frame source ends or the process is signalled.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use carewatch_common::config::MonitorConfig;
use carewatch_common::messages::MessageCatalog;
use carewatch_monitor::classifier::GeometricClassifier;
use carewatch_monitor::dispatcher::AlertDispatcher;
use carewatch_monitor::engine::MonitorEngine;
use carewatch_monitor::source::ReplaySource;
use carewatch_monitor::telegram::{AckListener, BotCredentials, TelegramTransport};

/// Command-line arguments for carewatch-monitor
#[derive(Parser, Debug)]
#[command(name = "carewatch-monitor")]
#[command(about = "Elderly pose monitoring and alerting service")]
#[command(version)]
struct Args {
    /// Path to carewatch.toml (falls back to the platform config dir)
    #[arg(short, long, env = "CAREWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of frames to process (with optional landmark sidecars)
    #[arg(short, long, env = "CAREWATCH_FRAMES")]
    frames: PathBuf,

    /// Override the configured message language
    #[arg(short, long, env = "CAREWATCH_LANG")]
    language: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carewatch_monitor=debug,carewatch_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config_path = MonitorConfig::resolve_path(args.config.as_deref())
        .context("Failed to locate configuration")?;
    let config = Arc::new(
        MonitorConfig::load(&config_path).context("Failed to load configuration")?,
    );

    let language = args
        .language
        .unwrap_or_else(|| config.i18n.language.clone());
    let catalog_path = config_path
        .parent()
        .unwrap_or_else(|| std::path::Path::new("."))
        .join("i18n")
        .join(format!("{}.toml", language));
    let catalog = Arc::new(
        MessageCatalog::load(&catalog_path).context("Failed to load message catalog")?,
    );
    config
        .validate_messages(&catalog)
        .context("Configured message keys do not resolve")?;

    info!(
        config = %config_path.display(),
        language = %language,
        "CareWatch monitor starting"
    );

    let credentials = BotCredentials::from_env().context("Telegram credentials missing")?;
    let send_timeout = Duration::from_secs(config.alerting.send_timeout_secs);
    let transport = Arc::new(
        TelegramTransport::new(credentials.clone(), send_timeout)
            .context("Failed to build Telegram transport")?,
    );

    let dispatcher = Arc::new(AlertDispatcher::new(
        transport,
        catalog.clone(),
        Duration::from_secs(config.alerting.interval_secs),
    ));

    // The acknowledgement listener is the only concurrent actor; it owns
    // its own HTTP client and only touches the dispatcher's atomic flag.
    let listener = AckListener::new(credentials, dispatcher.clone(), catalog)
        .context("Failed to build acknowledgement listener")?;
    tokio::spawn(listener.run());

    let mut source =
        ReplaySource::open(&args.frames).context("Failed to open frame source")?;
    let mut engine = MonitorEngine::new(
        config,
        Box::new(GeometricClassifier::default()),
        dispatcher,
    );

    tokio::select! {
        result = engine.run(&mut source) => {
            result.context("Monitoring loop failed")?;
        }
        _ = shutdown_signal() => {
            info!("Shutdown complete");
        }
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
