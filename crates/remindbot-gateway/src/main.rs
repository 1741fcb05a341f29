use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use remindbot_channels::{ChatPlatform, MemoryPlatform};
use remindbot_core::{config::RemindbotConfig, Catalog};
use remindbot_scheduler::{Dispatcher, ReminderStore};
use remindbot_service::{ReminderService, ServiceSettings};
use tracing::{info, warn};

mod app;
mod http;
mod platform;

#[derive(Debug, Parser)]
#[command(name = "remindbot-gateway", version, about = "Chat reminder bot gateway")]
struct Cli {
    /// Path to remindbot.toml (default: ~/.remindbot/remindbot.toml).
    #[arg(long, short)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "remindbot_gateway=info,remindbot_scheduler=info,remindbot_service=info,tower_http=debug"
                    .into()
            }),
        )
        .init();

    let cli = Cli::parse();

    // load config: --config > REMINDBOT_CONFIG env > ~/.remindbot/remindbot.toml
    let config_path = cli
        .config
        .or_else(|| std::env::var("REMINDBOT_CONFIG").ok());
    let config = RemindbotConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        RemindbotConfig::default()
    });

    let mut catalog = Catalog::builtin();
    if let Some(dir) = &config.locale.catalog_dir {
        match catalog.load_dir(Path::new(dir)) {
            Ok(n) => info!(dir = %dir, locales = n, "string catalogs loaded"),
            Err(e) => warn!(dir = %dir, "string catalogs not loaded: {e}"),
        }
    }

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");
    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL;")?;
    let store = Arc::new(ReminderStore::new(db)?);

    let platform: Arc<dyn ChatPlatform> = match &config.platform.base_url {
        Some(url) => {
            info!(url = %url, "platform bridge configured");
            Arc::new(platform::HttpPlatform::new(url, &config.platform))
        }
        None => {
            warn!("platform.base_url not set; posts are only logged");
            Arc::new(MemoryPlatform::open())
        }
    };

    let settings = ServiceSettings {
        callback_base_url: config.platform.callback_base_url.clone(),
        default_locale: config.locale.default.clone(),
    };
    let service = ReminderService::new(Arc::clone(&store), platform, Arc::new(catalog), settings);
    let dispatcher = Dispatcher::new(
        store,
        Arc::new(service.deliverer()),
        Duration::from_millis(config.dispatcher.interval_ms),
    );

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    let autostart = config.dispatcher.autostart;
    let state = Arc::new(app::AppState::new(config, service, dispatcher));
    if autostart {
        state.dispatcher.start().await;
    }

    let router = app::build_router(Arc::clone(&state));
    info!("remindbot gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.dispatcher.stop().await;
    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("ctrl-c listener failed: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
