mod app;
mod backend;
mod config;
mod domain;
mod format;
mod notification;
mod settings;
mod state;
mod storage;
mod view;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use app::{App, BotControl};
use backend::{BackendSocket, EventSink, Host, LocalHost};
use config::Config;
use state::SessionCache;
use storage::{KeyValueStore, MemoryStorage, SqliteStorage, SqliteStorageConfig};
use tracing::{Level, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_CONFIG_PATH: &str = "configs/arb-desk.yaml";

fn parse_config_path() -> String {
    for arg in env::args().skip(1) {
        if let Some(path) = arg.strip_prefix("--config=") {
            return path.to_string();
        }
    }
    DEFAULT_CONFIG_PATH.to_string()
}

/// Logs go to stderr; stdout belongs to the rendered screen.
fn init_tracing(log_level: Option<&str>) {
    let level = match log_level {
        Some("debug") => Level::DEBUG,
        Some("info") => Level::INFO,
        Some("warn") | Some("warning") => Level::WARN,
        Some("error") => Level::ERROR,
        Some("trace") => Level::TRACE,
        _ => Level::INFO,
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

fn load_config(path: &str) -> Result<Config, config::ConfigError> {
    match Config::load(path) {
        Ok(config) => Ok(config),
        Err(e) if e.is_missing_file() => {
            warn!(config = %path, "config file not found, using defaults");
            Config::from_env()
        }
        Err(e) => Err(e),
    }
}

async fn open_state_cache(path: &str) -> Arc<dyn KeyValueStore> {
    let config = SqliteStorageConfig {
        path: path.to_string(),
        ..SqliteStorageConfig::default()
    };
    match SqliteStorage::new(config).await {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            warn!(path = %path, error = %e, "state cache unavailable, keeping state in memory");
            Arc::new(MemoryStorage::new())
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config_path = parse_config_path();
    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            return;
        }
    };

    init_tracing(config.app.log_level.as_deref());

    let store = open_state_cache(&config.storage.state_db).await;
    let notifier = notification::from_config(&config.notification);

    let (host, logs_rx) = LocalHost::new(&config, notifier.clone());
    let host: Arc<dyn Host> = Arc::new(host);

    let (socket, events_rx) = match BackendSocket::new(&config.backend) {
        Ok(pair) => pair,
        Err(e) => {
            error!(error = %e, "invalid backend configuration");
            return;
        }
    };
    let socket = Arc::new(socket);

    info!(
        name = %config.app.name,
        config = %config_path,
        backend = %socket.url(),
        policy = ?config.app.connectivity_policy,
        "starting"
    );

    let control = BotControl::new(host, SessionCache::new(store.clone()));
    let sink: Arc<dyn EventSink> = socket.clone();
    let mut app = App::new(&config, control, sink, notifier);

    app.init().await;
    let delay = app.launch_backend().await;
    tokio::time::sleep(delay).await;

    let runner = Arc::clone(&socket);
    let socket_task = tokio::spawn(async move { runner.run().await });

    app.run(events_rx, logs_rx).await;

    info!("shutting down");
    socket.close().await;
    match tokio::time::timeout(Duration::from_secs(3), socket_task).await {
        Ok(Err(e)) => warn!(error = %e, "socket task ended abnormally"),
        Err(_) => warn!("socket task did not stop in time"),
        Ok(Ok(())) => {}
    }
    app.shutdown().await;
    if let Err(e) = store.close().await {
        warn!(error = %e, "failed to close state cache");
    }
}
