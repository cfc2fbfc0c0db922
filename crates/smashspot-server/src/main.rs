// Smashspot feed server entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file)
// 2. Load config (copying defaults on first run)
// 3. Open database, optionally seed it from a CSV snapshot directory
// 4. Bind the WebSocket listener and serve until Ctrl+C

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

use smashspot_core::config;
use smashspot_core::db;
use smashspot_core::import;
use smashspot_server::service::FeedService;
use smashspot_server::ws_server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Smashspot starting up");

    // 2. Load config
    let base_dir = std::env::current_dir().context("failed to resolve working directory")?;
    let config = config::load_config(&base_dir).context("failed to load configuration")?;
    info!(
        "Config loaded: port {}, default limit {}, strict props {}",
        config.server_port, config.feed.default_limit, config.eligibility.require_prop
    );

    // 3. Open database, seed if asked
    let db = db::Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);

    if let Some(seed_dir) = std::env::args().nth(1).map(PathBuf::from) {
        let rows = import::import_dir(&db, &seed_dir)
            .with_context(|| format!("failed to import snapshot from {}", seed_dir.display()))?;
        info!("Seeded {rows} rows from {}", seed_dir.display());
    }

    // 4. Serve
    let port = config.server_port;
    let service = Arc::new(FeedService::new(Arc::new(db), Arc::new(config)));
    let listener = ws_server::bind(port)
        .await
        .with_context(|| format!("failed to bind WebSocket server on port {port}"))?;

    tokio::select! {
        result = ws_server::serve(listener, service) => {
            if let Err(e) = result {
                error!("WebSocket server error: {e}");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C");
        }
    }

    info!("Smashspot shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to `logs/smashspot.log`.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("smashspot.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("smashspot_server=info,smashspot_core=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
