//! Ghostline server binary.
//!
//! Wires one storage backend, the session store, the persona policy, and
//! the reply scheduler into the axum API, then serves until Ctrl+C.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use ghostline_server::api::{self, AppState};
use ghostline_server::auth::SessionStore;
use ghostline_server::config::ServerConfig;
use ghostline_server::persona::{Persona, RandomPersona};
use ghostline_server::rate_limit::RateLimiter;
use ghostline_server::responder::Responder;
use ghostline_store::{Database, MemStore, Storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,ghostline_server=debug")),
        )
        .init();

    info!("Starting Ghostline server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------
    let store: Arc<dyn Storage> = match &config.store_path {
        Some(path) => {
            info!(path = %path.display(), "using SQLite store");
            Arc::new(Database::open_at(path)?)
        }
        None => {
            info!("using in-memory store (state is lost on restart)");
            Arc::new(MemStore::new())
        }
    };

    let persona: Arc<dyn Persona> = Arc::new(RandomPersona);
    let responder = Arc::new(Responder::new(Arc::clone(&store), Arc::clone(&persona)));
    let limiter = RateLimiter::new(config.rate_limit);
    let sessions = SessionStore::new();

    let app_state = AppState {
        store,
        sessions,
        persona,
        responder: Arc::clone(&responder),
        limiter: limiter.clone(),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic rate limiter cleanup (every 5 minutes, evict windows idle >10 min)
    let rl = limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rl.purge_idle(std::time::Duration::from_secs(600)).await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    // Drain pending simulated replies before the store is dropped.
    responder.shutdown().await;

    Ok(())
}
