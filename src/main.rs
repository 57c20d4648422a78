//! Travel admin server.
//!
//! Usage:
//!   cargo run --bin load_data           # seed an admin and sample records
//!   cargo run --bin travel_admin        # start the REST API (BIND_ADDR, default 0.0.0.0:5000)
//!   cargo run --bin travel-admin-cli -- --help

use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

use travel_admin::catalog::Catalog;
use travel_admin::config::Config;
use travel_admin::logging::{self, LogSettings};
use travel_admin::rest::{app_state, create_router};
use travel_admin::storage::Storage;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    // Keep the guard alive so the file writer flushes on exit.
    let _log_guard = logging::init(&LogSettings::from_env());

    let config = Config::load();
    let storage = Storage::open(&config.data_dir)?;
    let catalog = Catalog::new(storage);
    let state = app_state(catalog, &config);

    match &config.admin {
        Some(seed) => {
            if state.catalog.ensure_admin(&state.auth, seed)? {
                info!(email = %seed.email, "seeded admin account");
            }
        }
        None => warn!("ADMIN_EMAIL/ADMIN_PASSWORD not set, no admin will be seeded"),
    }

    let shutdown_state = state.clone();
    let app = create_router(state, &config.cors_origins);
    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, data_dir = %config.data_dir, "travel admin API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let flushed = shutdown_state.catalog.storage().flush()?;
    info!(bytes = flushed, "storage flushed, server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
