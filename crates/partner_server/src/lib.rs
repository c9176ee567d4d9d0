//! HTTP surface of the partner portal.
//!
//! # Responsibility
//! - Expose core partner/config/screen operations as JSON endpoints.
//! - Serve resolved form layouts and evaluate form submissions.
//! - Own process concerns: CLI config, startup, shutdown, seeding.

pub mod config;
pub mod error;
pub mod routes;
pub mod seed;
pub mod state;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::state::AppState;
use log::{info, warn};
use partner_core::db::open_db;
use partner_form::ApiChecker;

pub use routes::router;

/// Opens the database and serves HTTP until Ctrl-C.
pub async fn serve(config: &ServerConfig) -> Result<(), ServerError> {
    let conn = open_db(&config.database)?;
    let checker = ApiChecker::new(config.api_timeout)?;
    let app = router(AppState::shared(conn, checker));

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!(
        "event=server_start module=server status=ok bind={} database={}",
        listener.local_addr()?,
        config.database.display()
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("event=server_stop module=server status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("event=server_signal module=server status=error error={err}");
    }
}
