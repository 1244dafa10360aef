//! D-Bus integration for desktop services

use anyhow::{Context, Result};
use zbus::Connection;

pub mod notifications;

pub use notifications::AlertService;

/// Connect to the session bus
pub async fn session() -> Result<Connection> {
    let conn = Connection::session()
        .await
        .context("Failed to connect to D-Bus session bus")?;
    tracing::info!("Connected to D-Bus session bus");
    Ok(conn)
}
