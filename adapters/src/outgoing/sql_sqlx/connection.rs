use secrecy::{ExposeSecret, SecretString};
use sqlx::{AnyConnection, Connection};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use tribunal_application::error::{AppError, AppResult};

/// The one shared connection, serialized behind a mutex.
///
/// Not a pool: the subsystem runs in a single authoritative process and
/// the mutex doubles as the single-writer serialization point. Every
/// statement acquires the slot, health-checks it, and releases it via
/// the guard on every exit path.
pub struct GuardedConnection {
    url: SecretString,
    slot: Mutex<Option<AnyConnection>>,
}

impl GuardedConnection {
    pub fn new(url: SecretString) -> Self {
        Self {
            url,
            slot: Mutex::new(None),
        }
    }

    pub async fn connect(&self) -> AppResult<()> {
        sqlx::any::install_default_drivers();
        let mut slot = self.slot.lock().await;
        if slot.is_some() {
            return Ok(());
        }
        *slot = Some(self.open().await?);
        info!("database connection established");
        Ok(())
    }

    pub async fn disconnect(&self) -> AppResult<()> {
        if let Some(connection) = self.slot.lock().await.take() {
            connection
                .close()
                .await
                .map_err(|error| AppError::storage(format!("close failed: {error}")))?;
        }
        Ok(())
    }

    /// Health-checked scoped acquisition. A dead or missing connection
    /// is re-opened first; if that fails the error surfaces and the
    /// caller tears the subsystem down rather than run on a dead link.
    pub async fn acquire(&self) -> AppResult<MutexGuard<'_, Option<AnyConnection>>> {
        let mut slot = self.slot.lock().await;
        let healthy = match slot.as_mut() {
            Some(connection) => connection.ping().await.is_ok(),
            None => false,
        };
        if !healthy {
            warn!("database connection closed or invalid, reconnecting");
            *slot = None;
            *slot = Some(self.open().await?);
        }
        Ok(slot)
    }

    async fn open(&self) -> AppResult<AnyConnection> {
        AnyConnection::connect(self.url.expose_secret())
            .await
            .map_err(|error| AppError::storage(format!("connect failed: {error}")))
    }
}

/// Borrow the live connection out of an acquired guard.
pub fn live<'a>(
    guard: &'a mut MutexGuard<'_, Option<AnyConnection>>,
) -> AppResult<&'a mut AnyConnection> {
    guard
        .as_mut()
        .ok_or_else(|| AppError::storage("no live database connection"))
}
