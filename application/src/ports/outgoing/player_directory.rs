use std::net::IpAddr;
use std::sync::Arc;

use crate::error::AppResult;
use domain::punishment::{Identity, ScopeId};

/// Resolves identities against the network's session directory.
/// Used for precondition validation and immediate disconnects.
#[async_trait::async_trait]
pub trait PlayerDirectoryPort: Send + Sync {
    async fn last_known_ip(&self, name: &str) -> AppResult<Option<IpAddr>>;

    async fn has_connected(&self, name: &str) -> AppResult<bool>;

    async fn is_online(&self, name: &str) -> AppResult<bool>;

    /// Kick every session matching the identity (one account, or every
    /// account behind an address), optionally restricted to a scope.
    async fn disconnect(
        &self,
        target: &Identity,
        scope: Option<&ScopeId>,
        reason: Option<&str>,
    ) -> AppResult<()>;
}

pub type DynPlayerDirectoryPort = Arc<dyn PlayerDirectoryPort>;
