use crate::error::AppResult;
use domain::banwave::BanwaveEntry;
use domain::punishment::{Identity, PunishRequest, ScopeId};

/// The banwave operation set. `tick` is driven by an external periodic
/// timer; a tick that lands while a wave is running is ignored.
#[async_trait::async_trait]
pub trait BanwaveUseCase: Send + Sync {
    async fn add_entry(&self, target: &str, request: PunishRequest) -> AppResult<BanwaveEntry>;

    /// Queue a ban of the target's last-known address. Invalid-argument
    /// when the target has never connected.
    async fn add_ip_entry(&self, target: &str, request: PunishRequest)
    -> AppResult<BanwaveEntry>;

    /// Remove the pending entry in the (identity, scope) slot. A `None`
    /// scope means the network-wide entry. No-op when absent.
    async fn remove_entry(
        &self,
        target: &Identity,
        scope: Option<ScopeId>,
        who: &str,
    ) -> AppResult<Option<BanwaveEntry>>;

    /// Snapshot of the pending queue in insertion order.
    async fn entries(&self) -> Vec<BanwaveEntry>;

    async fn entries_for(&self, target: &Identity) -> Vec<BanwaveEntry>;

    /// Whether a reason routes into the wave queue: color-stripped and
    /// case-folded, it must start with a configured trigger prefix.
    /// Always false for an absent reason.
    fn is_banwave_reason(&self, reason: Option<&str>) -> bool;

    fn is_running(&self) -> bool;

    async fn tick(&self) -> AppResult<()>;

    /// Reload unconsumed entries from storage after a restart.
    async fn restore(&self) -> AppResult<()>;
}
