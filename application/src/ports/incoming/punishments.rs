use std::net::IpAddr;

use crate::error::AppResult;
use domain::punishment::{Identity, PunishRequest, Punishment, PunishmentId, ScopeId};

/// The ban-manager operation set. Query methods read the in-memory
/// active caches and are cheap; everything async touches storage and
/// must be kept off latency-sensitive paths.
#[async_trait::async_trait]
pub trait PunishmentsUseCase: Send + Sync {
    async fn ban(&self, target: &str, request: PunishRequest) -> AppResult<Punishment>;

    /// Ban the target's last-known address. Invalid-argument when the
    /// target has never connected.
    async fn ban_ip(&self, target: &str, request: PunishRequest) -> AppResult<Punishment>;

    async fn ban_address(&self, address: IpAddr, request: PunishRequest)
    -> AppResult<Punishment>;

    /// Revoke the active ban in the (identity, scope) slot. A `None`
    /// scope always means the network-wide ban, never "any scope".
    /// Returns the closed record, or `None` when nothing matched.
    async fn unban(
        &self,
        target: &Identity,
        scope: Option<ScopeId>,
        who: &str,
    ) -> AppResult<Option<Punishment>>;

    async fn unban_id(&self, id: PunishmentId, who: &str) -> AppResult<Option<Punishment>>;

    /// True when a ban covers the identity in the given scope, either
    /// scoped or network-wide.
    fn is_banned(&self, target: &Identity, scope: Option<&ScopeId>) -> bool;

    fn active_ban(&self, target: &Identity, scope: Option<&ScopeId>) -> Option<Punishment>;

    fn active_bans(&self) -> Vec<Punishment>;

    fn active_bans_for(&self, target: &Identity) -> Vec<Punishment>;

    fn active_bans_in_scope(&self, scope: Option<&ScopeId>) -> Vec<Punishment>;

    fn active_ban_by_id(&self, id: PunishmentId) -> Option<Punishment>;

    /// Read a ban straight from storage, active or not. Storage-access
    /// errors are suppressed into `None`.
    async fn ban_by_id(&self, id: PunishmentId) -> Option<Punishment>;

    async fn mute(&self, target: &str, request: PunishRequest) -> AppResult<Punishment>;

    async fn unmute(
        &self,
        target: &Identity,
        scope: Option<ScopeId>,
        who: &str,
    ) -> AppResult<Option<Punishment>>;

    fn is_muted(&self, target: &Identity, scope: Option<&ScopeId>) -> bool;

    async fn warn(&self, target: &str, request: PunishRequest) -> AppResult<Punishment>;

    async fn warnings(&self, target: &str) -> AppResult<Vec<Punishment>>;

    async fn kick(&self, target: &str, request: PunishRequest) -> AppResult<Punishment>;

    async fn kicks(&self, target: &str) -> AppResult<Vec<Punishment>>;

    /// One-line display form, flags translated through the
    /// localization port.
    fn describe(&self, punishment: &Punishment) -> String;
}
