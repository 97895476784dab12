use std::net::IpAddr;

use time::{Duration, OffsetDateTime};

use crate::punishment::{Identity, PunishKey, ScopeId};

/// A deferred ban request, queued until the next wave consumes it.
///
/// At most one pending entry exists per (identity, scope) slot;
/// resubmitting for the same slot updates the entry in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanwaveEntry {
    pub target: Identity,
    /// Last-known address for account entries, the address itself for
    /// address entries.
    pub ip: Option<IpAddr>,
    pub staff: String,
    pub reason: Option<String>,
    pub scope: Option<ScopeId>,
    pub duration: Option<Duration>,
    pub global: bool,
    pub silent: bool,
    pub created_at: OffsetDateTime,
    pub removed_at: Option<OffsetDateTime>,
    pub removed_by: Option<String>,
}

impl BanwaveEntry {
    pub fn scope_key(&self) -> Option<ScopeId> {
        if self.global { None } else { self.scope.clone() }
    }

    pub fn key(&self) -> PunishKey {
        PunishKey::new(&self.target, self.scope_key())
    }

    pub fn is_pending(&self) -> bool {
        self.removed_at.is_none()
    }

    pub fn mark_removed(&mut self, by: impl Into<String>, at: OffsetDateTime) {
        if self.removed_at.is_none() {
            self.removed_at = Some(at);
            self.removed_by = Some(by.into());
        }
    }

    /// Carry the later submission's values into this slot, keeping the
    /// original queue position and creation date.
    pub fn update_from(&mut self, other: &BanwaveEntry) {
        self.ip = other.ip;
        self.staff = other.staff.clone();
        self.reason = other.reason.clone();
        self.duration = other.duration;
        self.silent = other.silent;
    }
}
