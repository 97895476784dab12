use crate::banwave::BanwaveEntry;
use crate::punishment::{Identity, Punishment, PunishmentKind, ScopeId};

/// Fired before a mutating operation; a veto aborts it with no side effects.
#[derive(Clone, Debug)]
pub enum PreEvent {
    Punish {
        kind: PunishmentKind,
        target: Identity,
        staff: String,
        reason: Option<String>,
        scope: Option<ScopeId>,
        global: bool,
    },
    Revoke {
        kind: PunishmentKind,
        target: Identity,
        scope: Option<ScopeId>,
        staff: String,
    },
}

/// Fired after a mutation has been persisted and the caches updated.
#[derive(Clone, Debug)]
pub enum PunishmentEvent {
    Created(Punishment),
    /// An active record was replaced in place by a newer one for the
    /// same (identity, scope) slot.
    Updated {
        previous: Punishment,
        current: Punishment,
    },
    Revoked(Punishment),
    BanwaveStarted {
        pending: usize,
    },
    BanwaveEnded {
        applied: usize,
        failed: usize,
    },
    BanwaveEntryAdded(BanwaveEntry),
    BanwaveEntryRemoved(BanwaveEntry),
}
