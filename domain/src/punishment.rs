use std::fmt;
use std::net::IpAddr;

use time::{Duration, OffsetDateTime};

use crate::error::{DomainError, DomainResult};
use crate::task::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PunishmentId(pub i64);

impl PunishmentId {
    /// Placeholder id for records that have not been persisted yet.
    pub const UNSAVED: PunishmentId = PunishmentId(0);

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for PunishmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Origin server of a punishment. Punishments with no scope are network-wide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeId(String);

impl ScopeId {
    pub fn new(name: impl Into<String>) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::InvalidScope(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScopeId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for ScopeId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Who a punishment applies to: an account, or a raw network address.
///
/// Exactly one identity kind governs a ban's type; account bans may still
/// carry the target's last-known address for display and evasion lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    Player(String),
    Address(IpAddr),
}

impl Identity {
    pub fn player(name: impl Into<String>) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::InvalidIdentity(name));
        }
        Ok(Self::Player(name))
    }

    /// Case-folded form used for cache keys and lookups.
    pub fn key_string(&self) -> String {
        match self {
            Self::Player(name) => name.to_lowercase(),
            Self::Address(ip) => ip.to_string(),
        }
    }

    pub fn is_address(&self) -> bool {
        matches!(self, Self::Address(_))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player(name) => f.write_str(name),
            Self::Address(ip) => write!(f, "{ip}"),
        }
    }
}

/// Cache key: at most one active punishment of a kind may exist per key.
/// A `None` scope is the network-wide slot, never a wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PunishKey {
    pub identity: String,
    pub scope: Option<ScopeId>,
}

impl PunishKey {
    pub fn new(identity: &Identity, scope: Option<ScopeId>) -> Self {
        Self {
            identity: identity.key_string(),
            scope,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PunishmentKind {
    Ban,
    Mute,
    Warning,
    Kick,
}

impl PunishmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ban => "ban",
            Self::Mute => "mute",
            Self::Warning => "warning",
            Self::Kick => "kick",
        }
    }
}

impl fmt::Display for PunishmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanDetail {
    /// Last-known address for account bans, the banned address for IP bans.
    pub ip: Option<IpAddr>,
    /// `None` means permanent.
    pub duration: Option<Duration>,
    pub unbanned_by: Option<String>,
    pub unban_date: Option<OffsetDateTime>,
    /// Pending expiration task, if the ban is temporary and still active.
    pub expiry_task: Option<TaskId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuteDetail {
    pub duration: Option<Duration>,
    pub unmuted_by: Option<String>,
    pub unmute_date: Option<OffsetDateTime>,
    pub expiry_task: Option<TaskId>,
}

/// Type-specific payload. Warnings and kicks are plain log records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PunishmentDetail {
    Ban(BanDetail),
    Mute(MuteDetail),
    Warning,
    Kick,
}

/// Derived activity state of a punishment. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemainingTime {
    /// Manually revoked, or the duration ran out.
    Elapsed,
    /// Permanent and never revoked.
    Permanent,
    Left(Duration),
}

impl RemainingTime {
    /// Wire/display form: 0 elapsed, -1 permanent, else milliseconds left.
    pub fn as_millis(&self) -> i64 {
        match self {
            Self::Elapsed => 0,
            Self::Permanent => -1,
            Self::Left(left) => left.whole_milliseconds() as i64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Punishment {
    pub id: PunishmentId,
    pub target: Identity,
    pub staff: String,
    pub reason: Option<String>,
    /// Origin server. `None` when issued from the network level.
    pub scope: Option<ScopeId>,
    pub issued_at: OffsetDateTime,
    pub silent: bool,
    pub global: bool,
    pub detail: PunishmentDetail,
}

impl Punishment {
    pub fn kind(&self) -> PunishmentKind {
        match self.detail {
            PunishmentDetail::Ban(_) => PunishmentKind::Ban,
            PunishmentDetail::Mute(_) => PunishmentKind::Mute,
            PunishmentDetail::Warning => PunishmentKind::Warning,
            PunishmentDetail::Kick => PunishmentKind::Kick,
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        match &self.detail {
            PunishmentDetail::Ban(ban) => ban.duration,
            PunishmentDetail::Mute(mute) => mute.duration,
            PunishmentDetail::Warning | PunishmentDetail::Kick => None,
        }
    }

    pub fn revoked_by(&self) -> Option<&str> {
        match &self.detail {
            PunishmentDetail::Ban(ban) => ban.unbanned_by.as_deref(),
            PunishmentDetail::Mute(mute) => mute.unmuted_by.as_deref(),
            PunishmentDetail::Warning | PunishmentDetail::Kick => None,
        }
    }

    pub fn revoke_date(&self) -> Option<OffsetDateTime> {
        match &self.detail {
            PunishmentDetail::Ban(ban) => ban.unban_date,
            PunishmentDetail::Mute(mute) => mute.unmute_date,
            PunishmentDetail::Warning | PunishmentDetail::Kick => None,
        }
    }

    pub fn expiry_task(&self) -> Option<TaskId> {
        match &self.detail {
            PunishmentDetail::Ban(ban) => ban.expiry_task,
            PunishmentDetail::Mute(mute) => mute.expiry_task,
            PunishmentDetail::Warning | PunishmentDetail::Kick => None,
        }
    }

    pub fn set_expiry_task(&mut self, task: Option<TaskId>) {
        match &mut self.detail {
            PunishmentDetail::Ban(ban) => ban.expiry_task = task,
            PunishmentDetail::Mute(mute) => mute.expiry_task = task,
            PunishmentDetail::Warning | PunishmentDetail::Kick => {}
        }
    }

    /// Remaining time of a ban or mute.
    ///
    /// Elapsed once revoked or once `issued_at + duration` has passed;
    /// permanent records stay `Permanent` until revoked. Warnings and
    /// kicks are instantaneous and always report `Elapsed`.
    pub fn remaining_time(&self, now: OffsetDateTime) -> RemainingTime {
        match self.kind() {
            PunishmentKind::Warning | PunishmentKind::Kick => return RemainingTime::Elapsed,
            PunishmentKind::Ban | PunishmentKind::Mute => {}
        }
        if self.revoked_by().is_some() {
            return RemainingTime::Elapsed;
        }
        match self.duration() {
            None => RemainingTime::Permanent,
            Some(duration) => {
                let left = self.issued_at + duration - now;
                if left <= Duration::ZERO {
                    RemainingTime::Elapsed
                } else {
                    RemainingTime::Left(left)
                }
            }
        }
    }

    pub fn is_active(&self, now: OffsetDateTime) -> bool {
        self.remaining_time(now) != RemainingTime::Elapsed
    }

    /// Scope slot this record occupies: the network-wide slot when global,
    /// otherwise the origin server's slot.
    pub fn scope_key(&self) -> Option<ScopeId> {
        if self.global { None } else { self.scope.clone() }
    }

    pub fn key(&self) -> PunishKey {
        PunishKey::new(&self.target, self.scope_key())
    }

    /// Close the record out. Idempotent on an already revoked record.
    pub fn revoke(&mut self, by: impl Into<String>, at: OffsetDateTime) {
        match &mut self.detail {
            PunishmentDetail::Ban(ban) => {
                if ban.unbanned_by.is_none() {
                    ban.unbanned_by = Some(by.into());
                    ban.unban_date = Some(at);
                }
                ban.expiry_task = None;
            }
            PunishmentDetail::Mute(mute) => {
                if mute.unmuted_by.is_none() {
                    mute.unmuted_by = Some(by.into());
                    mute.unmute_date = Some(at);
                }
                mute.expiry_task = None;
            }
            PunishmentDetail::Warning | PunishmentDetail::Kick => {}
        }
    }
}

/// What a caller asks for when issuing a punishment. The target travels
/// separately so one shape serves every kind and both identity forms.
#[derive(Debug, Clone)]
pub struct PunishRequest {
    pub staff: String,
    pub reason: Option<String>,
    pub scope: Option<ScopeId>,
    /// `None` means permanent. Ignored for warnings and kicks.
    pub duration: Option<Duration>,
    pub global: bool,
    pub silent: bool,
}

/// Command layers pass raw millisecond durations; non-positive values
/// mean permanent.
pub fn duration_from_millis(millis: i64) -> Option<Duration> {
    if millis <= 0 {
        None
    } else {
        Some(Duration::milliseconds(millis))
    }
}
