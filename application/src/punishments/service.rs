use std::net::IpAddr;
use std::sync::{Arc, Weak};
use std::time::Duration as StdDuration;

use dashmap::DashMap;
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

use crate::config::PunishmentSettings;
use crate::error::{AppError, AppResult};
use crate::ports::incoming::punishments::PunishmentsUseCase;
use crate::ports::outgoing::events::DynEventsPort;
use crate::ports::outgoing::localization::DynLocalizationPort;
use crate::ports::outgoing::network_forwarder::DynNetworkForwarderPort;
use crate::ports::outgoing::player_directory::DynPlayerDirectoryPort;
use crate::ports::outgoing::task_runner::DynTaskRunnerPort;
use crate::punishments::rows::{punishment_from_row, punishment_row, revoke_assignments};
use crate::storage::containers::{ContainerDef, columns};
use crate::storage::facade::DataStore;
use crate::storage::model::{Condition, Row, StoreValue};
use domain::events::{PreEvent, PunishmentEvent};
use domain::punishment::{
    BanDetail, Identity, MuteDetail, PunishKey, PunishRequest, Punishment, PunishmentDetail,
    PunishmentId, PunishmentKind, ScopeId,
};

pub struct PunishmentServiceDeps {
    pub store: DataStore,
    pub tasks: DynTaskRunnerPort,
    pub directory: DynPlayerDirectoryPort,
    pub forwarder: DynNetworkForwarderPort,
    pub events: DynEventsPort,
    pub localization: DynLocalizationPort,
}

/// Ban lifecycle manager, also serving the structurally identical mute,
/// warning and kick records.
///
/// Per record the state machine is ACTIVE -> (manually revoked |
/// naturally expired) -> INACTIVE, terminal; re-punishing creates a new
/// record and id. Storage is written before the caches so a failed
/// persistence never leaves a phantom active record.
pub struct PunishmentService {
    store: DataStore,
    tasks: DynTaskRunnerPort,
    directory: DynPlayerDirectoryPort,
    forwarder: DynNetworkForwarderPort,
    events: DynEventsPort,
    localization: DynLocalizationPort,
    settings: PunishmentSettings,
    active_bans: DashMap<PunishKey, Punishment>,
    active_mutes: DashMap<PunishKey, Punishment>,
    self_handle: Weak<PunishmentService>,
}

impl PunishmentService {
    pub fn new(settings: PunishmentSettings, deps: PunishmentServiceDeps) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            store: deps.store,
            tasks: deps.tasks,
            directory: deps.directory,
            forwarder: deps.forwarder,
            events: deps.events,
            localization: deps.localization,
            settings,
            active_bans: DashMap::new(),
            active_mutes: DashMap::new(),
            self_handle: weak.clone(),
        })
    }

    fn container(&self, kind: PunishmentKind) -> ContainerDef {
        let containers = self.store.containers();
        match kind {
            PunishmentKind::Ban => containers.bans.clone(),
            PunishmentKind::Mute => containers.mutes.clone(),
            PunishmentKind::Warning => containers.warnings.clone(),
            PunishmentKind::Kick => containers.kicks.clone(),
        }
    }

    fn cache(&self, kind: PunishmentKind) -> Option<&DashMap<PunishKey, Punishment>> {
        match kind {
            PunishmentKind::Ban => Some(&self.active_bans),
            PunishmentKind::Mute => Some(&self.active_mutes),
            PunishmentKind::Warning | PunishmentKind::Kick => None,
        }
    }

    /// Shared creation path for every punishment kind.
    async fn issue(
        &self,
        kind: PunishmentKind,
        target: Identity,
        ip: Option<IpAddr>,
        request: PunishRequest,
    ) -> AppResult<Punishment> {
        let pre = PreEvent::Punish {
            kind,
            target: target.clone(),
            staff: request.staff.clone(),
            reason: request.reason.clone(),
            scope: request.scope.clone(),
            global: request.global,
        };
        if !self.events.pre(&pre) {
            return Err(AppError::Vetoed);
        }

        if request.global && !self.forwarder.routing_available() {
            return Err(AppError::invalid_state(
                "global punishments need routing context this node does not have",
            ));
        }

        let now = OffsetDateTime::now_utc();
        let detail = match kind {
            PunishmentKind::Ban => PunishmentDetail::Ban(BanDetail {
                ip,
                duration: request.duration,
                unbanned_by: None,
                unban_date: None,
                expiry_task: None,
            }),
            PunishmentKind::Mute => PunishmentDetail::Mute(MuteDetail {
                duration: request.duration,
                unmuted_by: None,
                unmute_date: None,
                expiry_task: None,
            }),
            PunishmentKind::Warning => PunishmentDetail::Warning,
            PunishmentKind::Kick => PunishmentDetail::Kick,
        };
        let mut punishment = Punishment {
            id: PunishmentId::UNSAVED,
            target: target.clone(),
            staff: request.staff,
            reason: request.reason,
            scope: request.scope,
            issued_at: now,
            silent: request.silent,
            global: request.global,
            detail,
        };

        let container = self.container(kind);
        let key = punishment.key();

        // Replace policy: a second punishment for an occupied slot closes
        // the old record and creates a fresh one, never a duplicate.
        let previous = match self.cache(kind) {
            Some(cache) => cache.get(&key).map(|entry| entry.value().clone()),
            None => None,
        };
        if let Some(mut old) = previous.clone() {
            if let Some(task) = old.expiry_task() {
                self.tasks.cancel(task);
            }
            old.revoke(punishment.staff.clone(), now);
            self.store
                .set_data(&container, old.id.as_i64(), &revoke_assignments(&old))
                .await?;
        }

        let id = self.store.insert(&container, &punishment_row(&punishment)).await?;
        punishment.id = PunishmentId(id);

        if let Some(cache) = self.cache(kind) {
            if let Some(duration) = punishment.duration() {
                let delay = StdDuration::try_from(duration).unwrap_or(StdDuration::ZERO);
                let weak = self.self_handle.clone();
                let task_key = key.clone();
                let task = self.tasks.run_later(
                    Box::pin(async move {
                        if let Some(service) = weak.upgrade() {
                            service.expire(kind, PunishmentId(id), task_key).await;
                        }
                    }),
                    delay,
                );
                punishment.set_expiry_task(Some(task));
            }
            cache.insert(key, punishment.clone());
        }

        self.audit(&punishment.staff, &format!("{kind}"), &punishment.target, &punishment.scope)
            .await;

        let event = match previous {
            Some(previous) => PunishmentEvent::Updated {
                previous,
                current: punishment.clone(),
            },
            None => PunishmentEvent::Created(punishment.clone()),
        };
        if punishment.global {
            self.forwarder.forward_punishment(&event);
        }
        self.events.publish(event);

        let disconnect = match kind {
            PunishmentKind::Ban => self.settings.disconnect_on_ban,
            PunishmentKind::Kick => true,
            PunishmentKind::Mute | PunishmentKind::Warning => false,
        };
        if disconnect {
            let scope = punishment.scope_key();
            if let Err(error) = self
                .directory
                .disconnect(&punishment.target, scope.as_ref(), punishment.reason.as_deref())
                .await
            {
                warn!(target = %punishment.target, %error, "post-punishment disconnect failed");
            }
        }

        info!(
            kind = %kind,
            id = %punishment.id,
            target = %punishment.target,
            staff = %punishment.staff,
            global = punishment.global,
            "punishment issued"
        );
        Ok(punishment)
    }

    /// Shared revocation path for bans and mutes. Claims the cache slot
    /// first so concurrent revocations settle on one winner, then
    /// persists; the claim is rolled back if persistence fails.
    async fn revoke_slot(
        &self,
        kind: PunishmentKind,
        target: &Identity,
        scope: Option<ScopeId>,
        who: &str,
    ) -> AppResult<Option<Punishment>> {
        let pre = PreEvent::Revoke {
            kind,
            target: target.clone(),
            scope: scope.clone(),
            staff: who.to_string(),
        };
        if !self.events.pre(&pre) {
            return Err(AppError::Vetoed);
        }

        let cache = match self.cache(kind) {
            Some(cache) => cache,
            None => return Ok(None),
        };
        let key = PunishKey::new(target, scope);
        let Some((_, mut punishment)) = cache.remove(&key) else {
            return Ok(None);
        };

        if let Some(task) = punishment.expiry_task() {
            self.tasks.cancel(task);
        }
        // The expiry task is already cancelled; if persistence fails the
        // rolled-back record relies on the cleanup sweep instead.
        let mut rollback = punishment.clone();
        rollback.set_expiry_task(None);
        punishment.revoke(who, OffsetDateTime::now_utc());

        let container = self.container(kind);
        if let Err(error) = self
            .store
            .set_data(&container, punishment.id.as_i64(), &revoke_assignments(&punishment))
            .await
        {
            cache.entry(key).or_insert(rollback);
            return Err(error);
        }

        self.audit(who, &format!("un{kind}"), &punishment.target, &punishment.scope)
            .await;

        let event = PunishmentEvent::Revoked(punishment.clone());
        if punishment.global {
            self.forwarder.forward_punishment(&event);
        }
        self.events.publish(event);

        info!(kind = %kind, id = %punishment.id, target = %punishment.target, by = who, "punishment revoked");
        Ok(Some(punishment))
    }

    /// Expiration task body. A record revoked after this was scheduled
    /// has already left the cache, which makes the fire a no-op.
    async fn expire(&self, kind: PunishmentKind, id: PunishmentId, key: PunishKey) {
        let Some(cache) = self.cache(kind) else { return };
        let Some((_, mut punishment)) = cache.remove_if(&key, |_, p| p.id == id) else {
            return;
        };

        punishment.revoke(
            self.settings.expiration_actor.clone(),
            OffsetDateTime::now_utc(),
        );
        let container = self.container(kind);
        if let Err(error) = self
            .store
            .set_data(&container, id.as_i64(), &revoke_assignments(&punishment))
            .await
        {
            // The row stays open; the periodic cleanup sweep closes it.
            error!(kind = %kind, id = %id, %error, "failed to persist expiration");
        }
        self.events.publish(PunishmentEvent::Revoked(punishment));
        debug!(kind = %kind, id = %id, "punishment expired");
    }

    /// Reload open records after a restart: close whatever ran out while
    /// the process was down, cache and re-schedule the rest.
    pub async fn restore(&self) -> AppResult<()> {
        for kind in [PunishmentKind::Ban, PunishmentKind::Mute] {
            let container = self.container(kind);
            let rows = self
                .store
                .rows(&container, &[Condition::eq(columns::ACTIVE, true)])
                .await?;
            let now = OffsetDateTime::now_utc();
            let mut restored = 0usize;
            let mut closed = 0usize;

            for row in &rows {
                let mut punishment = match punishment_from_row(kind, row) {
                    Ok(punishment) => punishment,
                    Err(error) => {
                        warn!(container = container.name, %error, "skipping unreadable row");
                        continue;
                    }
                };

                if punishment.is_active(now) {
                    self.schedule_restored(kind, &mut punishment, now);
                    if let Some(cache) = self.cache(kind) {
                        cache.insert(punishment.key(), punishment);
                    }
                    restored += 1;
                } else {
                    punishment.revoke(self.settings.expiration_actor.clone(), now);
                    self.store
                        .set_data(
                            &container,
                            punishment.id.as_i64(),
                            &revoke_assignments(&punishment),
                        )
                        .await?;
                    closed += 1;
                }
            }

            info!(kind = %kind, restored, closed, "restored punishment records");
        }
        Ok(())
    }

    fn schedule_restored(
        &self,
        kind: PunishmentKind,
        punishment: &mut Punishment,
        now: OffsetDateTime,
    ) {
        let Some(duration) = punishment.duration() else { return };
        let remaining = punishment.issued_at + duration - now;
        let delay = StdDuration::try_from(remaining).unwrap_or(StdDuration::ZERO);
        let weak = self.self_handle.clone();
        let id = punishment.id;
        let key = punishment.key();
        let task = self.tasks.run_later(
            Box::pin(async move {
                if let Some(service) = weak.upgrade() {
                    service.expire(kind, id, key).await;
                }
            }),
            delay,
        );
        punishment.set_expiry_task(Some(task));
    }

    /// Periodic sweep: expire cached records whose task never fired
    /// (missed timers, clock jumps).
    pub async fn cleanup_expired(&self) {
        let now = OffsetDateTime::now_utc();
        for kind in [PunishmentKind::Ban, PunishmentKind::Mute] {
            let Some(cache) = self.cache(kind) else { continue };
            let stale: Vec<(PunishmentId, PunishKey)> = cache
                .iter()
                .filter(|entry| !entry.value().is_active(now))
                .map(|entry| (entry.value().id, entry.key().clone()))
                .collect();
            for (id, key) in stale {
                self.expire(kind, id, key).await;
            }
        }
    }

    /// Best-effort append to the keyless audit container.
    async fn audit(
        &self,
        actor: &str,
        action: &str,
        target: &Identity,
        scope: &Option<ScopeId>,
    ) {
        let mut row = Row::new();
        row.insert(columns::ACTOR.to_string(), StoreValue::Text(actor.to_string()));
        row.insert(columns::ACTION.to_string(), StoreValue::Text(action.to_string()));
        row.insert(columns::TARGET.to_string(), StoreValue::Text(target.key_string()));
        row.insert(
            columns::SCOPE.to_string(),
            StoreValue::from_opt_text(scope.as_ref().map(|s| s.as_str().to_string())),
        );
        row.insert(
            columns::DATE.to_string(),
            StoreValue::from_datetime(OffsetDateTime::now_utc()),
        );
        row.insert(columns::DETAIL.to_string(), StoreValue::Null);

        let container = self.store.containers().audit_log.clone();
        if let Err(error) = self.store.insert(&container, &row).await {
            warn!(%error, "audit append failed");
        }
    }

    fn lookup_active(
        &self,
        cache: &DashMap<PunishKey, Punishment>,
        target: &Identity,
        scope: Option<&ScopeId>,
    ) -> Option<Punishment> {
        let now = OffsetDateTime::now_utc();
        let scoped = PunishKey::new(target, scope.cloned());
        if let Some(entry) = cache.get(&scoped) {
            if entry.value().is_active(now) {
                return Some(entry.value().clone());
            }
        }
        if scope.is_some() {
            let network_wide = PunishKey::new(target, None);
            if let Some(entry) = cache.get(&network_wide) {
                if entry.value().is_active(now) {
                    return Some(entry.value().clone());
                }
            }
        }
        None
    }

    async fn history(&self, kind: PunishmentKind, target: &str) -> AppResult<Vec<Punishment>> {
        let container = self.container(kind);
        let rows = self
            .store
            .rows(
                &container,
                &[Condition::eq(columns::TARGET, target.to_lowercase())],
            )
            .await?;
        rows.iter().map(|row| punishment_from_row(kind, row)).collect()
    }

    async fn resolve_required_ip(&self, target: &str) -> AppResult<IpAddr> {
        self.directory
            .last_known_ip(target)
            .await?
            .ok_or_else(|| {
                AppError::invalid_argument(format!("{target} has never connected to the network"))
            })
    }

    async fn resolve_known_ip(&self, target: &str) -> Option<IpAddr> {
        match self.directory.last_known_ip(target).await {
            Ok(ip) => ip,
            Err(error) => {
                warn!(target, %error, "last-known address lookup failed");
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl PunishmentsUseCase for PunishmentService {
    async fn ban(&self, target: &str, request: PunishRequest) -> AppResult<Punishment> {
        let identity = Identity::player(target)?;
        let ip = self.resolve_known_ip(target).await;
        self.issue(PunishmentKind::Ban, identity, ip, request).await
    }

    async fn ban_ip(&self, target: &str, request: PunishRequest) -> AppResult<Punishment> {
        Identity::player(target)?;
        let ip = self.resolve_required_ip(target).await?;
        self.issue(PunishmentKind::Ban, Identity::Address(ip), Some(ip), request)
            .await
    }

    async fn ban_address(
        &self,
        address: IpAddr,
        request: PunishRequest,
    ) -> AppResult<Punishment> {
        self.issue(
            PunishmentKind::Ban,
            Identity::Address(address),
            Some(address),
            request,
        )
        .await
    }

    async fn unban(
        &self,
        target: &Identity,
        scope: Option<ScopeId>,
        who: &str,
    ) -> AppResult<Option<Punishment>> {
        self.revoke_slot(PunishmentKind::Ban, target, scope, who).await
    }

    async fn unban_id(&self, id: PunishmentId, who: &str) -> AppResult<Option<Punishment>> {
        let cached = self
            .active_bans
            .iter()
            .find(|entry| entry.value().id == id)
            .map(|entry| {
                (
                    entry.value().target.clone(),
                    entry.value().scope_key(),
                )
            });
        let Some((target, scope)) = cached else {
            return Ok(None);
        };
        self.revoke_slot(PunishmentKind::Ban, &target, scope, who).await
    }

    fn is_banned(&self, target: &Identity, scope: Option<&ScopeId>) -> bool {
        self.lookup_active(&self.active_bans, target, scope).is_some()
    }

    fn active_ban(&self, target: &Identity, scope: Option<&ScopeId>) -> Option<Punishment> {
        self.lookup_active(&self.active_bans, target, scope)
    }

    fn active_bans(&self) -> Vec<Punishment> {
        let now = OffsetDateTime::now_utc();
        self.active_bans
            .iter()
            .filter(|entry| entry.value().is_active(now))
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn active_bans_for(&self, target: &Identity) -> Vec<Punishment> {
        let wanted = target.key_string();
        self.active_bans()
            .into_iter()
            .filter(|ban| ban.target.key_string() == wanted)
            .collect()
    }

    fn active_bans_in_scope(&self, scope: Option<&ScopeId>) -> Vec<Punishment> {
        self.active_bans()
            .into_iter()
            .filter(|ban| ban.scope_key().as_ref() == scope)
            .collect()
    }

    fn active_ban_by_id(&self, id: PunishmentId) -> Option<Punishment> {
        self.active_bans
            .iter()
            .find(|entry| entry.value().id == id)
            .map(|entry| entry.value().clone())
    }

    async fn ban_by_id(&self, id: PunishmentId) -> Option<Punishment> {
        let container = self.store.containers().bans.clone();
        let rows = match self
            .store
            .rows(&container, &[Condition::eq(columns::ID, id.as_i64())])
            .await
        {
            Ok(rows) => rows,
            Err(error) => {
                warn!(id = %id, %error, "ban lookup failed");
                return None;
            }
        };
        rows.first()
            .and_then(|row| punishment_from_row(PunishmentKind::Ban, row).ok())
    }

    async fn mute(&self, target: &str, request: PunishRequest) -> AppResult<Punishment> {
        let identity = Identity::player(target)?;
        self.issue(PunishmentKind::Mute, identity, None, request).await
    }

    async fn unmute(
        &self,
        target: &Identity,
        scope: Option<ScopeId>,
        who: &str,
    ) -> AppResult<Option<Punishment>> {
        self.revoke_slot(PunishmentKind::Mute, target, scope, who).await
    }

    fn is_muted(&self, target: &Identity, scope: Option<&ScopeId>) -> bool {
        self.lookup_active(&self.active_mutes, target, scope).is_some()
    }

    async fn warn(&self, target: &str, request: PunishRequest) -> AppResult<Punishment> {
        let identity = Identity::player(target)?;
        self.issue(PunishmentKind::Warning, identity, None, request).await
    }

    async fn warnings(&self, target: &str) -> AppResult<Vec<Punishment>> {
        self.history(PunishmentKind::Warning, target).await
    }

    async fn kick(&self, target: &str, request: PunishRequest) -> AppResult<Punishment> {
        let identity = Identity::player(target)?;
        self.issue(PunishmentKind::Kick, identity, None, request).await
    }

    async fn kicks(&self, target: &str) -> AppResult<Vec<Punishment>> {
        self.history(PunishmentKind::Kick, target).await
    }

    fn describe(&self, punishment: &Punishment) -> String {
        let now = OffsetDateTime::now_utc();
        let mut parts = vec![
            format!(
                "{} #{}",
                self.localization.kind_label(punishment.kind()),
                punishment.id
            ),
            punishment.target.to_string(),
            format!("by {}", punishment.staff),
        ];
        if let Some(reason) = &punishment.reason {
            parts.push(format!("({reason})"));
        }
        if punishment.global {
            parts.push(self.localization.global_label());
        } else if let Some(scope) = &punishment.scope {
            parts.push(format!("[{scope}]"));
        }
        if matches!(
            punishment.kind(),
            PunishmentKind::Ban | PunishmentKind::Mute
        ) {
            parts.push(
                self.localization
                    .remaining_label(punishment.remaining_time(now)),
            );
        }
        parts.push(format!(
            "silent: {}",
            self.localization.flag_label(punishment.silent)
        ));
        parts.join(" ")
    }
}
