use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::lock::Mutex;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::banwave::rows::{entry_from_row, entry_row, removal_assignments, resubmit_assignments};
use crate::config::BanwaveSettings;
use crate::error::{AppError, AppResult};
use crate::ports::incoming::banwave::BanwaveUseCase;
use crate::ports::incoming::punishments::PunishmentsUseCase;
use crate::ports::outgoing::events::DynEventsPort;
use crate::ports::outgoing::network_forwarder::DynNetworkForwarderPort;
use crate::ports::outgoing::player_directory::DynPlayerDirectoryPort;
use crate::ports::outgoing::task_runner::DynTaskRunnerPort;
use crate::storage::containers::columns;
use crate::storage::facade::DataStore;
use crate::storage::model::Condition;
use domain::banwave::BanwaveEntry;
use domain::events::PunishmentEvent;
use domain::punishment::{Identity, PunishRequest, ScopeId};

pub struct BanwaveServiceDeps {
    pub store: DataStore,
    pub punishments: Arc<dyn PunishmentsUseCase>,
    pub directory: DynPlayerDirectoryPort,
    pub forwarder: DynNetworkForwarderPort,
    pub events: DynEventsPort,
    pub tasks: DynTaskRunnerPort,
}

#[derive(Debug, Clone)]
struct StoredEntry {
    row_id: i64,
    entry: BanwaveEntry,
}

/// Throttled batch executor for deferred bans.
///
/// Entries queue in insertion order and are mirrored write-through to
/// the banwave container, so an interrupted wave resumes from whatever
/// remains unconsumed after a restart. `tick` runs at most one wave at
/// a time; an in-flight wave always runs to completion.
pub struct BanwaveService {
    store: DataStore,
    punishments: Arc<dyn PunishmentsUseCase>,
    directory: DynPlayerDirectoryPort,
    forwarder: DynNetworkForwarderPort,
    events: DynEventsPort,
    tasks: DynTaskRunnerPort,
    settings: BanwaveSettings,
    entries: Mutex<Vec<StoredEntry>>,
    running: AtomicBool,
}

impl BanwaveService {
    pub fn new(settings: BanwaveSettings, deps: BanwaveServiceDeps) -> Arc<Self> {
        Arc::new(Self {
            store: deps.store,
            punishments: deps.punishments,
            directory: deps.directory,
            forwarder: deps.forwarder,
            events: deps.events,
            tasks: deps.tasks,
            settings,
            entries: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
        })
    }

    async fn queue_entry(&self, entry: BanwaveEntry) -> AppResult<BanwaveEntry> {
        let container = self.store.containers().banwave.clone();
        let key = entry.key();
        let mut queue = self.entries.lock().await;

        if let Some(existing) = queue
            .iter_mut()
            .find(|stored| stored.entry.is_pending() && stored.entry.key() == key)
        {
            existing.entry.update_from(&entry);
            let updated = existing.entry.clone();
            let row_id = existing.row_id;
            drop(queue);

            self.store
                .set_data(&container, row_id, &resubmit_assignments(&updated))
                .await?;
            debug!(target = %updated.target, "banwave entry updated in place");
            self.events
                .publish(PunishmentEvent::BanwaveEntryAdded(updated.clone()));
            return Ok(updated);
        }

        let row_id = self.store.insert(&container, &entry_row(&entry)).await?;
        queue.push(StoredEntry {
            row_id,
            entry: entry.clone(),
        });
        drop(queue);

        debug!(target = %entry.target, "banwave entry queued");
        self.events
            .publish(PunishmentEvent::BanwaveEntryAdded(entry.clone()));
        Ok(entry)
    }

    fn build_entry(
        target: Identity,
        ip: Option<IpAddr>,
        request: PunishRequest,
    ) -> BanwaveEntry {
        BanwaveEntry {
            target,
            ip,
            staff: request.staff,
            reason: request.reason,
            scope: request.scope,
            duration: request.duration,
            global: request.global,
            silent: request.silent,
            created_at: OffsetDateTime::now_utc(),
            removed_at: None,
            removed_by: None,
        }
    }

    async fn apply(&self, entry: &BanwaveEntry) -> AppResult<()> {
        let request = PunishRequest {
            staff: entry.staff.clone(),
            reason: entry.reason.clone(),
            scope: entry.scope.clone(),
            duration: entry.duration,
            global: entry.global,
            silent: entry.silent,
        };
        match &entry.target {
            Identity::Player(name) => self.punishments.ban(name, request).await?,
            Identity::Address(addr) => self.punishments.ban_address(*addr, request).await?,
        };
        Ok(())
    }

    /// Mark an entry consumed in the durable mirror. Failures only cost
    /// us a re-application after a restart, so they are logged and
    /// swallowed.
    async fn persist_removal(&self, stored: &StoredEntry) {
        let container = self.store.containers().banwave.clone();
        if let Err(error) = self
            .store
            .set_data(&container, stored.row_id, &removal_assignments(&stored.entry))
            .await
        {
            warn!(row_id = stored.row_id, %error, "failed to persist banwave entry removal");
        }
    }
}

#[async_trait::async_trait]
impl BanwaveUseCase for BanwaveService {
    async fn add_entry(&self, target: &str, request: PunishRequest) -> AppResult<BanwaveEntry> {
        let identity = Identity::player(target)?;
        let ip = match self.directory.last_known_ip(target).await {
            Ok(ip) => ip,
            Err(error) => {
                warn!(target, %error, "last-known address lookup failed");
                None
            }
        };
        let entry = Self::build_entry(identity, ip, request);
        self.queue_entry(entry).await
    }

    async fn add_ip_entry(
        &self,
        target: &str,
        request: PunishRequest,
    ) -> AppResult<BanwaveEntry> {
        Identity::player(target)?;
        let ip = self.directory.last_known_ip(target).await?.ok_or_else(|| {
            AppError::invalid_argument(format!("{target} has never connected to the network"))
        })?;
        let entry = Self::build_entry(Identity::Address(ip), Some(ip), request);
        self.queue_entry(entry).await
    }

    async fn remove_entry(
        &self,
        target: &Identity,
        scope: Option<ScopeId>,
        who: &str,
    ) -> AppResult<Option<BanwaveEntry>> {
        let key = domain::punishment::PunishKey::new(target, scope);
        let mut queue = self.entries.lock().await;
        let Some(index) = queue
            .iter()
            .position(|stored| stored.entry.key() == key)
        else {
            return Ok(None);
        };
        let mut stored = queue.remove(index);
        drop(queue);

        stored.entry.mark_removed(who, OffsetDateTime::now_utc());
        self.persist_removal(&stored).await;
        self.events
            .publish(PunishmentEvent::BanwaveEntryRemoved(stored.entry.clone()));
        info!(target = %stored.entry.target, by = who, "banwave entry withdrawn");
        Ok(Some(stored.entry))
    }

    async fn entries(&self) -> Vec<BanwaveEntry> {
        self.entries
            .lock()
            .await
            .iter()
            .map(|stored| stored.entry.clone())
            .collect()
    }

    async fn entries_for(&self, target: &Identity) -> Vec<BanwaveEntry> {
        let wanted = target.key_string();
        self.entries
            .lock()
            .await
            .iter()
            .filter(|stored| stored.entry.target.key_string() == wanted)
            .map(|stored| stored.entry.clone())
            .collect()
    }

    fn is_banwave_reason(&self, reason: Option<&str>) -> bool {
        let Some(reason) = reason else { return false };
        let stripped = strip_color_codes(reason).trim().to_lowercase();
        self.settings
            .trigger_prefixes
            .iter()
            .any(|prefix| stripped.starts_with(&prefix.to_lowercase()))
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn tick(&self) -> AppResult<()> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // A wave is in flight; this tick is dropped, not queued.
            return Ok(());
        }

        let pending = self.entries.lock().await.len();
        if pending == 0 {
            self.running.store(false, Ordering::SeqCst);
            return Ok(());
        }

        info!(pending, "banwave starting");
        self.events
            .publish(PunishmentEvent::BanwaveStarted { pending });
        if !self.settings.start_commands.is_empty() {
            self.forwarder.forward_commands(&self.settings.start_commands);
        }

        let mut applied = 0usize;
        let mut failed = 0usize;
        loop {
            let next = {
                let mut queue = self.entries.lock().await;
                if queue.is_empty() {
                    None
                } else {
                    Some(queue.remove(0))
                }
            };
            let Some(mut stored) = next else { break };

            match self.apply(&stored.entry).await {
                Ok(()) => applied += 1,
                Err(error) => {
                    // One bad entry never aborts the rest of the wave.
                    warn!(target = %stored.entry.target, %error, "banwave entry failed, skipping");
                    failed += 1;
                }
            }

            stored
                .entry
                .mark_removed("banwave", OffsetDateTime::now_utc());
            self.persist_removal(&stored).await;
            self.events
                .publish(PunishmentEvent::BanwaveEntryRemoved(stored.entry.clone()));

            let more = !self.entries.lock().await.is_empty();
            if more {
                self.tasks.delay(self.settings.entry_delay).await;
            }
        }

        if !self.settings.end_commands.is_empty() {
            self.forwarder.forward_commands(&self.settings.end_commands);
        }
        self.events
            .publish(PunishmentEvent::BanwaveEnded { applied, failed });
        info!(applied, failed, "banwave finished");
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn restore(&self) -> AppResult<()> {
        let container = self.store.containers().banwave.clone();
        let rows = self
            .store
            .rows(&container, &[Condition::eq(columns::PENDING, true)])
            .await?;

        let mut restored = Vec::with_capacity(rows.len());
        for row in &rows {
            match entry_from_row(row) {
                Ok((row_id, entry)) => restored.push(StoredEntry { row_id, entry }),
                Err(error) => warn!(%error, "skipping unreadable banwave row"),
            }
        }

        let count = restored.len();
        *self.entries.lock().await = restored;
        info!(count, "restored pending banwave entries");
        Ok(())
    }
}

/// Strip `§x`/`&x` color codes before prefix matching.
fn strip_color_codes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if (c == '§' || c == '&')
            && chars
                .peek()
                .is_some_and(|next| next.is_ascii_hexdigit() || matches!(next, 'k'..='o' | 'r' | 'x' | 'K'..='O' | 'R' | 'X'))
        {
            chars.next();
            continue;
        }
        out.push(c);
    }
    out
}
