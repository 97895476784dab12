#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tempfile::TempDir;
use tokio::sync::broadcast;

use domain::events::PunishmentEvent;
use domain::punishment::{PunishRequest, ScopeId, duration_from_millis};
use tribunal_adapters::outgoing::directory::in_memory::InMemoryPlayerDirectory;
use tribunal_adapters::outgoing::events_broadcast::tokio_broadcast::TokioBroadcastEventsAdapter;
use tribunal_adapters::outgoing::flat_file::data_store_file::FlatFileDataStoreAdapter;
use tribunal_adapters::outgoing::forwarder::single_node::SingleNodeForwarder;
use tribunal_adapters::outgoing::localization::static_catalog::StaticLocalization;
use tribunal_adapters::outgoing::sql_sqlx::data_store_sql::SqlDataStoreAdapter;
use tribunal_adapters::outgoing::tokio_tasks::TokioTaskRunnerAdapter;
use tribunal_application::banwave::service::{BanwaveService, BanwaveServiceDeps};
use tribunal_application::config::{BanwaveSettings, PunishmentSettings};
use tribunal_application::ports::incoming::punishments::PunishmentsUseCase;
use tribunal_application::ports::outgoing::data_store::DynDataStorePort;
use tribunal_application::ports::outgoing::events::DynEventsPort;
use tribunal_application::ports::outgoing::network_forwarder::DynNetworkForwarderPort;
use tribunal_application::ports::outgoing::player_directory::DynPlayerDirectoryPort;
use tribunal_application::ports::outgoing::task_runner::DynTaskRunnerPort;
use tribunal_application::punishments::service::{PunishmentService, PunishmentServiceDeps};
use tribunal_application::storage::containers::Containers;
use tribunal_application::storage::facade::DataStore;

pub async fn sqlite_store() -> DataStore {
    let containers = Arc::new(Containers::new());
    let adapter = SqlDataStoreAdapter::new(
        SecretString::from("sqlite::memory:"),
        "trib_".to_string(),
        Arc::clone(&containers),
    )
    .expect("sqlite url");
    let store = DataStore::new(Arc::new(adapter) as DynDataStorePort, containers);
    store.load().await.expect("load sqlite store");
    store
}

pub fn file_store_at(dir: &std::path::Path) -> DataStore {
    let containers = Arc::new(Containers::new());
    let adapter = FlatFileDataStoreAdapter::new(dir.to_path_buf(), Arc::clone(&containers));
    DataStore::new(Arc::new(adapter) as DynDataStorePort, containers)
}

pub async fn file_store() -> (DataStore, TempDir) {
    let tmp = tempfile::tempdir().expect("temp dir");
    let store = file_store_at(tmp.path());
    store.load().await.expect("load file store");
    (store, tmp)
}

pub struct Harness {
    pub store: DataStore,
    pub punishments: Arc<PunishmentService>,
    pub banwave: Arc<BanwaveService>,
    pub directory: Arc<InMemoryPlayerDirectory>,
    pub events: Arc<TokioBroadcastEventsAdapter>,
    event_tx: broadcast::Sender<PunishmentEvent>,
}

impl Harness {
    pub fn subscribe(&self) -> broadcast::Receiver<PunishmentEvent> {
        self.event_tx.subscribe()
    }
}

pub fn build_harness(store: DataStore) -> Harness {
    let (event_tx, _) = broadcast::channel(64);
    let events = Arc::new(TokioBroadcastEventsAdapter::new(event_tx.clone()));
    let tasks = Arc::new(TokioTaskRunnerAdapter::new());
    let directory = Arc::new(InMemoryPlayerDirectory::new());
    let forwarder = Arc::new(SingleNodeForwarder::new(true));

    let punishments = PunishmentService::new(
        PunishmentSettings {
            disconnect_on_ban: true,
            expiration_actor: "expiration".to_string(),
        },
        PunishmentServiceDeps {
            store: store.clone(),
            tasks: Arc::clone(&tasks) as DynTaskRunnerPort,
            directory: Arc::clone(&directory) as DynPlayerDirectoryPort,
            forwarder: Arc::clone(&forwarder) as DynNetworkForwarderPort,
            events: Arc::clone(&events) as DynEventsPort,
            localization: Arc::new(StaticLocalization),
        },
    );

    let banwave = BanwaveService::new(
        BanwaveSettings {
            entry_delay: Duration::from_millis(1),
            trigger_prefixes: vec!["banwave".to_string()],
            start_commands: Vec::new(),
            end_commands: Vec::new(),
        },
        BanwaveServiceDeps {
            store: store.clone(),
            punishments: Arc::clone(&punishments) as Arc<dyn PunishmentsUseCase>,
            directory: Arc::clone(&directory) as DynPlayerDirectoryPort,
            forwarder: Arc::clone(&forwarder) as DynNetworkForwarderPort,
            events: Arc::clone(&events) as DynEventsPort,
            tasks: Arc::clone(&tasks) as DynTaskRunnerPort,
        },
    );

    Harness {
        store,
        punishments,
        banwave,
        directory,
        events,
        event_tx,
    }
}

pub async fn file_harness() -> (Harness, TempDir) {
    let (store, tmp) = file_store().await;
    (build_harness(store), tmp)
}

pub fn request(
    staff: &str,
    reason: Option<&str>,
    scope: Option<&str>,
    duration_ms: i64,
    global: bool,
    silent: bool,
) -> PunishRequest {
    PunishRequest {
        staff: staff.to_string(),
        reason: reason.map(ToString::to_string),
        scope: scope.map(ScopeId::from),
        duration: duration_from_millis(duration_ms),
        global,
        silent,
    }
}
