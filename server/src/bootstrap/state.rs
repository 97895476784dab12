use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{info, warn};

use domain::events::PunishmentEvent;
use domain::task::TaskId;
use tribunal_adapters::outgoing::{
    directory::in_memory::InMemoryPlayerDirectory,
    events_broadcast::tokio_broadcast::TokioBroadcastEventsAdapter,
    flat_file::data_store_file::FlatFileDataStoreAdapter,
    forwarder::single_node::SingleNodeForwarder,
    localization::static_catalog::StaticLocalization,
    sql_sqlx::data_store_sql::SqlDataStoreAdapter,
    tokio_tasks::TokioTaskRunnerAdapter,
};
use tribunal_application::banwave::service::{BanwaveService, BanwaveServiceDeps};
use tribunal_application::config::{BanwaveSettings, PunishmentSettings};
use tribunal_application::error::AppError;
use tribunal_application::infrastructure_config::{Config, StorageBackend};
use tribunal_application::ports::incoming::banwave::BanwaveUseCase;
use tribunal_application::ports::incoming::punishments::PunishmentsUseCase;
use tribunal_application::ports::outgoing::data_store::DynDataStorePort;
use tribunal_application::ports::outgoing::events::DynEventsPort;
use tribunal_application::ports::outgoing::network_forwarder::DynNetworkForwarderPort;
use tribunal_application::ports::outgoing::player_directory::DynPlayerDirectoryPort;
use tribunal_application::ports::outgoing::task_runner::{
    DynTaskRunnerPort, TaskFuture, TaskRunnerPort,
};
use tribunal_application::punishments::service::{PunishmentService, PunishmentServiceDeps};
use tribunal_application::storage::containers::Containers;
use tribunal_application::storage::facade::DataStore;

/// Application-scoped context: one live instance of every manager,
/// constructed here and torn down through [`AppState::shutdown`].
pub struct AppState {
    pub config: Arc<Config>,
    pub store: DataStore,
    pub punishments: Arc<PunishmentService>,
    pub banwave: Arc<BanwaveService>,
    pub directory: Arc<InMemoryPlayerDirectory>,
    pub events: Arc<TokioBroadcastEventsAdapter>,
    event_tx: broadcast::Sender<PunishmentEvent>,
    tasks: Arc<TokioTaskRunnerAdapter>,
    timers: Vec<TaskId>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self, AppError> {
        let config = Arc::new(config);
        let containers = Arc::new(Containers::new());

        let port: DynDataStorePort = match config.storage.backend {
            StorageBackend::Sql => Arc::new(SqlDataStoreAdapter::new(
                config.storage.database_url.clone(),
                config.storage.table_prefix.clone(),
                Arc::clone(&containers),
            )?),
            StorageBackend::File => Arc::new(FlatFileDataStoreAdapter::new(
                config.storage.data_dir.clone(),
                Arc::clone(&containers),
            )),
        };
        let store = DataStore::new(port, containers);
        store.load().await?;

        let (event_tx, _) = broadcast::channel(256);
        let events = Arc::new(TokioBroadcastEventsAdapter::new(event_tx.clone()));
        let tasks = Arc::new(TokioTaskRunnerAdapter::new());
        let directory = Arc::new(InMemoryPlayerDirectory::new());
        let forwarder = Arc::new(SingleNodeForwarder::new(true));

        let punishments = PunishmentService::new(
            PunishmentSettings::from(&config.punishments),
            PunishmentServiceDeps {
                store: store.clone(),
                tasks: Arc::clone(&tasks) as DynTaskRunnerPort,
                directory: Arc::clone(&directory) as DynPlayerDirectoryPort,
                forwarder: Arc::clone(&forwarder) as DynNetworkForwarderPort,
                events: Arc::clone(&events) as DynEventsPort,
                localization: Arc::new(StaticLocalization),
            },
        );
        punishments.restore().await?;

        let banwave = BanwaveService::new(
            BanwaveSettings::from(&config.banwave),
            BanwaveServiceDeps {
                store: store.clone(),
                punishments: Arc::clone(&punishments) as Arc<dyn PunishmentsUseCase>,
                directory: Arc::clone(&directory) as DynPlayerDirectoryPort,
                forwarder: Arc::clone(&forwarder) as DynNetworkForwarderPort,
                events: Arc::clone(&events) as DynEventsPort,
                tasks: Arc::clone(&tasks) as DynTaskRunnerPort,
            },
        );
        banwave.restore().await?;

        let mut timers = Vec::new();
        if config.banwave.enabled {
            let banwave_for_timer = Arc::clone(&banwave);
            timers.push(tasks.run_repeating(
                Arc::new(move || {
                    let banwave = Arc::clone(&banwave_for_timer);
                    Box::pin(async move {
                        if let Err(error) = banwave.tick().await {
                            warn!(%error, "banwave tick failed");
                        }
                    }) as TaskFuture
                }),
                Duration::from_secs(config.banwave.period_secs),
            ));
        }

        let punishments_for_timer = Arc::clone(&punishments);
        timers.push(tasks.run_repeating(
            Arc::new(move || {
                let punishments = Arc::clone(&punishments_for_timer);
                Box::pin(async move {
                    punishments.cleanup_expired().await;
                }) as TaskFuture
            }),
            Duration::from_secs(config.storage.cleanup_interval_secs),
        ));

        info!(
            backend = ?config.storage.backend,
            banwave_enabled = config.banwave.enabled,
            "punishment subsystem ready"
        );

        Ok(Self {
            config,
            store,
            punishments,
            banwave,
            directory,
            events,
            event_tx,
            tasks,
            timers,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PunishmentEvent> {
        self.event_tx.subscribe()
    }

    pub async fn shutdown(&self) -> Result<(), AppError> {
        for timer in &self.timers {
            self.tasks.cancel(*timer);
        }
        // An in-flight wave keeps running; only the storage handle is
        // torn down once it has nothing left to write.
        if self.banwave.is_running() {
            warn!("shutting down while a banwave is in flight");
        }
        self.store.unload().await
    }
}
