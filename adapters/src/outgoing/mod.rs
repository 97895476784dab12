pub mod directory;
pub mod events_broadcast;
pub mod flat_file;
pub mod forwarder;
pub mod localization;
pub mod sql_sqlx;
pub mod tokio_tasks;
