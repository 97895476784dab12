#[cfg(any(feature = "adapters", feature = "sqlx", feature = "tokio"))]
compile_error!("application must not depend on adapter/framework crates");

pub mod banwave;
pub mod config;
pub mod error;
pub mod infrastructure_config;
pub mod ports;
pub mod punishments;
pub mod storage;
