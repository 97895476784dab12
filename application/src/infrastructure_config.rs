use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub punishments: PunishmentsConfig,
    pub banwave: BanwaveConfig,
    pub logging: LoggingConfig,
    pub environment: EnvironmentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StorageBackend {
    #[serde(rename = "sql")]
    Sql,
    #[serde(rename = "file")]
    File,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_url: SecretString,
    pub data_dir: String,
    pub table_prefix: String,
    pub cleanup_interval_secs: u64,
}

impl Serialize for StorageConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("StorageConfig", 5)?;
        state.serialize_field("backend", &self.backend)?;
        state.serialize_field("database_url", "[REDACTED]")?;
        state.serialize_field("data_dir", &self.data_dir)?;
        state.serialize_field("table_prefix", &self.table_prefix)?;
        state.serialize_field("cleanup_interval_secs", &self.cleanup_interval_secs)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for StorageConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct StorageConfigHelper {
            backend: StorageBackend,
            database_url: String,
            data_dir: String,
            table_prefix: String,
            cleanup_interval_secs: u64,
        }

        let helper = StorageConfigHelper::deserialize(deserializer)?;
        Ok(StorageConfig {
            backend: helper.backend,
            database_url: SecretString::from(helper.database_url),
            data_dir: helper.data_dir,
            table_prefix: helper.table_prefix,
            cleanup_interval_secs: helper.cleanup_interval_secs,
        })
    }
}

impl StorageConfig {
    #[must_use]
    pub fn redacted_url(&self) -> String {
        let url_str = self.database_url.expose_secret();
        match url::Url::parse(url_str) {
            Ok(mut url) => {
                if url.password().is_some() {
                    url.set_password(Some("***")).ok();
                }
                url.to_string()
            }
            Err(_) => "[INVALID_URL]".to_string(),
        }
    }

    #[must_use]
    pub fn database_url(&self) -> &str {
        self.database_url.expose_secret()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PunishmentsConfig {
    /// Disconnect banned players from the network as soon as the ban lands.
    pub disconnect_on_ban: bool,
    /// Staff name recorded when an expiration task closes a record.
    pub expiration_actor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanwaveConfig {
    pub enabled: bool,
    pub period_secs: u64,
    pub entry_delay_ms: u64,
    /// Reason prefixes that route a ban request into the wave queue,
    /// matched case-insensitively after color codes are stripped.
    pub trigger_prefixes: Vec<String>,
    pub start_commands: Vec<String>,
    pub end_commands: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub include_location: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LogFormat {
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "pretty")]
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub env: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                backend: StorageBackend::File,
                database_url: SecretString::from("sqlite://tribunal.db"),
                data_dir: "data".to_string(),
                table_prefix: "tribunal_".to_string(),
                cleanup_interval_secs: 300,
            },
            punishments: PunishmentsConfig {
                disconnect_on_ban: true,
                expiration_actor: "expiration".to_string(),
            },
            banwave: BanwaveConfig {
                enabled: true,
                period_secs: 600,
                entry_delay_ms: 1000,
                trigger_prefixes: vec!["banwave".to_string()],
                start_commands: Vec::new(),
                end_commands: Vec::new(),
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: LogFormat::Pretty,
                include_location: false,
            },
            environment: EnvironmentConfig {
                env: "development".to_string(),
            },
        }
    }
}

impl Config {
    pub fn validate(&self) -> AppResult<()> {
        if self.storage.database_url.expose_secret().is_empty() {
            return Err(AppError::ConfigError {
                message: "database_url cannot be empty".to_string(),
            });
        }

        if self.storage.data_dir.trim().is_empty() {
            return Err(AppError::ConfigError {
                message: "data_dir cannot be empty".to_string(),
            });
        }

        if self.storage.cleanup_interval_secs == 0 {
            return Err(AppError::ConfigError {
                message: "cleanup_interval_secs must be greater than 0".to_string(),
            });
        }

        if self.punishments.expiration_actor.trim().is_empty() {
            return Err(AppError::ConfigError {
                message: "expiration_actor cannot be empty".to_string(),
            });
        }

        if self.banwave.enabled {
            if self.banwave.period_secs == 0 {
                return Err(AppError::ConfigError {
                    message: "banwave period_secs must be greater than 0 when enabled"
                        .to_string(),
                });
            }

            if self.banwave.trigger_prefixes.iter().any(|p| p.trim().is_empty()) {
                return Err(AppError::ConfigError {
                    message: "banwave trigger_prefixes cannot contain empty entries"
                        .to_string(),
                });
            }
        }

        Ok(())
    }
}
