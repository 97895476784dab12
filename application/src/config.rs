use std::time::Duration;

use crate::infrastructure_config::{BanwaveConfig, PunishmentsConfig};

/// Runtime settings handed to the punishment service.
#[derive(Debug, Clone)]
pub struct PunishmentSettings {
    pub disconnect_on_ban: bool,
    pub expiration_actor: String,
}

impl From<&PunishmentsConfig> for PunishmentSettings {
    fn from(config: &PunishmentsConfig) -> Self {
        Self {
            disconnect_on_ban: config.disconnect_on_ban,
            expiration_actor: config.expiration_actor.clone(),
        }
    }
}

/// Runtime settings handed to the banwave service.
#[derive(Debug, Clone)]
pub struct BanwaveSettings {
    pub entry_delay: Duration,
    pub trigger_prefixes: Vec<String>,
    pub start_commands: Vec<String>,
    pub end_commands: Vec<String>,
}

impl From<&BanwaveConfig> for BanwaveSettings {
    fn from(config: &BanwaveConfig) -> Self {
        Self {
            entry_delay: Duration::from_millis(config.entry_delay_ms),
            trigger_prefixes: config.trigger_prefixes.clone(),
            start_commands: config.start_commands.clone(),
            end_commands: config.end_commands.clone(),
        }
    }
}
