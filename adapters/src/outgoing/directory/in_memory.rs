use std::net::IpAddr;

use dashmap::DashMap;
use tracing::info;
use uuid::Uuid;

use domain::punishment::{Identity, ScopeId};
use tribunal_application::error::AppResult;
use tribunal_application::ports::outgoing::player_directory::PlayerDirectoryPort;

#[derive(Debug, Clone)]
pub struct PlayerRecord {
    pub name: String,
    pub uuid: Option<Uuid>,
    pub ip: Option<IpAddr>,
    pub online: bool,
}

/// Session directory fed by the host's join/quit hooks. Keys are
/// case-folded account names.
pub struct InMemoryPlayerDirectory {
    players: DashMap<String, PlayerRecord>,
}

impl InMemoryPlayerDirectory {
    pub fn new() -> Self {
        Self {
            players: DashMap::new(),
        }
    }

    pub fn record_join(&self, name: &str, uuid: Option<Uuid>, ip: Option<IpAddr>) {
        self.players.insert(
            name.to_lowercase(),
            PlayerRecord {
                name: name.to_string(),
                uuid,
                ip,
                online: true,
            },
        );
    }

    pub fn record_quit(&self, name: &str) {
        if let Some(mut record) = self.players.get_mut(&name.to_lowercase()) {
            record.online = false;
        }
    }
}

impl Default for InMemoryPlayerDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PlayerDirectoryPort for InMemoryPlayerDirectory {
    async fn last_known_ip(&self, name: &str) -> AppResult<Option<IpAddr>> {
        Ok(self
            .players
            .get(&name.to_lowercase())
            .and_then(|record| record.ip))
    }

    async fn has_connected(&self, name: &str) -> AppResult<bool> {
        Ok(self.players.contains_key(&name.to_lowercase()))
    }

    async fn is_online(&self, name: &str) -> AppResult<bool> {
        Ok(self
            .players
            .get(&name.to_lowercase())
            .is_some_and(|record| record.online))
    }

    async fn disconnect(
        &self,
        target: &Identity,
        scope: Option<&ScopeId>,
        reason: Option<&str>,
    ) -> AppResult<()> {
        match target {
            Identity::Player(name) => {
                if let Some(mut record) = self.players.get_mut(&name.to_lowercase()) {
                    record.online = false;
                }
            }
            Identity::Address(addr) => {
                for mut record in self.players.iter_mut() {
                    if record.ip == Some(*addr) {
                        record.online = false;
                    }
                }
            }
        }
        info!(
            target = %target,
            scope = scope.map(ScopeId::as_str),
            reason,
            "disconnect requested"
        );
        Ok(())
    }
}
