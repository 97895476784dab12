use std::sync::Arc;

use tracing::warn;

use crate::error::{AppError, AppResult};
use crate::ports::outgoing::data_store::DynDataStorePort;
use crate::storage::containers::{ContainerDef, Containers, PLAYER_STAT_COLUMNS, columns};
use crate::storage::model::{Condition, FromStoreValue, Row, StoreValue};

/// Player rows can be addressed by account name or by row id.
#[derive(Debug, Clone)]
pub enum PlayerKey {
    Name(String),
    Id(i64),
}

impl PlayerKey {
    fn conditions(&self) -> Vec<Condition> {
        match self {
            Self::Name(name) => vec![Condition::eq(columns::NAME, name.to_lowercase())],
            Self::Id(id) => vec![Condition::eq(columns::ID, *id)],
        }
    }
}

/// Typed CRUD over the raw [`DataStorePort`]: the storage connector
/// surface the rest of the subsystem talks to.
///
/// [`DataStorePort`]: crate::ports::outgoing::data_store::DataStorePort
#[derive(Clone)]
pub struct DataStore {
    port: DynDataStorePort,
    containers: Arc<Containers>,
}

impl DataStore {
    pub fn new(port: DynDataStorePort, containers: Arc<Containers>) -> Self {
        Self { port, containers }
    }

    pub fn containers(&self) -> &Containers {
        &self.containers
    }

    pub async fn load(&self) -> AppResult<()> {
        self.port.load().await
    }

    pub async fn unload(&self) -> AppResult<()> {
        self.port.unload().await
    }

    /// First matching row's value, decoded. `None` on no match or a
    /// stored null.
    pub async fn select<T: FromStoreValue>(
        &self,
        container: &ContainerDef,
        position: &str,
        conditions: &[Condition],
    ) -> AppResult<Option<T>> {
        match self.port.select_value(container, position, conditions).await? {
            None => Ok(None),
            Some(StoreValue::Null) => Ok(None),
            Some(value) => decode(container, position, &value).map(Some),
        }
    }

    /// Like [`select`](Self::select), but storage-access errors become
    /// the supplied default. Caller-misuse errors still surface.
    pub async fn safe_select<T: FromStoreValue>(
        &self,
        container: &ContainerDef,
        position: &str,
        conditions: &[Condition],
        default: T,
    ) -> AppResult<T> {
        match self.select(container, position, conditions).await {
            Ok(value) => Ok(value.unwrap_or(default)),
            Err(error) if error.is_transient() => {
                warn!(container = container.name, position, %error, "select failed, using default");
                Ok(default)
            }
            Err(error) => Err(error),
        }
    }

    pub async fn count(
        &self,
        container: &ContainerDef,
        conditions: &[Condition],
    ) -> AppResult<u64> {
        self.port.count(container, conditions).await
    }

    pub async fn safe_count(
        &self,
        container: &ContainerDef,
        conditions: &[Condition],
        default: u64,
    ) -> AppResult<u64> {
        match self.count(container, conditions).await {
            Ok(value) => Ok(value),
            Err(error) if error.is_transient() => {
                warn!(container = container.name, %error, "count failed, using default");
                Ok(default)
            }
            Err(error) => Err(error),
        }
    }

    pub async fn insert(&self, container: &ContainerDef, row: &Row) -> AppResult<i64> {
        self.port.insert(container, row).await
    }

    pub async fn update(
        &self,
        container: &ContainerDef,
        assignments: &Row,
        conditions: &[Condition],
    ) -> AppResult<u64> {
        self.port.update(container, assignments, conditions).await
    }

    pub async fn delete(
        &self,
        container: &ContainerDef,
        conditions: &[Condition],
    ) -> AppResult<u64> {
        self.port.delete(container, conditions).await
    }

    /// The position's value from every matching row, nulls skipped.
    /// Never absent, may be empty.
    pub async fn column_values<T: FromStoreValue>(
        &self,
        container: &ContainerDef,
        position: &str,
        conditions: &[Condition],
    ) -> AppResult<Vec<T>> {
        let values = self.port.column_values(container, position, conditions).await?;
        let mut decoded = Vec::with_capacity(values.len());
        for value in &values {
            if value.is_null() {
                continue;
            }
            decoded.push(decode(container, position, value)?);
        }
        Ok(decoded)
    }

    pub async fn rows(
        &self,
        container: &ContainerDef,
        conditions: &[Condition],
    ) -> AppResult<Vec<Row>> {
        self.port.rows(container, conditions).await
    }

    pub async fn row_values(
        &self,
        container: &ContainerDef,
        id: i64,
    ) -> AppResult<Option<Row>> {
        require_key(container)?;
        let mut rows = self
            .port
            .rows(container, &[Condition::eq(columns::ID, id)])
            .await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    pub async fn set_data(
        &self,
        container: &ContainerDef,
        id: i64,
        assignments: &Row,
    ) -> AppResult<u64> {
        require_key(container)?;
        self.port
            .update(container, assignments, &[Condition::eq(columns::ID, id)])
            .await
    }

    pub async fn remove_entry(&self, container: &ContainerDef, id: i64) -> AppResult<u64> {
        require_key(container)?;
        self.port
            .delete(container, &[Condition::eq(columns::ID, id)])
            .await
    }

    pub async fn player_data(&self, key: &PlayerKey) -> AppResult<Option<Row>> {
        let players = &self.containers.players;
        let mut rows = self.port.rows(players, &key.conditions()).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    pub async fn set_player_data(
        &self,
        key: &PlayerKey,
        position: &str,
        value: StoreValue,
    ) -> AppResult<u64> {
        let players = &self.containers.players;
        if players.column(position).is_none() {
            return Err(AppError::invalid_argument(format!(
                "unknown player column: {position}"
            )));
        }
        let mut assignments = Row::new();
        assignments.insert(position.to_string(), value);
        self.port
            .update(players, &assignments, &key.conditions())
            .await
    }

    /// Read-then-write increment of a whitelisted numeric counter.
    /// Returns the new value.
    pub async fn increment_player_stat(
        &self,
        key: &PlayerKey,
        position: &str,
        delta: i64,
    ) -> AppResult<i64> {
        if !PLAYER_STAT_COLUMNS.contains(&position) {
            return Err(AppError::invalid_argument(format!(
                "{position} is not an incrementable stat column"
            )));
        }
        let players = &self.containers.players;
        let conditions = key.conditions();
        let current = self
            .port
            .select_value(players, position, &conditions)
            .await?
            .ok_or_else(|| AppError::invalid_argument(format!("no player row for {key:?}")))?;
        let current = current.as_int().unwrap_or(0);

        let next = current + delta;
        let mut assignments = Row::new();
        assignments.insert(position.to_string(), StoreValue::Int(next));
        self.port.update(players, &assignments, &conditions).await?;
        Ok(next)
    }
}

fn require_key(container: &ContainerDef) -> AppResult<()> {
    if container.has_key() {
        Ok(())
    } else {
        Err(AppError::invalid_argument(format!(
            "container {} is keyless and cannot be addressed by id",
            container.name
        )))
    }
}

fn decode<T: FromStoreValue>(
    container: &ContainerDef,
    position: &str,
    value: &StoreValue,
) -> AppResult<T> {
    T::from_store(value).ok_or_else(|| {
        AppError::storage(format!(
            "unexpected value shape in {}.{position}: {value:?}",
            container.name
        ))
    })
}
