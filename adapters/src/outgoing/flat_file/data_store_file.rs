use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use tribunal_application::error::{AppError, AppResult};
use tribunal_application::ports::outgoing::data_store::DataStorePort;
use tribunal_application::storage::containers::{ContainerDef, Containers, columns};
use tribunal_application::storage::model::{Condition, Operator, Row, StoreValue};

/// Flat-file backend of the storage contract: one JSON document per
/// container in the data directory, loaded into memory on `load()` and
/// rewritten write-through on every mutation.
pub struct FlatFileDataStoreAdapter {
    dir: PathBuf,
    containers: Arc<Containers>,
    tables: RwLock<HashMap<String, FileTable>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FileTable {
    next_id: i64,
    rows: Vec<Row>,
}

impl Default for FileTable {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: Vec::new(),
        }
    }
}

impl FlatFileDataStoreAdapter {
    pub fn new(dir: impl Into<PathBuf>, containers: Arc<Containers>) -> Self {
        Self {
            dir: dir.into(),
            containers,
            tables: RwLock::new(HashMap::new()),
        }
    }

    fn path(&self, container: &ContainerDef) -> PathBuf {
        self.dir.join(format!("{}.json", container.name))
    }

    async fn read_table(path: &Path) -> AppResult<FileTable> {
        match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|error| AppError::storage(format!("corrupt container file: {error}"))),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                Ok(FileTable::default())
            }
            Err(error) => Err(AppError::storage(format!(
                "failed to read {}: {error}",
                path.display()
            ))),
        }
    }

    async fn write_table(&self, container: &ContainerDef, table: &FileTable) -> AppResult<()> {
        let bytes = serde_json::to_vec_pretty(table)?;
        tokio::fs::write(self.path(container), bytes)
            .await
            .map_err(|error| {
                AppError::storage(format!("failed to write {}: {error}", container.name))
            })
    }

    fn check_position(container: &ContainerDef, position: &str) -> AppResult<()> {
        if container.column_kind(position).is_none() {
            return Err(AppError::invalid_argument(format!(
                "unknown position {position} in container {}",
                container.name
            )));
        }
        Ok(())
    }

    fn check_conditions(container: &ContainerDef, conditions: &[Condition]) -> AppResult<()> {
        for condition in conditions {
            Self::check_position(container, &condition.position)?;
        }
        Ok(())
    }
}

fn matches(row: &Row, conditions: &[Condition]) -> bool {
    conditions.iter().all(|condition| {
        let cell = row.get(&condition.position).unwrap_or(&StoreValue::Null);
        compare(cell, condition.operator, &condition.value)
    })
}

/// Same semantics as the relational backend: any comparison against a
/// null, on either side, is false.
fn compare(cell: &StoreValue, operator: Operator, value: &StoreValue) -> bool {
    if cell.is_null() || value.is_null() {
        return false;
    }
    let ordering = match (cell.as_int(), value.as_int()) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => match (cell.as_text(), value.as_text()) {
            (Some(a), Some(b)) => a.cmp(b),
            _ => return false,
        },
    };
    match operator {
        Operator::Eq => ordering == CmpOrdering::Equal,
        Operator::Ne => ordering != CmpOrdering::Equal,
        Operator::Gt => ordering == CmpOrdering::Greater,
        Operator::Lt => ordering == CmpOrdering::Less,
        Operator::Ge => ordering != CmpOrdering::Less,
        Operator::Le => ordering != CmpOrdering::Greater,
    }
}

#[async_trait::async_trait]
impl DataStorePort for FlatFileDataStoreAdapter {
    #[instrument(skip(self))]
    async fn load(&self) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|error| {
            AppError::storage(format!("failed to create data dir: {error}"))
        })?;

        let mut tables = self.tables.write().await;
        for container in self.containers.all() {
            let table = Self::read_table(&self.path(container)).await?;
            tables.insert(container.name.to_string(), table);
        }
        debug!(dir = %self.dir.display(), "flat-file containers ready");
        Ok(())
    }

    async fn unload(&self) -> AppResult<()> {
        self.tables.write().await.clear();
        Ok(())
    }

    async fn select_value(
        &self,
        container: &ContainerDef,
        position: &str,
        conditions: &[Condition],
    ) -> AppResult<Option<StoreValue>> {
        Self::check_position(container, position)?;
        Self::check_conditions(container, conditions)?;

        let tables = self.tables.read().await;
        let table = loaded(&tables, container)?;
        Ok(table
            .rows
            .iter()
            .find(|row| matches(row, conditions))
            .map(|row| row.get(position).cloned().unwrap_or(StoreValue::Null)))
    }

    async fn count(&self, container: &ContainerDef, conditions: &[Condition]) -> AppResult<u64> {
        Self::check_conditions(container, conditions)?;
        let tables = self.tables.read().await;
        let table = loaded(&tables, container)?;
        Ok(table.rows.iter().filter(|row| matches(row, conditions)).count() as u64)
    }

    async fn insert(&self, container: &ContainerDef, row: &Row) -> AppResult<i64> {
        let mut tables = self.tables.write().await;
        let table = loaded_mut(&mut tables, container)?;

        let mut stored = row.clone();
        let id = if container.has_key() {
            let id = table.next_id;
            table.next_id += 1;
            stored.insert(columns::ID.to_string(), StoreValue::Int(id));
            id
        } else {
            0
        };
        table.rows.push(stored);

        let snapshot = loaded(&tables, container)?;
        self.write_table(container, snapshot).await?;
        Ok(id)
    }

    async fn update(
        &self,
        container: &ContainerDef,
        assignments: &Row,
        conditions: &[Condition],
    ) -> AppResult<u64> {
        if assignments.is_empty() {
            return Err(AppError::invalid_argument("update with no assignments"));
        }
        for position in assignments.keys() {
            Self::check_position(container, position)?;
        }
        Self::check_conditions(container, conditions)?;

        let mut tables = self.tables.write().await;
        let table = loaded_mut(&mut tables, container)?;
        let mut affected = 0u64;
        for row in &mut table.rows {
            if matches(row, conditions) {
                for (position, value) in assignments {
                    row.insert(position.clone(), value.clone());
                }
                affected += 1;
            }
        }

        if affected > 0 {
            let snapshot = loaded(&tables, container)?;
            self.write_table(container, snapshot).await?;
        }
        Ok(affected)
    }

    async fn delete(&self, container: &ContainerDef, conditions: &[Condition]) -> AppResult<u64> {
        Self::check_conditions(container, conditions)?;

        let mut tables = self.tables.write().await;
        let table = loaded_mut(&mut tables, container)?;
        let before = table.rows.len();
        table.rows.retain(|row| !matches(row, conditions));
        let affected = (before - table.rows.len()) as u64;

        if affected > 0 {
            let snapshot = loaded(&tables, container)?;
            self.write_table(container, snapshot).await?;
        }
        Ok(affected)
    }

    async fn column_values(
        &self,
        container: &ContainerDef,
        position: &str,
        conditions: &[Condition],
    ) -> AppResult<Vec<StoreValue>> {
        Self::check_position(container, position)?;
        Self::check_conditions(container, conditions)?;

        let tables = self.tables.read().await;
        let table = loaded(&tables, container)?;
        Ok(table
            .rows
            .iter()
            .filter(|row| matches(row, conditions))
            .map(|row| row.get(position).cloned().unwrap_or(StoreValue::Null))
            .collect())
    }

    async fn rows(
        &self,
        container: &ContainerDef,
        conditions: &[Condition],
    ) -> AppResult<Vec<Row>> {
        Self::check_conditions(container, conditions)?;
        let tables = self.tables.read().await;
        let table = loaded(&tables, container)?;
        Ok(table
            .rows
            .iter()
            .filter(|row| matches(row, conditions))
            .cloned()
            .collect())
    }
}

fn loaded<'a>(
    tables: &'a HashMap<String, FileTable>,
    container: &ContainerDef,
) -> AppResult<&'a FileTable> {
    tables.get(container.name).ok_or_else(|| {
        warn!(container = container.name, "container accessed before load");
        AppError::storage(format!("container {} is not loaded", container.name))
    })
}

fn loaded_mut<'a>(
    tables: &'a mut HashMap<String, FileTable>,
    container: &ContainerDef,
) -> AppResult<&'a mut FileTable> {
    tables.get_mut(container.name).ok_or_else(|| {
        warn!(container = container.name, "container accessed before load");
        AppError::storage(format!("container {} is not loaded", container.name))
    })
}
