use std::sync::Arc;

use crate::error::AppResult;
use crate::storage::containers::ContainerDef;
use crate::storage::model::{Condition, Row, StoreValue};

/// Raw storage contract implemented by each backend. Untyped: values
/// travel as [`StoreValue`]; the typed surface lives on the
/// [`crate::storage::facade::DataStore`] facade.
///
/// Rows come back in insertion order. Conditions combine with AND.
#[async_trait::async_trait]
pub trait DataStorePort: Send + Sync {
    /// Open the medium and create missing containers. Idempotent.
    async fn load(&self) -> AppResult<()>;

    async fn unload(&self) -> AppResult<()>;

    /// First matching row's value at `position`. `None` when nothing
    /// matches; a matched null cell comes back as `Some(Null)`.
    async fn select_value(
        &self,
        container: &ContainerDef,
        position: &str,
        conditions: &[Condition],
    ) -> AppResult<Option<StoreValue>>;

    async fn count(&self, container: &ContainerDef, conditions: &[Condition]) -> AppResult<u64>;

    /// Returns the assigned row id, or 0 for keyless containers.
    async fn insert(&self, container: &ContainerDef, row: &Row) -> AppResult<i64>;

    /// Returns affected rows.
    async fn update(
        &self,
        container: &ContainerDef,
        assignments: &Row,
        conditions: &[Condition],
    ) -> AppResult<u64>;

    /// Returns affected rows.
    async fn delete(&self, container: &ContainerDef, conditions: &[Condition]) -> AppResult<u64>;

    /// `position`'s value from every matching row; never absent, may be
    /// empty. Null cells come back as [`StoreValue::Null`].
    async fn column_values(
        &self,
        container: &ContainerDef,
        position: &str,
        conditions: &[Condition],
    ) -> AppResult<Vec<StoreValue>>;

    async fn rows(&self, container: &ContainerDef, conditions: &[Condition])
    -> AppResult<Vec<Row>>;
}

pub type DynDataStorePort = Arc<dyn DataStorePort>;
