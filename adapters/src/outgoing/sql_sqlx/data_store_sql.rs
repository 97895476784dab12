use std::sync::Arc;

use secrecy::SecretString;
use sqlx::Row as _;
use sqlx::any::AnyRow;
use tracing::{debug, instrument};

use tribunal_application::error::{AppError, AppResult};
use tribunal_application::ports::outgoing::data_store::DataStorePort;
use tribunal_application::storage::containers::{ColumnKind, ContainerDef, Containers, columns};
use tribunal_application::storage::model::{Condition, Row, StoreValue};

use super::connection::{GuardedConnection, live};
use super::query::{
    SqlDialect, SqlParam, bind_all, create_table_sql, position_kind, where_clause,
};

/// Relational backend of the storage contract over one guarded sqlx
/// connection. Statements are built dynamically against the container
/// registry; tables live under a configurable name prefix.
pub struct SqlDataStoreAdapter {
    connection: GuardedConnection,
    dialect: SqlDialect,
    table_prefix: String,
    containers: Arc<Containers>,
}

impl SqlDataStoreAdapter {
    pub fn new(
        url: SecretString,
        table_prefix: String,
        containers: Arc<Containers>,
    ) -> AppResult<Self> {
        use secrecy::ExposeSecret;
        let dialect = SqlDialect::from_url(url.expose_secret())?;
        Ok(Self {
            connection: GuardedConnection::new(url),
            dialect,
            table_prefix,
            containers,
        })
    }

    fn table(&self, container: &ContainerDef) -> String {
        format!("{}{}", self.table_prefix, container.name)
    }

    /// Select column list: the implicit id first on keyed containers.
    fn read_columns(container: &ContainerDef) -> Vec<(&'static str, ColumnKind)> {
        let mut read = Vec::with_capacity(container.columns.len() + 1);
        if container.has_key() {
            read.push((columns::ID, ColumnKind::Integer));
        }
        for column in &container.columns {
            read.push((column.name, column.kind));
        }
        read
    }

    fn order_suffix(container: &ContainerDef) -> &'static str {
        if container.has_key() { " ORDER BY id" } else { "" }
    }

    fn decode_cell(row: &AnyRow, name: &str, kind: ColumnKind) -> AppResult<StoreValue> {
        let decoded = match kind {
            ColumnKind::Integer => row
                .try_get::<Option<i64>, _>(name)
                .map(|value| value.map_or(StoreValue::Null, StoreValue::Int)),
            ColumnKind::Text => row
                .try_get::<Option<String>, _>(name)
                .map(|value| value.map_or(StoreValue::Null, StoreValue::Text)),
        };
        decoded.map_err(|error| AppError::storage(format!("failed to decode {name}: {error}")))
    }

    fn decode_row(container: &ContainerDef, row: &AnyRow) -> AppResult<Row> {
        let mut decoded = Row::new();
        for (name, kind) in Self::read_columns(container) {
            decoded.insert(name.to_string(), Self::decode_cell(row, name, kind)?);
        }
        Ok(decoded)
    }

    /// Row values in registry column order, typed for binding.
    fn insert_params(container: &ContainerDef, row: &Row) -> Vec<SqlParam> {
        container
            .columns
            .iter()
            .map(|column| SqlParam {
                value: row.get(column.name).cloned().unwrap_or(StoreValue::Null),
                kind: column.kind,
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl DataStorePort for SqlDataStoreAdapter {
    #[instrument(skip(self))]
    async fn load(&self) -> AppResult<()> {
        self.connection.connect().await?;
        let mut guard = self.connection.acquire().await?;
        let connection = live(&mut guard)?;
        for container in self.containers.all() {
            let sql = create_table_sql(self.dialect, &self.table(container), container);
            sqlx::query(&sql)
                .execute(&mut *connection)
                .await
                .map_err(|error| {
                    AppError::storage(format!("failed to create {}: {error}", container.name))
                })?;
        }
        debug!("storage containers ready");
        Ok(())
    }

    async fn unload(&self) -> AppResult<()> {
        self.connection.disconnect().await
    }

    #[instrument(skip(self, conditions))]
    async fn select_value(
        &self,
        container: &ContainerDef,
        position: &str,
        conditions: &[Condition],
    ) -> AppResult<Option<StoreValue>> {
        let kind = position_kind(container, position)?;
        let (clause, params) = where_clause(self.dialect, container, conditions, 1)?;
        let sql = format!(
            "SELECT {position} FROM {}{clause} LIMIT 1",
            self.table(container)
        );

        let mut guard = self.connection.acquire().await?;
        let connection = live(&mut guard)?;
        let row = bind_all(sqlx::query(&sql), &params)
            .fetch_optional(&mut *connection)
            .await
            .map_err(|error| AppError::storage(format!("select failed: {error}")))?;

        match row {
            None => Ok(None),
            Some(row) => Self::decode_cell(&row, position, kind).map(Some),
        }
    }

    #[instrument(skip(self, conditions))]
    async fn count(&self, container: &ContainerDef, conditions: &[Condition]) -> AppResult<u64> {
        let (clause, params) = where_clause(self.dialect, container, conditions, 1)?;
        let sql = format!("SELECT COUNT(*) FROM {}{clause}", self.table(container));

        let mut guard = self.connection.acquire().await?;
        let connection = live(&mut guard)?;
        let row = bind_all(sqlx::query(&sql), &params)
            .fetch_one(&mut *connection)
            .await
            .map_err(|error| AppError::storage(format!("count failed: {error}")))?;
        let count: i64 = row
            .try_get(0)
            .map_err(|error| AppError::storage(format!("failed to decode count: {error}")))?;
        Ok(count as u64)
    }

    #[instrument(skip(self, row))]
    async fn insert(&self, container: &ContainerDef, row: &Row) -> AppResult<i64> {
        let params = Self::insert_params(container, row);
        let names: Vec<&str> = container.columns.iter().map(|c| c.name).collect();
        let placeholders: Vec<String> = (1..=params.len())
            .map(|index| self.dialect.placeholder(index))
            .collect();
        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table(container),
            names.join(", "),
            placeholders.join(", ")
        );

        let mut guard = self.connection.acquire().await?;
        let connection = live(&mut guard)?;

        if container.has_key() && self.dialect.insert_returns_id() {
            sql.push_str(" RETURNING id");
            let row = bind_all(sqlx::query(&sql), &params)
                .fetch_one(&mut *connection)
                .await
                .map_err(|error| AppError::storage(format!("insert failed: {error}")))?;
            let id: i64 = row
                .try_get(0)
                .map_err(|error| AppError::storage(format!("failed to decode id: {error}")))?;
            return Ok(id);
        }

        let result = bind_all(sqlx::query(&sql), &params)
            .execute(&mut *connection)
            .await
            .map_err(|error| AppError::storage(format!("insert failed: {error}")))?;
        if container.has_key() {
            result
                .last_insert_id()
                .ok_or_else(|| AppError::storage("backend reported no insert id"))
        } else {
            Ok(0)
        }
    }

    #[instrument(skip(self, assignments, conditions))]
    async fn update(
        &self,
        container: &ContainerDef,
        assignments: &Row,
        conditions: &[Condition],
    ) -> AppResult<u64> {
        if assignments.is_empty() {
            return Err(AppError::invalid_argument("update with no assignments"));
        }

        let mut sets = Vec::with_capacity(assignments.len());
        let mut params = Vec::with_capacity(assignments.len() + conditions.len());
        for (index, (position, value)) in assignments.iter().enumerate() {
            let kind = position_kind(container, position)?;
            sets.push(format!(
                "{position} = {}",
                self.dialect.placeholder(index + 1)
            ));
            params.push(SqlParam {
                value: value.clone(),
                kind,
            });
        }
        let (clause, where_params) =
            where_clause(self.dialect, container, conditions, params.len() + 1)?;
        params.extend(where_params);

        let sql = format!(
            "UPDATE {} SET {}{clause}",
            self.table(container),
            sets.join(", ")
        );

        let mut guard = self.connection.acquire().await?;
        let connection = live(&mut guard)?;
        let result = bind_all(sqlx::query(&sql), &params)
            .execute(&mut *connection)
            .await
            .map_err(|error| AppError::storage(format!("update failed: {error}")))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self, conditions))]
    async fn delete(&self, container: &ContainerDef, conditions: &[Condition]) -> AppResult<u64> {
        let (clause, params) = where_clause(self.dialect, container, conditions, 1)?;
        let sql = format!("DELETE FROM {}{clause}", self.table(container));

        let mut guard = self.connection.acquire().await?;
        let connection = live(&mut guard)?;
        let result = bind_all(sqlx::query(&sql), &params)
            .execute(&mut *connection)
            .await
            .map_err(|error| AppError::storage(format!("delete failed: {error}")))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self, conditions))]
    async fn column_values(
        &self,
        container: &ContainerDef,
        position: &str,
        conditions: &[Condition],
    ) -> AppResult<Vec<StoreValue>> {
        let kind = position_kind(container, position)?;
        let (clause, params) = where_clause(self.dialect, container, conditions, 1)?;
        let sql = format!(
            "SELECT {position} FROM {}{clause}{}",
            self.table(container),
            Self::order_suffix(container)
        );

        let mut guard = self.connection.acquire().await?;
        let connection = live(&mut guard)?;
        let rows = bind_all(sqlx::query(&sql), &params)
            .fetch_all(&mut *connection)
            .await
            .map_err(|error| AppError::storage(format!("select failed: {error}")))?;

        rows.iter()
            .map(|row| Self::decode_cell(row, position, kind))
            .collect()
    }

    #[instrument(skip(self, conditions))]
    async fn rows(
        &self,
        container: &ContainerDef,
        conditions: &[Condition],
    ) -> AppResult<Vec<Row>> {
        let names: Vec<&str> = Self::read_columns(container)
            .iter()
            .map(|(name, _)| *name)
            .collect();
        let (clause, params) = where_clause(self.dialect, container, conditions, 1)?;
        let sql = format!(
            "SELECT {} FROM {}{clause}{}",
            names.join(", "),
            self.table(container),
            Self::order_suffix(container)
        );

        let mut guard = self.connection.acquire().await?;
        let connection = live(&mut guard)?;
        let rows = bind_all(sqlx::query(&sql), &params)
            .fetch_all(&mut *connection)
            .await
            .map_err(|error| AppError::storage(format!("select failed: {error}")))?;

        rows.iter()
            .map(|row| Self::decode_row(container, row))
            .collect()
    }
}
