use sqlx::Any;
use sqlx::any::AnyArguments;
use sqlx::query::Query;

use tribunal_application::error::{AppError, AppResult};
use tribunal_application::storage::containers::{ColumnKind, ContainerDef};
use tribunal_application::storage::model::{Condition, StoreValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    MySql,
    Postgres,
    Sqlite,
}

impl SqlDialect {
    pub fn from_url(url: &str) -> AppResult<Self> {
        if url.starts_with("mysql:") || url.starts_with("mariadb:") {
            Ok(Self::MySql)
        } else if url.starts_with("postgres:") || url.starts_with("postgresql:") {
            Ok(Self::Postgres)
        } else if url.starts_with("sqlite:") {
            Ok(Self::Sqlite)
        } else {
            Err(AppError::ConfigError {
                message: format!("unsupported database url scheme: {url}"),
            })
        }
    }

    /// 1-based statement placeholder.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Self::Postgres => format!("${index}"),
            Self::MySql | Self::Sqlite => "?".to_string(),
        }
    }

    pub fn auto_id_column(&self) -> &'static str {
        match self {
            Self::MySql => "id BIGINT NOT NULL PRIMARY KEY AUTO_INCREMENT",
            Self::Postgres => "id BIGSERIAL PRIMARY KEY",
            Self::Sqlite => "id INTEGER PRIMARY KEY AUTOINCREMENT",
        }
    }

    pub fn column_type(&self, kind: ColumnKind) -> &'static str {
        match kind {
            ColumnKind::Text => "TEXT",
            ColumnKind::Integer => "BIGINT",
        }
    }

    pub fn insert_returns_id(&self) -> bool {
        matches!(self, Self::Postgres)
    }
}

/// An ordered bind parameter with the column kind it must be typed as,
/// so nulls bind with the right wire type on every backend.
#[derive(Debug, Clone)]
pub struct SqlParam {
    pub value: StoreValue,
    pub kind: ColumnKind,
}

pub fn bind_param<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    param: &SqlParam,
) -> Query<'q, Any, AnyArguments<'q>> {
    match &param.value {
        StoreValue::Text(text) => query.bind(text.clone()),
        StoreValue::Int(value) => query.bind(*value),
        StoreValue::Bool(value) => query.bind(i64::from(*value)),
        StoreValue::Null => match param.kind {
            ColumnKind::Text => query.bind(Option::<String>::None),
            ColumnKind::Integer => query.bind(Option::<i64>::None),
        },
    }
}

pub fn bind_all<'q>(
    mut query: Query<'q, Any, AnyArguments<'q>>,
    params: &[SqlParam],
) -> Query<'q, Any, AnyArguments<'q>> {
    for param in params {
        query = bind_param(query, param);
    }
    query
}

/// `WHERE a = ? AND b = ? ...` from conditions in declaration order.
/// Empty when there are no conditions. Unknown positions are caller
/// misuse, not a storage failure.
pub fn where_clause(
    dialect: SqlDialect,
    container: &ContainerDef,
    conditions: &[Condition],
    first_index: usize,
) -> AppResult<(String, Vec<SqlParam>)> {
    if conditions.is_empty() {
        return Ok((String::new(), Vec::new()));
    }

    let mut sql = String::from(" WHERE ");
    let mut params = Vec::with_capacity(conditions.len());
    for (offset, condition) in conditions.iter().enumerate() {
        let kind = position_kind(container, &condition.position)?;
        if offset > 0 {
            sql.push_str(" AND ");
        }
        sql.push_str(&condition.position);
        sql.push(' ');
        sql.push_str(condition.operator.as_sql());
        sql.push(' ');
        sql.push_str(&dialect.placeholder(first_index + offset));
        params.push(SqlParam {
            value: condition.value.clone(),
            kind,
        });
    }
    Ok((sql, params))
}

pub fn position_kind(container: &ContainerDef, position: &str) -> AppResult<ColumnKind> {
    container.column_kind(position).ok_or_else(|| {
        AppError::invalid_argument(format!(
            "unknown position {position} in container {}",
            container.name
        ))
    })
}

pub fn create_table_sql(dialect: SqlDialect, table: &str, container: &ContainerDef) -> String {
    let mut columns = Vec::with_capacity(container.columns.len() + 1);
    if container.has_key() {
        columns.push(dialect.auto_id_column().to_string());
    }
    for column in &container.columns {
        let null = if column.nullable { "" } else { " NOT NULL" };
        columns.push(format!(
            "{} {}{null}",
            column.name,
            dialect.column_type(column.kind)
        ));
    }
    format!("CREATE TABLE IF NOT EXISTS {table} ({})", columns.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tribunal_application::storage::containers::Containers;
    use tribunal_application::storage::model::Operator;

    #[test]
    fn where_clauses_keep_declaration_order() {
        let containers = Containers::new();
        let conditions = vec![
            Condition::eq("target", "alice"),
            Condition::new("date", Operator::Ge, 1_000i64),
            Condition::ne("active", true),
        ];
        let (sql, params) =
            where_clause(SqlDialect::Sqlite, &containers.bans, &conditions, 1).unwrap();
        assert_eq!(sql, " WHERE target = ? AND date >= ? AND active != ?");
        assert_eq!(params.len(), 3);

        let (sql, _) =
            where_clause(SqlDialect::Postgres, &containers.bans, &conditions, 1).unwrap();
        assert_eq!(sql, " WHERE target = $1 AND date >= $2 AND active != $3");
    }

    #[test]
    fn unknown_positions_are_rejected() {
        let containers = Containers::new();
        let conditions = vec![Condition::eq("no_such_column", 1i64)];
        assert!(where_clause(SqlDialect::Sqlite, &containers.bans, &conditions, 1).is_err());
    }

    #[test]
    fn keyed_tables_get_an_auto_id_column() {
        let containers = Containers::new();
        let sql = create_table_sql(SqlDialect::Sqlite, "t_bans", &containers.bans);
        assert!(sql.contains("id INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(sql.contains("target TEXT NOT NULL"));
        assert!(sql.contains("duration BIGINT"));

        let sql = create_table_sql(SqlDialect::Sqlite, "t_audit", &containers.audit_log);
        assert!(!sql.contains("PRIMARY KEY"));
    }
}
