use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A single typed cell. Booleans and timestamps travel as integers so the
/// shape survives every backend unchanged; callers downcast explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoreValue {
    Bool(bool),
    Int(i64),
    Text(String),
    Null,
}

impl StoreValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn from_datetime(value: OffsetDateTime) -> Self {
        Self::Int(unix_millis(value))
    }

    pub fn from_opt_datetime(value: Option<OffsetDateTime>) -> Self {
        value.map_or(Self::Null, Self::from_datetime)
    }

    pub fn from_opt_text(value: Option<impl Into<String>>) -> Self {
        value.map_or(Self::Null, |text| Self::Text(text.into()))
    }

    pub fn from_opt_int(value: Option<i64>) -> Self {
        value.map_or(Self::Null, Self::Int)
    }

    /// Integer view used for ordering and boolean-as-integer storage.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Bool(value) => Some(i64::from(*value)),
            Self::Text(_) | Self::Null => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            Self::Int(_) | Self::Bool(_) | Self::Null => None,
        }
    }
}

impl fmt::Display for StoreValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
            Self::Null => f.write_str("null"),
        }
    }
}

impl From<String> for StoreValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for StoreValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for StoreValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for StoreValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Conversion out of the storage layer. `None` on a type mismatch; nulls
/// are handled before this is reached.
pub trait FromStoreValue: Sized {
    fn from_store(value: &StoreValue) -> Option<Self>;
}

impl FromStoreValue for String {
    fn from_store(value: &StoreValue) -> Option<Self> {
        value.as_text().map(ToString::to_string)
    }
}

impl FromStoreValue for i64 {
    fn from_store(value: &StoreValue) -> Option<Self> {
        value.as_int()
    }
}

impl FromStoreValue for bool {
    fn from_store(value: &StoreValue) -> Option<Self> {
        value.as_int().map(|v| v != 0)
    }
}

impl FromStoreValue for OffsetDateTime {
    fn from_store(value: &StoreValue) -> Option<Self> {
        value.as_int().map(from_unix_millis)
    }
}

impl FromStoreValue for IpAddr {
    fn from_store(value: &StoreValue) -> Option<Self> {
        value.as_text().and_then(|text| text.parse().ok())
    }
}

pub fn unix_millis(value: OffsetDateTime) -> i64 {
    (value.unix_timestamp_nanos() / 1_000_000) as i64
}

pub fn from_unix_millis(millis: i64) -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH + time::Duration::milliseconds(millis)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl Operator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
        }
    }
}

/// One filter clause. Several conditions combine with AND, applied in
/// declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub position: String,
    pub operator: Operator,
    pub value: StoreValue,
}

impl Condition {
    pub fn new(
        position: impl Into<String>,
        operator: Operator,
        value: impl Into<StoreValue>,
    ) -> Self {
        Self {
            position: position.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn eq(position: impl Into<String>, value: impl Into<StoreValue>) -> Self {
        Self::new(position, Operator::Eq, value)
    }

    pub fn ne(position: impl Into<String>, value: impl Into<StoreValue>) -> Self {
        Self::new(position, Operator::Ne, value)
    }

    pub fn gt(position: impl Into<String>, value: impl Into<StoreValue>) -> Self {
        Self::new(position, Operator::Gt, value)
    }

    pub fn lt(position: impl Into<String>, value: impl Into<StoreValue>) -> Self {
        Self::new(position, Operator::Lt, value)
    }

    pub fn ge(position: impl Into<String>, value: impl Into<StoreValue>) -> Self {
        Self::new(position, Operator::Ge, value)
    }

    pub fn le(position: impl Into<String>, value: impl Into<StoreValue>) -> Self {
        Self::new(position, Operator::Le, value)
    }
}

/// One stored row, keyed by column name. The `id` column is present on
/// rows read back from containers with an auto-assigned key.
pub type Row = BTreeMap<String, StoreValue>;
