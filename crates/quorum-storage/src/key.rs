//! Record keys and key ranges

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::StorageError;
use crate::Result;

/// Primary key or indexed value. Integers sort before strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Int(i64),
    Text(String),
}

impl Key {
    /// Read a key from a JSON value. Only integers and strings are valid keys.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(Key::Text(s.clone())),
            Value::Number(n) => n.as_i64().map(Key::Int).ok_or_else(|| {
                StorageError::InvalidRecord(format!("key {n} is not an integer"))
            }),
            other => Err(StorageError::InvalidRecord(format!(
                "key must be an integer or a string, got {other}"
            ))),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Key::Int(i) => Value::from(*i),
            Key::Text(s) => Value::from(s.as_str()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Key::Text(s) => Some(s),
            Key::Int(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Key::Int(i) => Some(*i),
            Key::Text(_) => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{i}"),
            Key::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Int(value.into())
    }
}

impl From<u32> for Key {
    fn from(value: u32) -> Self {
        Key::Int(value.into())
    }
}

impl From<bool> for Key {
    fn from(value: bool) -> Self {
        // Matches what json_extract yields for JSON booleans.
        Key::Int(value as i64)
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Text(value)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Text(value.to_string())
    }
}

impl From<&String> for Key {
    fn from(value: &String) -> Self {
        Key::Text(value.clone())
    }
}

impl From<&Key> for Key {
    fn from(value: &Key) -> Self {
        value.clone()
    }
}

impl ToSql for Key {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Key::Int(i) => Ok(ToSqlOutput::from(*i)),
            Key::Text(s) => Ok(ToSqlOutput::from(s.as_str())),
        }
    }
}

impl FromSql for Key {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Integer(i) => Ok(Key::Int(i)),
            ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                .map(|s| Key::Text(s.to_string()))
                .map_err(|e| FromSqlError::Other(Box::new(e))),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub key: Key,
    pub open: bool,
}

/// A range over keys or indexed values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRange {
    Only(Key),
    Between {
        lower: Option<Bound>,
        upper: Option<Bound>,
    },
}

impl KeyRange {
    pub fn only(key: impl Into<Key>) -> Self {
        KeyRange::Only(key.into())
    }

    pub fn lower_bound(key: impl Into<Key>, open: bool) -> Self {
        KeyRange::Between {
            lower: Some(Bound {
                key: key.into(),
                open,
            }),
            upper: None,
        }
    }

    pub fn upper_bound(key: impl Into<Key>, open: bool) -> Self {
        KeyRange::Between {
            lower: None,
            upper: Some(Bound {
                key: key.into(),
                open,
            }),
        }
    }

    pub fn bound(
        lower: impl Into<Key>,
        upper: impl Into<Key>,
        lower_open: bool,
        upper_open: bool,
    ) -> Self {
        KeyRange::Between {
            lower: Some(Bound {
                key: lower.into(),
                open: lower_open,
            }),
            upper: Some(Bound {
                key: upper.into(),
                open: upper_open,
            }),
        }
    }

    /// SQL condition over `expr` plus the values to bind, numbered from `first_param`.
    pub(crate) fn to_sql_filter(&self, expr: &str, first_param: usize) -> (String, Vec<Key>) {
        match self {
            KeyRange::Only(key) => (format!("{expr} = ?{first_param}"), vec![key.clone()]),
            KeyRange::Between { lower, upper } => {
                let mut clauses = Vec::new();
                let mut params = Vec::new();
                // A typed range never crosses between integers and strings.
                if let Some(key) = lower.as_ref().or(upper.as_ref()).map(|b| &b.key) {
                    let type_name = match key {
                        Key::Int(_) => "integer",
                        Key::Text(_) => "text",
                    };
                    clauses.push(format!("typeof({expr}) = '{type_name}'"));
                }
                if let Some(b) = lower {
                    let op = if b.open { ">" } else { ">=" };
                    clauses.push(format!("{expr} {op} ?{}", first_param + params.len()));
                    params.push(b.key.clone());
                }
                if let Some(b) = upper {
                    let op = if b.open { "<" } else { "<=" };
                    clauses.push(format!("{expr} {op} ?{}", first_param + params.len()));
                    params.push(b.key.clone());
                }
                if clauses.is_empty() {
                    (format!("{expr} IS NOT NULL"), params)
                } else {
                    (clauses.join(" AND "), params)
                }
            }
        }
    }
}
