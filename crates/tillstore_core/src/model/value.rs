//! Scalar attribute values and their kinds.

use rusqlite::types::{Value as SqlValue, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Declared kind of a record attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Text,
    Integer,
    Real,
}

impl AttributeKind {
    /// SQLite column type used for this kind.
    pub fn sql_type(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
        }
    }

    /// Converts a filter literal into a value of this kind.
    ///
    /// Text literals are taken verbatim; numeric literals must parse fully.
    pub fn parse_literal(self, literal: &str) -> Option<Value> {
        match self {
            Self::Text => Some(Value::Text(literal.to_string())),
            Self::Integer => literal.parse::<i64>().ok().map(Value::Integer),
            Self::Real => literal
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(Value::Real),
        }
    }

    /// Coerces a value for storage in an attribute of this kind.
    ///
    /// `Null` fits every kind and integers widen to reals. Anything else is
    /// rejected with `None`.
    pub fn coerce(self, value: Value) -> Option<Value> {
        match (self, value) {
            (_, Value::Null) => Some(Value::Null),
            (Self::Text, value @ Value::Text(_)) => Some(value),
            (Self::Integer, value @ Value::Integer(_)) => Some(value),
            (Self::Real, value @ Value::Real(_)) => Some(value),
            (Self::Real, Value::Integer(raw)) => Some(Value::Real(raw as f64)),
            _ => None,
        }
    }
}

impl Display for AttributeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Real => "real",
        };
        f.write_str(name)
    }
}

/// Scalar value held by a record attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(value) => Some(*value),
            Self::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }

    /// Name of the variant, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
        }
    }

    /// Reads a column value. Blobs are not a supported attribute kind.
    pub(crate) fn from_sql_ref(value: ValueRef<'_>) -> Option<Self> {
        match value {
            ValueRef::Null => Some(Self::Null),
            ValueRef::Integer(raw) => Some(Self::Integer(raw)),
            ValueRef::Real(raw) => Some(Self::Real(raw)),
            ValueRef::Text(raw) => std::str::from_utf8(raw)
                .ok()
                .map(|text| Self::Text(text.to_string())),
            ValueRef::Blob(_) => None,
        }
    }

    pub(crate) fn to_sql_value(&self) -> SqlValue {
        match self {
            Self::Null => SqlValue::Null,
            Self::Integer(raw) => SqlValue::Integer(*raw),
            Self::Real(raw) => SqlValue::Real(*raw),
            Self::Text(raw) => SqlValue::Text(raw.clone()),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Real(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value:?}"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
