//! Caller-owned record values.
//!
//! # Invariants
//! - `id` is `None` until the store accepts the record on insert.
//! - Attribute values are checked against the record type by the store, not
//!   by `set`, so records can be assembled before their type is registered.

use crate::model::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Store-assigned record identity.
pub type RecordId = Uuid;

/// One record of a named record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    record_type: String,
    id: Option<RecordId>,
    values: BTreeMap<String, Value>,
}

impl Record {
    /// Creates a transient record with no attribute values.
    pub fn new(record_type: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            id: None,
            values: BTreeMap::new(),
        }
    }

    /// Builder-style `set`.
    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(attribute, value);
        self
    }

    pub fn set(&mut self, attribute: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(attribute.into(), value.into());
    }

    /// Returns the attribute value, `None` when it was never set.
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.values.get(attribute)
    }

    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    pub fn id(&self) -> Option<RecordId> {
        self.id
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Whether the store has accepted this record.
    pub fn is_transient(&self) -> bool {
        self.id.is_none()
    }

    pub(crate) fn assign_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    pub(crate) fn from_parts(
        record_type: impl Into<String>,
        id: RecordId,
        values: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            record_type: record_type.into(),
            id: Some(id),
            values,
        }
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}<", self.record_type)?;
        match self.id {
            Some(id) => write!(f, "{id}")?,
            None => f.write_str("transient")?,
        }
        for (name, value) in &self.values {
            write!(f, ", {name}={value}")?;
        }
        f.write_str(">")
    }
}
