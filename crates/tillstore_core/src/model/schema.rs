//! Record-type descriptors.
//!
//! # Responsibility
//! - Declare the named, typed attributes of one record type.
//! - Build the name -> attribute lookup table once, at construction.
//! - Validate record values against the declaration.
//!
//! # Invariants
//! - Type and attribute names are SQL-safe identifiers, so they can be
//!   quoted into DDL/DML without escaping.
//! - `id` is reserved for the store-assigned identity column.
//! - Attribute order is declaration order and defines column order.

use crate::model::value::{AttributeKind, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub(crate) const IDENTITY_COLUMN: &str = "id";
pub(crate) const CATALOG_TABLE: &str = "record_types";

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// One declared attribute of a record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
}

/// Errors raised while declaring a record type or validating record values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    InvalidIdentifier(String),
    DuplicateAttribute(String),
    ReservedAttribute(String),
    ReservedRecordType(String),
    NoAttributes(String),
    UnknownAttribute {
        record_type: String,
        attribute: String,
    },
    KindMismatch {
        attribute: String,
        expected: AttributeKind,
        found: &'static str,
    },
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIdentifier(name) => write!(f, "invalid identifier `{name}`"),
            Self::DuplicateAttribute(name) => write!(f, "attribute `{name}` declared twice"),
            Self::ReservedAttribute(name) => {
                write!(f, "attribute name `{name}` is reserved for record identity")
            }
            Self::ReservedRecordType(name) => {
                write!(f, "record type name `{name}` collides with an internal table")
            }
            Self::NoAttributes(record_type) => {
                write!(f, "record type `{record_type}` declares no attributes")
            }
            Self::UnknownAttribute {
                record_type,
                attribute,
            } => write!(
                f,
                "record type `{record_type}` has no attribute `{attribute}`"
            ),
            Self::KindMismatch {
                attribute,
                expected,
                found,
            } => write!(
                f,
                "attribute `{attribute}` expects {expected} value, got {found}"
            ),
        }
    }
}

impl Error for SchemaError {}

/// Descriptor for one record type: its name and declared attributes.
#[derive(Debug, Clone)]
pub struct RecordType {
    name: String,
    attributes: Vec<Attribute>,
    index: HashMap<String, usize>,
}

impl RecordType {
    /// Declares a record type.
    ///
    /// # Errors
    /// - Type or attribute name is not an identifier.
    /// - Type name collides with the catalog or SQLite internal tables.
    /// - An attribute is named `id` or declared twice.
    /// - No attributes are declared.
    pub fn new<'a>(
        name: &str,
        attributes: impl IntoIterator<Item = (&'a str, AttributeKind)>,
    ) -> Result<Self, SchemaError> {
        ensure_identifier(name)?;
        let lowered = name.to_ascii_lowercase();
        if lowered == CATALOG_TABLE || lowered.starts_with("sqlite_") {
            return Err(SchemaError::ReservedRecordType(name.to_string()));
        }

        let mut declared = Vec::new();
        let mut index = HashMap::new();
        for (attribute, kind) in attributes {
            ensure_identifier(attribute)?;
            if attribute.eq_ignore_ascii_case(IDENTITY_COLUMN) {
                return Err(SchemaError::ReservedAttribute(attribute.to_string()));
            }
            // SQLite column names are case-insensitive.
            if declared
                .iter()
                .any(|existing: &Attribute| existing.name.eq_ignore_ascii_case(attribute))
            {
                return Err(SchemaError::DuplicateAttribute(attribute.to_string()));
            }
            index.insert(attribute.to_string(), declared.len());
            declared.push(Attribute {
                name: attribute.to_string(),
                kind,
            });
        }

        if declared.is_empty() {
            return Err(SchemaError::NoAttributes(name.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            attributes: declared,
            index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Resolves an attribute by exact name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.index.get(name).map(|position| &self.attributes[*position])
    }

    /// Checks `values` against the declaration and returns one coerced value
    /// per attribute, in declaration order. Missing attributes become `Null`.
    pub fn conform(&self, values: &BTreeMap<String, Value>) -> Result<Vec<Value>, SchemaError> {
        if let Some(unknown) = values.keys().find(|name| self.attribute(name).is_none()) {
            return Err(SchemaError::UnknownAttribute {
                record_type: self.name.clone(),
                attribute: unknown.clone(),
            });
        }

        self.attributes
            .iter()
            .map(|attribute| {
                let value = values.get(&attribute.name).cloned().unwrap_or_default();
                let found = value.kind_name();
                attribute
                    .kind
                    .coerce(value)
                    .ok_or_else(|| SchemaError::KindMismatch {
                        attribute: attribute.name.clone(),
                        expected: attribute.kind,
                        found,
                    })
            })
            .collect()
    }

    /// Same declaration: same name and same attributes in the same order.
    pub fn same_shape(&self, other: &RecordType) -> bool {
        self.name == other.name && self.attributes == other.attributes
    }
}

fn ensure_identifier(name: &str) -> Result<(), SchemaError> {
    if IDENTIFIER_RE.is_match(name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{RecordType, SchemaError};
    use crate::model::value::{AttributeKind, Value};
    use std::collections::BTreeMap;

    fn item_type() -> RecordType {
        RecordType::new(
            "items",
            [
                ("name", AttributeKind::Text),
                ("price", AttributeKind::Real),
                ("color", AttributeKind::Text),
            ],
        )
        .unwrap()
    }

    #[test]
    fn lookup_table_resolves_declared_attributes_only() {
        let items = item_type();
        assert_eq!(items.attribute("price").unwrap().kind, AttributeKind::Real);
        assert!(items.attribute("size").is_none());
        assert!(items.attribute("Name").is_none());
    }

    #[test]
    fn declaration_rejects_bad_names() {
        let err = RecordType::new("my items", [("name", AttributeKind::Text)]).unwrap_err();
        assert_eq!(err, SchemaError::InvalidIdentifier("my items".to_string()));

        let err = RecordType::new("Record_Types", [("name", AttributeKind::Text)]).unwrap_err();
        assert_eq!(
            err,
            SchemaError::ReservedRecordType("Record_Types".to_string())
        );

        let err = RecordType::new("items", [("ID", AttributeKind::Integer)]).unwrap_err();
        assert_eq!(err, SchemaError::ReservedAttribute("ID".to_string()));

        let err = RecordType::new(
            "items",
            [("name", AttributeKind::Text), ("NAME", AttributeKind::Text)],
        )
        .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateAttribute("NAME".to_string()));

        let err = RecordType::new("items", Vec::<(&str, AttributeKind)>::new()).unwrap_err();
        assert_eq!(err, SchemaError::NoAttributes("items".to_string()));
    }

    #[test]
    fn conform_orders_fills_and_coerces_values() {
        let items = item_type();
        let mut values = BTreeMap::new();
        values.insert("price".to_string(), Value::Integer(10));
        values.insert("name".to_string(), Value::from("Pizza"));

        let row = items.conform(&values).unwrap();
        assert_eq!(
            row,
            vec![Value::from("Pizza"), Value::Real(10.0), Value::Null]
        );
    }

    #[test]
    fn conform_rejects_unknown_attributes_and_kind_mismatches() {
        let items = item_type();

        let mut unknown = BTreeMap::new();
        unknown.insert("size".to_string(), Value::from("lrg"));
        assert!(matches!(
            items.conform(&unknown),
            Err(SchemaError::UnknownAttribute { attribute, .. }) if attribute == "size"
        ));

        let mut mismatch = BTreeMap::new();
        mismatch.insert("price".to_string(), Value::from("cheap"));
        assert!(matches!(
            items.conform(&mismatch),
            Err(SchemaError::KindMismatch { attribute, found: "text", .. }) if attribute == "price"
        ));
    }
}
