//! Predicate builder.
//!
//! # Responsibility
//! - Resolve filter pairs through a record type's attribute lookup table.
//! - Convert each literal into a value of the attribute's kind.
//! - Combine the resulting equality clauses with AND.
//!
//! # Invariants
//! - A predicate borrows the record type it was built for and cannot be run
//!   against another one.
//! - An empty clause list matches every record of the type.
//! - Literal values are only ever bound as SQL parameters.

use crate::model::record::Record;
use crate::model::schema::{Attribute, RecordType};
use crate::model::value::{AttributeKind, Value};
use rusqlite::types::Value as SqlValue;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    UnknownAttribute {
        record_type: String,
        attribute: String,
    },
    InvalidLiteral {
        attribute: String,
        kind: AttributeKind,
        literal: String,
    },
}

impl Display for BuildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownAttribute {
                record_type,
                attribute,
            } => write!(
                f,
                "unknown attribute `{attribute}` for record type `{record_type}`"
            ),
            Self::InvalidLiteral {
                attribute,
                kind,
                literal,
            } => write!(
                f,
                "literal `{literal}` is not a valid {kind} value for attribute `{attribute}`"
            ),
        }
    }
}

impl Error for BuildError {}

/// One `attribute = value` comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause<'t> {
    pub attribute: &'t Attribute,
    pub value: Value,
}

/// Conjunction of equality clauses over one record type.
#[derive(Debug, Clone)]
pub struct Predicate<'t> {
    record_type: &'t RecordType,
    clauses: Vec<Clause<'t>>,
}

impl<'t> Predicate<'t> {
    /// Predicate matching every record of `record_type`.
    pub fn match_all(record_type: &'t RecordType) -> Self {
        Self {
            record_type,
            clauses: Vec::new(),
        }
    }

    pub fn record_type(&self) -> &'t RecordType {
        self.record_type
    }

    pub fn clauses(&self) -> &[Clause<'t>] {
        &self.clauses
    }

    /// Evaluates the predicate against an in-memory record.
    pub fn matches(&self, record: &Record) -> bool {
        if record.record_type() != self.record_type.name() {
            return false;
        }
        self.clauses.iter().all(|clause| {
            record
                .get(&clause.attribute.name)
                .cloned()
                .and_then(|value| clause.attribute.kind.coerce(value))
                .is_some_and(|value| value == clause.value)
        })
    }

    /// Renders the `WHERE` fragment and its bind values, in clause order.
    pub(crate) fn to_sql(&self) -> (String, Vec<SqlValue>) {
        let mut sql = String::from("WHERE 1 = 1");
        let mut binds = Vec::with_capacity(self.clauses.len());
        for clause in &self.clauses {
            sql.push_str(&format!(" AND \"{}\" = ?", clause.attribute.name));
            binds.push(clause.value.to_sql_value());
        }
        (sql, binds)
    }
}

/// Builds a predicate from parsed filter pairs.
///
/// # Errors
/// - `BuildError::UnknownAttribute` when a name is not declared on the type.
/// - `BuildError::InvalidLiteral` when a literal does not parse as the
///   attribute's kind.
pub fn build<'t>(
    record_type: &'t RecordType,
    pairs: &[(String, String)],
) -> Result<Predicate<'t>, BuildError> {
    let clauses = pairs
        .iter()
        .map(|(name, literal)| -> Result<Clause<'t>, BuildError> {
            let attribute =
                record_type
                    .attribute(name)
                    .ok_or_else(|| BuildError::UnknownAttribute {
                        record_type: record_type.name().to_string(),
                        attribute: name.clone(),
                    })?;
            let value =
                attribute
                    .kind
                    .parse_literal(literal)
                    .ok_or_else(|| BuildError::InvalidLiteral {
                        attribute: attribute.name.clone(),
                        kind: attribute.kind,
                        literal: literal.clone(),
                    })?;
            Ok(Clause { attribute, value })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Predicate {
        record_type,
        clauses,
    })
}
