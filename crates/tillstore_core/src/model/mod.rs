//! Record model shared by the query builder and the store.
//!
//! # Responsibility
//! - Define scalar values and attribute kinds.
//! - Define record-type descriptors with a validated attribute lookup table.
//! - Define the caller-owned `Record` value.
//!
//! # Invariants
//! - Attribute lookup by name goes through `RecordType::attribute`, never
//!   through ad hoc string matching.
//! - Record identity is assigned by the store, never by callers.

pub mod record;
pub mod schema;
pub mod value;
