//! Filter strings and the predicates built from them.
//!
//! # Responsibility
//! - Parse `key = value, ...` filter strings into ordered pairs.
//! - Resolve pairs against a record type into a conjunctive predicate.
//!
//! # Invariants
//! - Parsing never looks at record types; building never looks at strings
//!   beyond the already-split pairs.
//! - Only equality is expressible.

pub mod builder;
pub mod filter;
