//! Repository layer: SQL row mapping behind a persistence contract.
//!
//! # Responsibility
//! - Isolate SQLite statements from the store's change tracking.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `InvalidData`) in
//!   addition to DB transport errors.

pub mod record_repo;
