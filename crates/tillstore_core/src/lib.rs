//! Embedded record persistence over SQLite.
//!
//! Records of registered types are queued, committed or rolled back as a
//! unit, and looked up with `key = value, ...` equality filters.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod store;

pub use config::{AppConfig, ConfigError, LogConfig, StoreConfig, StoreLocation};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::record::{Record, RecordId};
pub use model::schema::{Attribute, RecordType, SchemaError};
pub use model::value::{AttributeKind, Value};
pub use query::builder::{BuildError, Clause, Predicate};
pub use query::filter::{FilterError, FilterSpec};
pub use repo::record_repo::{RecordRepository, RepoError, RepoResult, SqliteRecordRepository};
pub use store::{MultipleResultsWarning, QueryOne, Rollback, Store, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
