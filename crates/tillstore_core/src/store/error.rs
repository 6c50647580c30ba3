use crate::db::DbError;
use crate::model::record::RecordId;
use crate::model::schema::SchemaError;
use crate::query::builder::BuildError;
use crate::query::filter::FilterError;
use crate::repo::record_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Error surfaced by `Store` operations.
///
/// Engine failures arrive unchanged inside `Db`.
#[derive(Debug)]
pub enum StoreError {
    /// Filter string could not be parsed.
    Filter(FilterError),
    /// Filter named an unknown attribute or carried an unusable literal.
    Build(BuildError),
    /// Record type declaration or record values are invalid.
    Schema(SchemaError),
    Db(DbError),
    UnknownRecordType(String),
    /// A record type with this name exists with a different declaration.
    SchemaMismatch { record_type: String },
    /// Record already carries a store-assigned id.
    AlreadyTracked(RecordId),
    /// Record was never inserted.
    NotTracked { record_type: String },
    NotFound(RecordId),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredColumn { table: String, column: String },
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Filter(err) => write!(f, "{err}"),
            Self::Build(err) => write!(f, "{err}"),
            Self::Schema(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::UnknownRecordType(name) => write!(f, "record type `{name}` is not registered"),
            Self::SchemaMismatch { record_type } => write!(
                f,
                "record type `{record_type}` is already registered with a different declaration"
            ),
            Self::AlreadyTracked(id) => write!(f, "record {id} is already pending or persisted"),
            Self::NotTracked { record_type } => {
                write!(f, "`{record_type}` record has not been inserted")
            }
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "store requires catalog version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "table `{table}` is missing column `{column}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted record data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Filter(err) => Some(err),
            Self::Build(err) => Some(err),
            Self::Schema(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FilterError> for StoreError {
    fn from(value: FilterError) -> Self {
        Self::Filter(value)
    }
}

impl From<BuildError> for StoreError {
    fn from(value: BuildError) -> Self {
        Self::Build(value)
    }
}

impl From<SchemaError> for StoreError {
    fn from(value: SchemaError) -> Self {
        Self::Schema(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Db(err) => Self::Db(err),
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            } => Self::UninitializedConnection {
                expected_version,
                actual_version,
            },
            RepoError::MissingRequiredColumn { table, column } => {
                Self::MissingRequiredColumn { table, column }
            }
            RepoError::InvalidData(message) => Self::InvalidData(message),
        }
    }
}
