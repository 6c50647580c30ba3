//! Record repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Map record types to tables and records to rows.
//! - Execute predicates as parameterized `SELECT`s.
//! - Keep the record-type catalog in sync with created tables.
//!
//! # Invariants
//! - Rows are always read in `rowid` order, which is insertion order.
//! - Callers pass rows already conformed by `RecordType::conform`, one value
//!   per attribute in declaration order.
//! - Identifiers are quoted, values are bound; nothing user-supplied is
//!   spliced into SQL text.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::record::{Record, RecordId};
use crate::model::schema::{Attribute, RecordType, CATALOG_TABLE, IDENTITY_COLUMN};
use crate::model::value::Value;
use crate::query::builder::Predicate;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for record persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Update target row does not exist.
    NotFound(RecordId),
    /// Connection catalog is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Existing table lacks a column declared by the record type.
    MissingRequiredColumn { table: String, column: String },
    /// Persisted data cannot be converted back into a record.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "record repository requires catalog version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "table `{table}` is missing column `{column}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted record data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// One row of the record-type catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Name as first registered; lookups are case-insensitive.
    pub name: String,
    pub attributes: Vec<Attribute>,
}

/// Persistence contract used by the store.
pub trait RecordRepository {
    /// Creates the table for `record_type` if missing and checks its columns.
    fn ensure_table(&self, record_type: &RecordType) -> RepoResult<()>;
    /// Returns the catalog row for `name`, matched case-insensitively.
    fn catalog_entry(&self, name: &str) -> RepoResult<Option<CatalogEntry>>;
    /// Records `record_type` in the catalog.
    fn save_catalog_entry(&self, record_type: &RecordType) -> RepoResult<()>;
    fn insert_row(&self, record_type: &RecordType, id: RecordId, row: &[Value]) -> RepoResult<()>;
    fn update_row(&self, record_type: &RecordType, id: RecordId, row: &[Value]) -> RepoResult<()>;
    fn get_record(&self, record_type: &RecordType, id: RecordId) -> RepoResult<Option<Record>>;
    /// Returns every record matching `predicate`, in insertion order.
    fn select_matching(&self, predicate: &Predicate<'_>) -> RepoResult<Vec<Record>>;
}

/// SQLite-backed record repository.
///
/// Works on a plain connection or, through deref, on an open transaction.
pub struct SqliteRecordRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecordRepository<'conn> {
    /// Wraps a connection whose catalog has been migrated by `open_db`.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Wraps a connection already checked by `try_new`.
    pub(crate) fn new_unchecked(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl RecordRepository for SqliteRecordRepository<'_> {
    fn ensure_table(&self, record_type: &RecordType) -> RepoResult<()> {
        let columns = record_type
            .attributes()
            .iter()
            .map(|attribute| format!("\"{}\" {}", attribute.name, attribute.kind.sql_type()))
            .collect::<Vec<_>>()
            .join(",\n    ");
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{table}\" (
    \"{IDENTITY_COLUMN}\" TEXT PRIMARY KEY NOT NULL,
    {columns}
);",
            table = record_type.name()
        ))?;

        let existing = table_columns(self.conn, record_type.name())?;
        let required = std::iter::once(IDENTITY_COLUMN)
            .chain(record_type.attributes().iter().map(|a| a.name.as_str()));
        for column in required {
            if !existing
                .iter()
                .any(|current| current.eq_ignore_ascii_case(column))
            {
                return Err(RepoError::MissingRequiredColumn {
                    table: record_type.name().to_string(),
                    column: column.to_string(),
                });
            }
        }

        Ok(())
    }

    fn catalog_entry(&self, name: &str) -> RepoResult<Option<CatalogEntry>> {
        let raw: Option<(String, String)> = self
            .conn
            .query_row(
                &format!("SELECT name, attributes FROM {CATALOG_TABLE} WHERE name = ?1;"),
                [name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((stored_name, json)) = raw else {
            return Ok(None);
        };
        let attributes = serde_json::from_str(&json).map_err(|err| {
            RepoError::InvalidData(format!(
                "invalid attribute list for `{stored_name}` in {CATALOG_TABLE}: {err}"
            ))
        })?;

        Ok(Some(CatalogEntry {
            name: stored_name,
            attributes,
        }))
    }

    fn save_catalog_entry(&self, record_type: &RecordType) -> RepoResult<()> {
        let attributes = serde_json::to_string(record_type.attributes()).map_err(|err| {
            RepoError::InvalidData(format!(
                "cannot encode attributes of `{}`: {err}",
                record_type.name()
            ))
        })?;
        self.conn.execute(
            &format!("INSERT INTO {CATALOG_TABLE} (name, attributes) VALUES (?1, ?2);"),
            [record_type.name(), attributes.as_str()],
        )?;
        Ok(())
    }

    fn insert_row(&self, record_type: &RecordType, id: RecordId, row: &[Value]) -> RepoResult<()> {
        let placeholders = (1..=row.len() + 1)
            .map(|position| format!("?{position}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({placeholders});",
            record_type.name(),
            column_list(record_type)
        );

        let binds = std::iter::once(SqlValue::Text(id.to_string()))
            .chain(row.iter().map(Value::to_sql_value));
        self.conn.execute(&sql, params_from_iter(binds))?;
        Ok(())
    }

    fn update_row(&self, record_type: &RecordType, id: RecordId, row: &[Value]) -> RepoResult<()> {
        let assignments = record_type
            .attributes()
            .iter()
            .enumerate()
            .map(|(position, attribute)| format!("\"{}\" = ?{}", attribute.name, position + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE \"{}\" SET {assignments} WHERE \"{IDENTITY_COLUMN}\" = ?{};",
            record_type.name(),
            row.len() + 1
        );

        let binds = row
            .iter()
            .map(Value::to_sql_value)
            .chain(std::iter::once(SqlValue::Text(id.to_string())));
        let changed = self.conn.execute(&sql, params_from_iter(binds))?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn get_record(&self, record_type: &RecordType, id: RecordId) -> RepoResult<Option<Record>> {
        let sql = format!(
            "SELECT {} FROM \"{}\" WHERE \"{IDENTITY_COLUMN}\" = ?1;",
            column_list(record_type),
            record_type.name()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_record_row(record_type, row)?));
        }

        Ok(None)
    }

    fn select_matching(&self, predicate: &Predicate<'_>) -> RepoResult<Vec<Record>> {
        let record_type = predicate.record_type();
        let (where_sql, binds) = predicate.to_sql();
        let sql = format!(
            "SELECT {} FROM \"{}\" {where_sql} ORDER BY rowid ASC;",
            column_list(record_type),
            record_type.name()
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record_row(record_type, row)?);
        }

        Ok(records)
    }
}

/// `"id", "attr1", "attr2", ...` in declaration order.
fn column_list(record_type: &RecordType) -> String {
    std::iter::once(IDENTITY_COLUMN)
        .chain(record_type.attributes().iter().map(|a| a.name.as_str()))
        .map(|column| format!("\"{column}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_record_row(record_type: &RecordType, row: &Row<'_>) -> RepoResult<Record> {
    let table = record_type.name();
    let id_text: String = row.get(0)?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in {table}.id"))
    })?;

    let mut values = BTreeMap::new();
    for (position, attribute) in record_type.attributes().iter().enumerate() {
        let raw = row.get_ref(position + 1)?;
        let value = Value::from_sql_ref(raw)
            .and_then(|value| attribute.kind.coerce(value))
            .ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "unexpected {:?} value in {table}.{}",
                    raw.data_type(),
                    attribute.name
                ))
            })?;
        values.insert(attribute.name.clone(), value);
    }

    Ok(Record::from_parts(table, id, values))
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{table}\");"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::{RecordRepository, RepoError, SqliteRecordRepository};
    use crate::db::open_db_in_memory;
    use crate::model::schema::RecordType;
    use crate::model::value::{AttributeKind, Value};
    use crate::query::builder::{build, Predicate};
    use rusqlite::Connection;
    use uuid::Uuid;

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

    fn row(name: &str, price: f64, color: &str) -> Vec<Value> {
        vec![Value::from(name), Value::Real(price), Value::from(color)]
    }

    #[test]
    fn rejects_connection_without_catalog() {
        let conn = Connection::open_in_memory().unwrap();
        let result = SqliteRecordRepository::try_new(&conn);
        assert!(matches!(
            result,
            Err(RepoError::UninitializedConnection {
                actual_version: 0,
                ..
            })
        ));
    }

    #[test]
    fn select_returns_rows_in_insertion_order() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteRecordRepository::try_new(&conn).unwrap();
        let items = item_type();
        repo.ensure_table(&items).unwrap();

        let ids = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        repo.insert_row(&items, ids[0], &row("Pizza-sml", 9.99, "one-topping"))
            .unwrap();
        repo.insert_row(&items, ids[1], &row("Pizza-med", 12.99, "one-topping"))
            .unwrap();
        repo.insert_row(&items, ids[2], &row("Pizza-sml", 12.99, "two-toppings"))
            .unwrap();

        let all = repo.select_matching(&Predicate::match_all(&items)).unwrap();
        let all_ids: Vec<_> = all.iter().filter_map(|record| record.id()).collect();
        assert_eq!(all_ids, ids.to_vec());

        let pairs = vec![("name".to_string(), "Pizza-sml".to_string())];
        let small = repo.select_matching(&build(&items, &pairs).unwrap()).unwrap();
        assert_eq!(small.len(), 2);
        assert_eq!(small[0].id(), Some(ids[0]));
        assert_eq!(small[1].id(), Some(ids[2]));
    }

    #[test]
    fn in_memory_matching_agrees_with_sql_selection() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteRecordRepository::try_new(&conn).unwrap();
        let items = item_type();
        repo.ensure_table(&items).unwrap();

        let rows = [
            row("Pizza-sml", 9.99, "one-topping"),
            row("Pizza-med", 12.0, "one-topping"),
            row("Pizza-sml", 12.99, "two-toppings"),
            vec![Value::from("Pizza-med"), Value::Real(12.99), Value::Null],
        ];
        for values in &rows {
            repo.insert_row(&items, Uuid::new_v4(), values).unwrap();
        }
        let all = repo.select_matching(&Predicate::match_all(&items)).unwrap();
        assert_eq!(all.len(), rows.len());

        let filters: [&[(&str, &str)]; 6] = [
            &[],
            &[("name", "Pizza-sml")],
            &[("price", "12")],
            &[("price", "12.99"), ("name", "Pizza-med")],
            &[("color", "one-topping"), ("name", "Pizza-med")],
            &[("color", "None")],
        ];
        for filter in filters {
            let pairs: Vec<_> = filter
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect();
            let predicate = build(&items, &pairs).unwrap();

            let selected: Vec<_> = repo
                .select_matching(&predicate)
                .unwrap()
                .iter()
                .filter_map(|record| record.id())
                .collect();
            let evaluated: Vec<_> = all
                .iter()
                .filter(|record| predicate.matches(record))
                .filter_map(|record| record.id())
                .collect();
            assert_eq!(selected, evaluated, "filter {filter:?}");
        }
    }

    #[test]
    fn update_row_overwrites_values_and_reports_missing_rows() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteRecordRepository::try_new(&conn).unwrap();
        let items = item_type();
        repo.ensure_table(&items).unwrap();

        let id = Uuid::new_v4();
        repo.insert_row(&items, id, &row("Hat", 5.0, "blue")).unwrap();
        repo.update_row(&items, id, &row("Hat", 6.5, "blue")).unwrap();
        let loaded = repo.get_record(&items, id).unwrap().unwrap();
        assert_eq!(loaded.get("price"), Some(&Value::Real(6.5)));

        let missing = Uuid::new_v4();
        let err = repo
            .update_row(&items, missing, &row("Hat", 1.0, "red"))
            .unwrap_err();
        assert!(matches!(err, RepoError::NotFound(id) if id == missing));
    }

    #[test]
    fn ensure_table_rejects_existing_table_missing_a_column() {
        let conn = open_db_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE items (id TEXT PRIMARY KEY NOT NULL, name TEXT);")
            .unwrap();
        let repo = SqliteRecordRepository::try_new(&conn).unwrap();

        let err = repo.ensure_table(&item_type()).unwrap_err();
        assert!(matches!(
            err,
            RepoError::MissingRequiredColumn { ref column, .. } if column == "price"
        ));
    }

    #[test]
    fn catalog_round_trips_attribute_lists() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteRecordRepository::try_new(&conn).unwrap();
        let items = item_type();

        assert!(repo.catalog_entry("items").unwrap().is_none());
        repo.save_catalog_entry(&items).unwrap();

        let entry = repo.catalog_entry("ITEMS").unwrap().unwrap();
        assert_eq!(entry.name, "items");
        assert_eq!(entry.attributes, items.attributes());
    }
}
