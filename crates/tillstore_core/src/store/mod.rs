//! The store: one connection, its record types, and its pending changes.
//!
//! # Responsibility
//! - Own the single SQLite connection for its whole lifetime.
//! - Track inserted and modified records until `commit` or `rollback`.
//! - Resolve filter-string lookups to zero, one, or first-of-many records.
//!
//! # Invariants
//! - Reads only ever see committed rows; pending changes live in memory.
//! - `commit` writes every pending change in one transaction and clears the
//!   pending sets only when that transaction commits.
//! - `rollback` clears both pending sets and never touches the database.
//! - Every mutation goes through `&mut self`; share the handle by reference
//!   or behind the caller's own lock.

mod changes;
mod error;
mod outcome;

pub use error::{StoreError, StoreResult};
pub use outcome::{MultipleResultsWarning, QueryOne, Rollback};

use crate::config::StoreConfig;
use crate::db::open_db;
use crate::model::record::{Record, RecordId};
use crate::model::schema::RecordType;
use crate::query::builder::{build, Predicate};
use crate::query::filter::parse;
use crate::repo::record_repo::{RecordRepository, SqliteRecordRepository};
use changes::{ChangeSet, PendingDirty, PendingNew};
use log::{debug, error, info, warn};
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::time::Instant;
use uuid::Uuid;

/// Persistence handle for records of registered types.
///
/// Open one per database with `Store::open` and pass it to every caller that
/// needs it; all of them then observe the same pending changes.
pub struct Store {
    conn: Connection,
    types: BTreeMap<String, RecordType>,
    changes: ChangeSet,
}

impl Store {
    /// Opens the database described by `config`.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let conn = open_db(config)?;
        SqliteRecordRepository::try_new(&conn)?;
        Ok(Self {
            conn,
            types: BTreeMap::new(),
            changes: ChangeSet::default(),
        })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::open(&StoreConfig::in_memory())
    }

    /// Closes the connection.
    ///
    /// Pending changes are discarded, not committed.
    pub fn close(self) -> StoreResult<()> {
        if !self.changes.is_empty() {
            warn!(
                "event=store_close module=store status=discarding_pending new={} dirty={}",
                self.changes.new_entries().len(),
                self.changes.dirty_entries().len()
            );
        }

        self.conn.close().map_err(|(_, err)| {
            error!("event=store_close module=store status=error error={err}");
            StoreError::from(err)
        })?;
        info!("event=store_close module=store status=ok");
        Ok(())
    }

    /// Registers a record type, creating its table when missing.
    ///
    /// Registering the same declaration twice is a no-op.
    ///
    /// # Errors
    /// - `SchemaMismatch` when the name is already registered, in this store
    ///   or in the database catalog, with a different declaration.
    /// - `MissingRequiredColumn` when a pre-existing table lacks a column.
    pub fn register(&mut self, record_type: RecordType) -> StoreResult<()> {
        if let Some(existing) = self.types.get(record_type.name()) {
            if existing.same_shape(&record_type) {
                return Ok(());
            }
            return Err(StoreError::SchemaMismatch {
                record_type: record_type.name().to_string(),
            });
        }

        let started_at = Instant::now();
        let tx = self.conn.transaction()?;
        {
            let repo = SqliteRecordRepository::new_unchecked(&tx);
            match repo.catalog_entry(record_type.name())? {
                Some(entry)
                    if entry.name == record_type.name()
                        && entry.attributes == record_type.attributes() =>
                {
                    repo.ensure_table(&record_type)?;
                }
                Some(_) => {
                    return Err(StoreError::SchemaMismatch {
                        record_type: record_type.name().to_string(),
                    });
                }
                None => {
                    repo.ensure_table(&record_type)?;
                    repo.save_catalog_entry(&record_type)?;
                }
            }
        }
        tx.commit()?;

        info!(
            "event=store_register module=store status=ok record_type={} attributes={} duration_ms={}",
            record_type.name(),
            record_type.attributes().len(),
            started_at.elapsed().as_millis()
        );
        self.types.insert(record_type.name().to_string(), record_type);
        Ok(())
    }

    pub fn record_type(&self, name: &str) -> Option<&RecordType> {
        self.types.get(name)
    }

    pub fn record_types(&self) -> impl Iterator<Item = &RecordType> {
        self.types.values()
    }

    /// Queues `record` for insert and writes its id back into it.
    ///
    /// A record keeps the id it was given even when a rollback discards its
    /// insert; inserting it again reuses that id. With `commit`, every pending
    /// change is committed right away.
    ///
    /// # Errors
    /// - `AlreadyTracked` when the id is pending or already persisted.
    /// - `UnknownRecordType` / `Schema` when the values do not fit the type.
    pub fn insert(&mut self, record: &mut Record, commit: bool) -> StoreResult<RecordId> {
        let record_type = lookup(&self.types, record.record_type())?;
        let row = record_type.conform(record.values())?;
        let id = match record.id() {
            Some(id) => {
                let persisted = SqliteRecordRepository::new_unchecked(&self.conn)
                    .get_record(record_type, id)?
                    .is_some();
                if persisted || self.changes.contains(id) {
                    return Err(StoreError::AlreadyTracked(id));
                }
                id
            }
            None => {
                let id = Uuid::new_v4();
                record.assign_id(id);
                id
            }
        };
        self.changes.queue_new(record.clone(), row);
        debug!(
            "event=store_insert module=store status=pending record_type={} id={id}",
            record.record_type()
        );

        if commit {
            self.commit()?;
        }
        Ok(id)
    }

    /// Inserts each record in turn, then commits once if asked.
    ///
    /// Not all-or-nothing: records queued before a failing one stay queued.
    pub fn insert_many(
        &mut self,
        records: &mut [Record],
        commit: bool,
    ) -> StoreResult<Vec<RecordId>> {
        let mut ids = Vec::with_capacity(records.len());
        for record in records.iter_mut() {
            ids.push(self.insert(record, false)?);
        }

        if commit {
            self.commit()?;
        }
        Ok(ids)
    }

    /// Records the current values of an inserted record as a pending change.
    ///
    /// A pending insert is updated in place. A persisted record becomes dirty,
    /// or stops being dirty when its values match the committed row again.
    ///
    /// # Errors
    /// - `NotTracked` for a record that was never inserted.
    /// - `NotFound` when no committed row exists for its id.
    pub fn update(&mut self, record: &Record) -> StoreResult<()> {
        let Some(id) = record.id() else {
            return Err(StoreError::NotTracked {
                record_type: record.record_type().to_string(),
            });
        };
        let record_type = lookup(&self.types, record.record_type())?;
        let row = record_type.conform(record.values())?;

        if self.changes.replace_new(id, record, row.clone()) {
            return Ok(());
        }

        let (committed, committed_row) = match self.changes.dirty_snapshot(id) {
            Some(snapshot) => snapshot,
            None => {
                let repo = SqliteRecordRepository::new_unchecked(&self.conn);
                let committed = repo
                    .get_record(record_type, id)?
                    .ok_or(StoreError::NotFound(id))?;
                let committed_row = record_type.conform(committed.values())?;
                (committed, committed_row)
            }
        };

        self.changes.mark_dirty(id, record, row, committed, committed_row);
        debug!(
            "event=store_update module=store status=ok record_type={} id={id} dirty={}",
            record.record_type(),
            self.changes.dirty_entries().len()
        );
        Ok(())
    }

    /// Looks up a single record by filter string.
    ///
    /// An empty type name or filter means "no query" and yields an empty
    /// outcome. When several records match, the first in insertion order is
    /// returned along with a `MultipleResultsWarning`.
    ///
    /// # Errors
    /// - `Filter` for malformed filter strings.
    /// - `Build` for unknown attributes or unusable literals.
    /// - `UnknownRecordType` for unregistered types.
    pub fn query_one(&self, record_type: &str, filter: &str) -> StoreResult<QueryOne> {
        if record_type.trim().is_empty() || filter.trim().is_empty() {
            return Ok(QueryOne::default());
        }

        let record_type = lookup(&self.types, record_type)?;
        let pairs = parse(filter)?;
        let predicate = build(record_type, &pairs)?;
        let matches =
            SqliteRecordRepository::new_unchecked(&self.conn).select_matching(&predicate)?;

        let outcome = QueryOne::resolve(record_type.name(), filter, matches);
        if let Some(warning) = &outcome.warning {
            warn!(
                "event=store_query_one module=store status=multiple_results record_type={} matches={} returned={} filter={:?}",
                warning.record_type,
                warning.match_count,
                warning.returned.id().map(|id| id.to_string()).unwrap_or_default(),
                warning.filter
            );
        }
        Ok(outcome)
    }

    /// Returns every committed record of a type, in insertion order.
    ///
    /// An empty type name yields an empty list.
    pub fn query_all(&self, record_type: &str) -> StoreResult<Vec<Record>> {
        if record_type.trim().is_empty() {
            return Ok(Vec::new());
        }

        let record_type = lookup(&self.types, record_type)?;
        let records = SqliteRecordRepository::new_unchecked(&self.conn)
            .select_matching(&Predicate::match_all(record_type))?;
        Ok(records)
    }

    /// Reads the committed state of one record.
    pub fn get(&self, record_type: &str, id: RecordId) -> StoreResult<Option<Record>> {
        let record_type = lookup(&self.types, record_type)?;
        let record =
            SqliteRecordRepository::new_unchecked(&self.conn).get_record(record_type, id)?;
        Ok(record)
    }

    /// Overwrites `record` with its committed state. Pending changes are kept.
    pub fn refresh(&self, record: &mut Record) -> StoreResult<()> {
        let Some(id) = record.id() else {
            return Err(StoreError::NotTracked {
                record_type: record.record_type().to_string(),
            });
        };
        *record = self
            .get(record.record_type(), id)?
            .ok_or(StoreError::NotFound(id))?;
        Ok(())
    }

    /// Writes all pending inserts and updates in one transaction.
    ///
    /// On failure the transaction is rolled back and the pending sets are left
    /// as they were, so the caller may retry or call `rollback`.
    pub fn commit(&mut self) -> StoreResult<()> {
        if self.changes.is_empty() {
            return Ok(());
        }

        let started_at = Instant::now();
        let inserted = self.changes.new_entries().len();
        let updated = self.changes.dirty_entries().len();

        let result = write_changes(
            &mut self.conn,
            &self.types,
            self.changes.new_entries(),
            self.changes.dirty_entries(),
        );
        match result {
            Ok(()) => {
                self.changes.take();
                info!(
                    "event=store_commit module=store status=ok inserted={inserted} updated={updated} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=store_commit module=store status=error inserted={inserted} updated={updated} duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Discards all pending changes.
    ///
    /// Pending inserts are dropped; dirty records fall back to their committed
    /// state, which is returned so callers can resynchronize their copies.
    /// Discarded records keep their ids and may be passed to `insert` again.
    #[doc(alias = "cancel_update")]
    pub fn rollback(&mut self) -> Rollback {
        let (new, dirty) = self.changes.take();
        let rollback = Rollback {
            discarded: new.into_iter().map(|entry| entry.record).collect(),
            reverted: dirty.into_iter().map(|entry| entry.committed).collect(),
        };
        if !rollback.is_empty() {
            info!(
                "event=store_rollback module=store status=ok discarded={} reverted={}",
                rollback.discarded.len(),
                rollback.reverted.len()
            );
        }
        rollback
    }

    /// Records inserted but not yet committed, in insertion order.
    pub fn pending_new(&self) -> Vec<Record> {
        self.changes
            .new_entries()
            .iter()
            .map(|entry| entry.record.clone())
            .collect()
    }

    /// Persisted records with uncommitted changes, as last passed to `update`.
    pub fn pending_dirty(&self) -> Vec<Record> {
        self.changes
            .dirty_entries()
            .iter()
            .map(|entry| entry.record.clone())
            .collect()
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

fn lookup<'t>(
    types: &'t BTreeMap<String, RecordType>,
    name: &str,
) -> StoreResult<&'t RecordType> {
    types
        .get(name)
        .ok_or_else(|| StoreError::UnknownRecordType(name.to_string()))
}

fn write_changes(
    conn: &mut Connection,
    types: &BTreeMap<String, RecordType>,
    new: &[PendingNew],
    dirty: &[PendingDirty],
) -> StoreResult<()> {
    let tx = conn.transaction()?;
    {
        let repo = SqliteRecordRepository::new_unchecked(&tx);
        for entry in new {
            let record_type = lookup(types, entry.record.record_type())?;
            let id = entry.record.id().ok_or_else(|| StoreError::NotTracked {
                record_type: record_type.name().to_string(),
            })?;
            repo.insert_row(record_type, id, &entry.row)?;
        }
        for entry in dirty {
            let record_type = lookup(types, entry.record.record_type())?;
            let id = entry.record.id().ok_or_else(|| StoreError::NotTracked {
                record_type: record_type.name().to_string(),
            })?;
            repo.update_row(record_type, id, &entry.row)?;
        }
    }
    tx.commit()?;
    Ok(())
}
