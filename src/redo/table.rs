//! Table-backed redo log.
//!
//! The store is an embedded [redb](https://docs.rs/redb) database with two
//! record tables: log rows keyed by `(instance, row)` and checkpoint records
//! keyed by instance, so an instance's rows are one range scan. A row-owner
//! index resolves a bare row id, and a meta table holds the id sequences and
//! the schema header. Every mutation is a single write transaction; a commit
//! writes its row and its checkpoint together or not at all.

use super::codec::{Encoding, SCHEMA_VERSION};
use super::error::RedoError;
use super::{CheckpointRecord, EventStatus, InstanceId, LogEntry, LogRow, RedoLog, RowId};
use crate::core::StateFrame;
use async_trait::async_trait;
use chrono::Utc;
use redb::backends::InMemoryBackend;
use redb::{Database, ReadTransaction, ReadableTable, Table, TableDefinition, WriteTransaction};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::Arc;

const ROWS: TableDefinition<(InstanceId, RowId), &[u8]> = TableDefinition::new("log_rows");
const ROW_OWNERS: TableDefinition<RowId, InstanceId> = TableDefinition::new("row_owners");
const CHECKPOINTS: TableDefinition<InstanceId, &[u8]> = TableDefinition::new("checkpoints");
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const SCHEMA_KEY: &str = "schema_version";
const ENCODING_KEY: &str = "encoding";
const NEXT_ROW: &str = "next_row";
const NEXT_INSTANCE: &str = "next_instance";

/// Where and how a [`TableLog`] keeps its tables.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TableLogOptions {
    /// Database file. `None` keeps the tables in memory only.
    pub path: Option<PathBuf>,
    pub encoding: Encoding,
}

impl TableLogOptions {
    pub fn file(path: impl Into<PathBuf>, encoding: Encoding) -> Self {
        Self {
            path: Some(path.into()),
            encoding,
        }
    }
}

/// Redo log over two relational-style tables.
pub struct TableLog {
    db: Arc<Database>,
    options: TableLogOptions,
}

impl TableLog {
    /// A store that lives only as long as the process.
    pub fn in_memory() -> Result<Self, RedoError> {
        Self::create(TableLogOptions::default())
    }

    /// Open a store, creating the database file if it does not exist.
    pub async fn open(options: TableLogOptions) -> Result<Self, RedoError> {
        let log = blocking(move || Self::create(options)).await?;
        tracing::debug!(
            path = ?log.options.path,
            encoding = ?log.options.encoding,
            "opened redo log"
        );
        Ok(log)
    }

    pub fn options(&self) -> &TableLogOptions {
        &self.options
    }

    fn create(options: TableLogOptions) -> Result<Self, RedoError> {
        let db = match &options.path {
            Some(path) => Database::create(path)?,
            None => Database::builder().create_with_backend(InMemoryBackend::new())?,
        };
        prepare(&db, options.encoding)?;
        Ok(Self {
            db: Arc::new(db),
            options,
        })
    }

    /// Run `change` in one write transaction, committed only if it succeeds.
    async fn write<T, F>(&self, change: F) -> Result<T, RedoError>
    where
        T: Send + 'static,
        F: FnOnce(&WriteTransaction) -> Result<T, RedoError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        blocking(move || {
            let txn = db.begin_write()?;
            let out = change(&txn)?;
            txn.commit()?;
            Ok(out)
        })
        .await
    }

    async fn read<T, F>(&self, query: F) -> Result<T, RedoError>
    where
        T: Send + 'static,
        F: FnOnce(&ReadTransaction) -> Result<T, RedoError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        blocking(move || {
            let txn = db.begin_read()?;
            query(&txn)
        })
        .await
    }
}

async fn blocking<T, F>(work: F) -> Result<T, RedoError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, RedoError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| RedoError::Backend(err.to_string()))?
}

/// Create the tables and check the schema header.
fn prepare(db: &Database, encoding: Encoding) -> Result<(), RedoError> {
    let txn = db.begin_write()?;
    {
        txn.open_table(ROWS)?;
        txn.open_table(ROW_OWNERS)?;
        txn.open_table(CHECKPOINTS)?;
        let mut meta = txn.open_table(META)?;
        let version = meta.get(SCHEMA_KEY)?.map(|version| version.value());
        match version {
            None => {
                meta.insert(SCHEMA_KEY, SCHEMA_VERSION)?;
                meta.insert(ENCODING_KEY, encoding.tag())?;
            }
            Some(found) if found != SCHEMA_VERSION => {
                return Err(RedoError::UnsupportedVersion {
                    found,
                    supported: SCHEMA_VERSION,
                });
            }
            Some(_) => {
                let stored = meta
                    .get(ENCODING_KEY)?
                    .and_then(|tag| Encoding::from_tag(tag.value()));
                if stored != Some(encoding) {
                    return Err(RedoError::EncodingMismatch {
                        stored,
                        requested: encoding,
                    });
                }
            }
        }
    }
    txn.commit()?;
    Ok(())
}

fn next_id(meta: &mut Table<&'static str, u64>, key: &str) -> Result<u64, RedoError> {
    let next = meta.get(key)?.map(|id| id.value()).unwrap_or(1);
    meta.insert(key, next + 1)?;
    Ok(next)
}

fn instance_rows(instance: InstanceId) -> RangeInclusive<(InstanceId, RowId)> {
    (instance, RowId::MIN)..=(instance, RowId::MAX)
}

#[async_trait]
impl RedoLog for TableLog {
    async fn commit(&self, entry: LogEntry) -> Result<LogRow, RedoError> {
        let encoding = self.options.encoding;
        self.write(move |txn| {
            let mut checkpoints = txn.open_table(CHECKPOINTS)?;
            let mut record: CheckpointRecord = match checkpoints.get(entry.instance)? {
                Some(stored) => encoding.decode(stored.value())?,
                None => return Err(RedoError::InstanceNotFound(entry.instance)),
            };
            record.state = entry.from;
            record.updated_at = Utc::now();
            checkpoints.insert(record.id, encoding.encode(&record)?.as_slice())?;

            let mut meta = txn.open_table(META)?;
            let id = next_id(&mut meta, NEXT_ROW)?;
            let row = LogRow::from_entry(id, entry);
            let mut owners = txn.open_table(ROW_OWNERS)?;
            owners.insert(id, row.instance)?;
            let mut rows = txn.open_table(ROWS)?;
            rows.insert((row.instance, id), encoding.encode(&row)?.as_slice())?;
            Ok(row)
        })
        .await
    }

    async fn apply(&self, row: RowId) -> Result<(), RedoError> {
        self.write(move |txn| {
            let mut owners = txn.open_table(ROW_OWNERS)?;
            let instance = owners
                .remove(row)?
                .map(|owner| owner.value())
                .ok_or(RedoError::RowNotFound(row))?;
            let mut rows = txn.open_table(ROWS)?;
            rows.remove((instance, row))?;
            Ok(())
        })
        .await
    }

    async fn fsm_persist(
        &self,
        owner_type: &str,
        owner_id: &str,
        initial: StateFrame,
    ) -> Result<CheckpointRecord, RedoError> {
        let encoding = self.options.encoding;
        let owner_type = owner_type.to_string();
        let owner_id = owner_id.to_string();
        self.write(move |txn| {
            let mut meta = txn.open_table(META)?;
            let id = next_id(&mut meta, NEXT_INSTANCE)?;
            let now = Utc::now();
            let record = CheckpointRecord {
                id,
                owner_type,
                owner_id,
                state: initial,
                created_at: now,
                updated_at: now,
            };
            let mut checkpoints = txn.open_table(CHECKPOINTS)?;
            checkpoints.insert(id, encoding.encode(&record)?.as_slice())?;
            Ok(record)
        })
        .await
    }

    async fn destroy_fsm(&self, instance: InstanceId) -> Result<(), RedoError> {
        self.write(move |txn| {
            let mut checkpoints = txn.open_table(CHECKPOINTS)?;
            let existed = checkpoints.remove(instance)?.is_some();
            if !existed {
                return Err(RedoError::InstanceNotFound(instance));
            }

            let mut rows = txn.open_table(ROWS)?;
            let ids = rows
                .range(instance_rows(instance))?
                .map(|entry| entry.map(|(key, _)| key.value().1))
                .collect::<Result<Vec<RowId>, _>>()?;
            let mut owners = txn.open_table(ROW_OWNERS)?;
            for id in ids {
                rows.remove((instance, id))?;
                owners.remove(id)?;
            }
            Ok(())
        })
        .await
    }

    async fn recover_fsm(&self) -> Result<Vec<CheckpointRecord>, RedoError> {
        let encoding = self.options.encoding;
        self.read(move |txn| {
            let checkpoints = txn.open_table(CHECKPOINTS)?;
            let mut records: Vec<CheckpointRecord> = Vec::new();
            for entry in checkpoints.iter()? {
                let (_, stored) = entry?;
                records.push(encoding.decode(stored.value())?);
            }
            Ok(records)
        })
        .await
    }

    async fn recover_event_for_group(
        &self,
        instance: InstanceId,
    ) -> Result<Option<LogRow>, RedoError> {
        let encoding = self.options.encoding;
        self.read(move |txn| {
            let rows = txn.open_table(ROWS)?;
            for entry in rows.range(instance_rows(instance))?.rev() {
                let (_, stored) = entry?;
                let row: LogRow = encoding.decode(stored.value())?;
                if row.status == EventStatus::Doing {
                    return Ok(Some(row));
                }
            }
            Ok(None)
        })
        .await
    }

    async fn checkpoint(
        &self,
        instance: InstanceId,
    ) -> Result<Option<CheckpointRecord>, RedoError> {
        let encoding = self.options.encoding;
        self.read(move |txn| {
            let checkpoints = txn.open_table(CHECKPOINTS)?;
            let record: Option<CheckpointRecord> = checkpoints
                .get(instance)?
                .map(|stored| encoding.decode(stored.value()))
                .transpose()?;
            Ok(record)
        })
        .await
    }

    async fn rows_for(&self, instance: InstanceId) -> Result<Vec<LogRow>, RedoError> {
        let encoding = self.options.encoding;
        self.read(move |txn| {
            let rows = txn.open_table(ROWS)?;
            let mut found: Vec<LogRow> = Vec::new();
            for entry in rows.range(instance_rows(instance))? {
                let (_, stored) = entry?;
                found.push(encoding.decode(stored.value())?);
            }
            Ok(found)
        })
        .await
    }
}
