//! SQLite storage for keyed records

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use claim_core::{Clock, Namespace, RecordKey, SystemClock};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// A record type that lives in one namespace of the store
pub trait Record: Serialize + DeserializeOwned {
    const NAMESPACE: Namespace;
}

/// One row of the event journal
#[derive(Debug, Clone)]
pub struct StoredEvent {
    pub sequence: i64,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

/// SQLite-backed account store.
///
/// Row timestamps (`created_at`, `updated_at`) come from the store's clock,
/// read once when a transaction starts.
pub struct AccountStore {
    conn: Connection,
    clock: Arc<dyn Clock>,
}

impl AccountStore {
    /// Open (or create) a store at the given database path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn,
            clock: Arc::new(SystemClock),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn,
            clock: Arc::new(SystemClock),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Stamp rows with `clock` instead of wall-clock time
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS records (
                namespace TEXT NOT NULL,
                key TEXT NOT NULL,
                data TEXT NOT NULL,
                allocation INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (namespace, key)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS events (
                sequence INTEGER PRIMARY KEY AUTOINCREMENT,
                event_type TEXT NOT NULL,
                payload TEXT NOT NULL,
                recorded_at TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    /// Run `f` inside one IMMEDIATE transaction.
    ///
    /// Commits only when `f` returns `Ok`; any error rolls back every write
    /// made through the [`StoreTx`].
    pub fn atomically<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&StoreTx<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;

        let now = self.clock.now();
        let value = f(&StoreTx { conn: &tx, now })?;

        tx.commit().map_err(StoreError::from)?;
        Ok(value)
    }

    /// Read-only access outside a transaction
    pub fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&StoreTx<'_>) -> Result<T, E>,
    {
        f(&StoreTx {
            conn: &self.conn,
            now: self.clock.now(),
        })
    }

    /// Most recent journal entries, oldest first
    pub fn events(&self, limit: usize) -> Result<Vec<StoredEvent>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT sequence, event_type, payload, recorded_at FROM events
             ORDER BY sequence DESC LIMIT ?1",
        )?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut events = rows
            .into_iter()
            .map(|(sequence, event_type, payload, recorded_at)| -> Result<StoredEvent, StoreError> {
                Ok(StoredEvent {
                    sequence,
                    event_type,
                    payload: serde_json::from_str(&payload)?,
                    recorded_at: parse_timestamp(&recorded_at)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        events.reverse();
        Ok(events)
    }
}

/// Handle for reads and writes within one transaction
pub struct StoreTx<'a> {
    conn: &'a Connection,
    now: DateTime<Utc>,
}

impl StoreTx<'_> {
    /// Insert a new record. Never overwrites.
    pub fn create<R: Record>(&self, key: &RecordKey, record: &R) -> Result<(), StoreError> {
        let data = serde_json::to_string(record)?;
        let now = self.now.to_rfc3339();

        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO records (namespace, key, data, allocation, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![R::NAMESPACE.tag(), key.to_hex(), data, data.len() as i64, now],
        )?;

        if inserted == 0 {
            return Err(StoreError::AlreadyExists {
                namespace: R::NAMESPACE,
                key: *key,
            });
        }

        tracing::trace!(namespace = %R::NAMESPACE, key = %key, "record created");
        Ok(())
    }

    pub fn load<R: Record>(&self, key: &RecordKey) -> Result<Option<R>, StoreError> {
        let data: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM records WHERE namespace = ?1 AND key = ?2",
                params![R::NAMESPACE.tag(), key.to_hex()],
                |row| row.get(0),
            )
            .optional()?;

        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Load a record that must exist
    pub fn fetch<R: Record>(&self, key: &RecordKey) -> Result<R, StoreError> {
        self.load(key)?.ok_or(StoreError::NotFound {
            namespace: R::NAMESPACE,
            key: *key,
        })
    }

    /// Overwrite an existing record
    pub fn save<R: Record>(&self, key: &RecordKey, record: &R) -> Result<(), StoreError> {
        let data = serde_json::to_string(record)?;

        let rows = self.conn.execute(
            "UPDATE records SET data = ?1, updated_at = ?2 WHERE namespace = ?3 AND key = ?4",
            params![data, self.now.to_rfc3339(), R::NAMESPACE.tag(), key.to_hex()],
        )?;

        if rows == 0 {
            return Err(StoreError::NotFound {
                namespace: R::NAMESPACE,
                key: *key,
            });
        }
        Ok(())
    }

    /// Delete a record, returning the allocation (bytes) it held
    pub fn remove<R: Record>(&self, key: &RecordKey) -> Result<u64, StoreError> {
        let allocation: Option<i64> = self
            .conn
            .query_row(
                "SELECT allocation FROM records WHERE namespace = ?1 AND key = ?2",
                params![R::NAMESPACE.tag(), key.to_hex()],
                |row| row.get(0),
            )
            .optional()?;

        let allocation = allocation.ok_or(StoreError::NotFound {
            namespace: R::NAMESPACE,
            key: *key,
        })?;

        self.conn.execute(
            "DELETE FROM records WHERE namespace = ?1 AND key = ?2",
            params![R::NAMESPACE.tag(), key.to_hex()],
        )?;

        tracing::trace!(namespace = %R::NAMESPACE, key = %key, allocation, "record removed");
        Ok(allocation as u64)
    }

    /// All records of a namespace, oldest first
    pub fn list<R: Record>(&self) -> Result<Vec<(RecordKey, R)>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT key, data FROM records WHERE namespace = ?1 ORDER BY created_at, rowid",
        )?;

        let rows = stmt
            .query_map(params![R::NAMESPACE.tag()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(key, data)| -> Result<(RecordKey, R), StoreError> {
                let key = RecordKey::from_hex(&key).map_err(|e| StoreError::Corrupt(e.to_string()))?;
                Ok((key, serde_json::from_str(&data)?))
            })
            .collect()
    }

    /// Append a journal entry. Rolled back together with the transaction.
    pub fn append_event<E: Serialize>(
        &self,
        event_type: &str,
        event: &E,
        at: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let payload = serde_json::to_string(event)?;
        self.conn.execute(
            "INSERT INTO events (event_type, payload, recorded_at) VALUES (?1, ?2, ?3)",
            params![event_type, payload, at.to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("invalid timestamp {value}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use claim_core::{derive_key, Identity};
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        body: String,
    }

    impl Record for Note {
        const NAMESPACE: Namespace = Namespace::Request;
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Other {
        body: String,
    }

    impl Record for Other {
        const NAMESPACE: Namespace = Namespace::Invoice;
    }

    fn note(body: &str) -> Note {
        Note { body: body.to_string() }
    }

    fn key(n: u8) -> RecordKey {
        RecordKey::org(&Identity::new([n; 32]))
    }

    #[test]
    fn test_create_and_fetch() {
        let mut store = AccountStore::in_memory().unwrap();
        let k = key(1);

        store
            .atomically(|tx| tx.create(&k, &note("hello")))
            .unwrap();

        let loaded: Note = store.read(|tx| tx.fetch(&k)).unwrap();
        assert_eq!(loaded, note("hello"));
    }

    #[test]
    fn test_create_never_overwrites() {
        let mut store = AccountStore::in_memory().unwrap();
        let k = key(1);

        store.atomically(|tx| tx.create(&k, &note("first"))).unwrap();
        let result = store.atomically(|tx| tx.create(&k, &note("second")));
        assert!(matches!(result, Err(StoreError::AlreadyExists { .. })));

        let loaded: Note = store.read(|tx| tx.fetch(&k)).unwrap();
        assert_eq!(loaded.body, "first");
    }

    #[test]
    fn test_namespaces_are_separate() {
        let mut store = AccountStore::in_memory().unwrap();
        let k = key(1);

        store
            .atomically(|tx| {
                tx.create(&k, &note("request"))?;
                tx.create(&k, &Other { body: "invoice".into() })
            })
            .unwrap();

        let other: Other = store.read(|tx| tx.fetch(&k)).unwrap();
        assert_eq!(other.body, "invoice");
    }

    #[test]
    fn test_error_rolls_back_everything() {
        let mut store = AccountStore::in_memory().unwrap();
        let a = key(1);
        let b = key(2);

        let result: Result<(), StoreError> = store.atomically(|tx| {
            tx.create(&a, &note("a"))?;
            tx.append_event("created", &"a", Utc::now())?;
            tx.fetch::<Note>(&b)?;
            Ok(())
        });
        assert!(matches!(result, Err(StoreError::NotFound { .. })));

        let found: Option<Note> = store.read(|tx| tx.load(&a)).unwrap();
        assert!(found.is_none());
        assert!(store.events(10).unwrap().is_empty());
    }

    #[test]
    fn test_save_requires_existing() {
        let mut store = AccountStore::in_memory().unwrap();
        let result = store.atomically(|tx| tx.save(&key(9), &note("x")));
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_remove_returns_allocation() {
        let mut store = AccountStore::in_memory().unwrap();
        let k = key(1);
        let record = note("some payload");
        let expected = serde_json::to_string(&record).unwrap().len() as u64;

        store.atomically(|tx| tx.create(&k, &record)).unwrap();
        let freed = store.atomically(|tx| tx.remove::<Note>(&k)).unwrap();
        assert_eq!(freed, expected);

        let again = store.atomically(|tx| tx.remove::<Note>(&k));
        assert!(matches!(again, Err(StoreError::NotFound { .. })));

        // Key is free again
        store.atomically(|tx| tx.create(&k, &record)).unwrap();
    }

    #[test]
    fn test_list_by_namespace() {
        let mut store = AccountStore::in_memory().unwrap();

        store
            .atomically(|tx| {
                tx.create(&key(1), &note("one"))?;
                tx.create(&key(2), &note("two"))?;
                tx.create(&key(3), &Other { body: "x".into() })
            })
            .unwrap();

        let notes: Vec<(RecordKey, Note)> = store.read(|tx| tx.list()).unwrap();
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().any(|(k, n)| *k == key(2) && n.body == "two"));
    }

    #[test]
    fn test_event_journal_order_and_limit() {
        let mut store = AccountStore::in_memory().unwrap();

        store
            .atomically(|tx| {
                for i in 0..5 {
                    tx.append_event("tick", &serde_json::json!({ "i": i }), Utc::now())?;
                }
                Ok::<_, StoreError>(())
            })
            .unwrap();

        let events = store.events(3).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].payload["i"], 2);
        assert_eq!(events[2].payload["i"], 4);
        assert!(events[0].sequence < events[2].sequence);
    }

    #[test]
    fn test_file_backed_persistence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("claims.db");
        let k = derive_key(Namespace::Request, &[b"persist"]);

        {
            let mut store = AccountStore::open(&path).unwrap();
            store.atomically(|tx| tx.create(&k, &note("durable"))).unwrap();
        }

        let store = AccountStore::open(&path).unwrap();
        let loaded: Note = store.read(|tx| tx.fetch(&k)).unwrap();
        assert_eq!(loaded.body, "durable");
    }

    #[test]
    fn test_row_timestamps_follow_store_clock() {
        use chrono::{Duration, TimeZone};
        use claim_core::ManualClock;

        let start = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let mut store = AccountStore::in_memory().unwrap().with_clock(clock.clone());
        let k = key(1);

        store.atomically(|tx| tx.create(&k, &note("v1"))).unwrap();
        clock.advance(Duration::hours(5));
        store.atomically(|tx| tx.save(&k, &note("v2"))).unwrap();

        let (created, updated): (String, String) = store
            .conn
            .query_row(
                "SELECT created_at, updated_at FROM records WHERE key = ?1",
                params![k.to_hex()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(parse_timestamp(&created).unwrap(), start);
        assert_eq!(parse_timestamp(&updated).unwrap(), start + Duration::hours(5));
    }
}
