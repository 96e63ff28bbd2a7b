//! The log-structured database: canonical change log plus derived index.
//!
//! The log is the only persisted state. The table index is a projection of
//! it, rebuilt by replay on load, on rewind, and on revert; it maps table
//! names to key → log-position of the entry holding the current value.
//! Positions are used instead of references because appends may reallocate
//! the log vector.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::{Error, Result};
use crate::log::{LogEntry, Op};
use crate::table::Table;

/// Derived index: table name → key → position in the log.
pub(crate) type TableIndex = BTreeMap<String, BTreeMap<String, usize>>;

/// A database of key-value tables stored in a file.
///
/// Mutations flow through [`Table`] handles or the table-level methods
/// here; every one appends a timestamped entry to the log and marks the
/// database modified. The full history stays in the log, so the visible
/// state can be [rewound](Database::rewind) to any prior timestamp and
/// either saved in that form or [reverted](Database::revert).
#[derive(Debug, Clone, Default)]
pub struct Database {
    pub(crate) log: Vec<LogEntry>,
    pub(crate) dirty: bool,
    saved: Option<SavedState>,
    pub(crate) tabs: TableIndex,
}

/// The pre-rewind state, held while a rewind is active.
#[derive(Debug, Clone)]
struct SavedState {
    log: Vec<LogEntry>,
    was_modified: bool,
}

impl Database {
    /// Creates an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a database from a loaded log.
    ///
    /// The index is reconstructed by replaying the log from the start; a
    /// log that does not replay cleanly is rejected.
    pub(crate) fn from_log(log: Vec<LogEntry>) -> Result<Self> {
        let tabs = replay(&log)?;
        Ok(Self {
            log,
            dirty: false,
            saved: None,
            tabs,
        })
    }

    /// Reports whether the contents have been modified since the last save.
    #[must_use]
    pub const fn is_modified(&self) -> bool {
        self.dirty
    }

    /// Returns the change log in append order.
    #[must_use]
    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// Returns the table names in ascending lexicographic order.
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        self.tabs.keys().cloned().collect()
    }

    /// Returns a handle to the named table if it exists. Does not mutate.
    pub fn get_table(&mut self, name: &str) -> Option<Table<'_>> {
        if self.tabs.contains_key(name) {
            Some(Table::new(name.to_string(), self))
        } else {
            None
        }
    }

    /// Returns a handle to the named table, creating it empty if it does
    /// not exist. Creation appends a `create-table` entry; a table that
    /// already exists appends nothing.
    pub fn table(&mut self, name: &str) -> Table<'_> {
        if !self.tabs.contains_key(name) {
            self.tabs.insert(name.to_string(), BTreeMap::new());
            self.push_entry(LogEntry {
                op: Op::CreateTable,
                table: Some(name.to_string()),
                key: None,
                value: None,
                clock: now_micros(),
            });
        }
        Table::new(name.to_string(), self)
    }

    /// Deletes the named table and reports whether it existed. Deleting a
    /// missing table appends nothing.
    pub fn delete_table(&mut self, name: &str) -> bool {
        if self.tabs.remove(name).is_some() {
            self.push_entry(LogEntry {
                op: Op::DeleteTable,
                table: Some(name.to_string()),
                key: None,
                value: None,
                clock: now_micros(),
            });
            true
        } else {
            false
        }
    }

    /// Rewinds the visible state to `when` (microseconds since the Unix
    /// epoch) and reports whether this changed anything.
    ///
    /// The live log is truncated to the longest prefix whose entries all
    /// carry `clock <= when`; the full log is kept aside so [`revert`]
    /// can restore it. A rewound database is marked modified, so saving
    /// it commits the truncated history. If the database was already
    /// rewound, it is reverted first; a rewind that would drop nothing
    /// returns `false` with no state change.
    ///
    /// [`revert`]: Database::revert
    pub fn rewind(&mut self, when: i64) -> bool {
        self.revert();

        let keep = self.log.iter().take_while(|e| e.clock <= when).count();
        if keep == self.log.len() {
            return false;
        }
        let prefix = self.log[..keep].to_vec();
        let full = std::mem::replace(&mut self.log, prefix);
        self.saved = Some(SavedState {
            log: full,
            was_modified: self.dirty,
        });
        self.dirty = true;
        self.rebuild_index();
        true
    }

    /// Undoes the most recent [`rewind`](Database::rewind), restoring the
    /// saved log and modification flag. Does nothing if the database is
    /// not rewound.
    pub fn revert(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.log = saved.log;
            self.dirty = saved.was_modified;
            self.rebuild_index();
        }
    }

    /// Returns the timestamp of the latest state change, or zero if the
    /// database is empty.
    #[must_use]
    pub fn time(&self) -> i64 {
        self.log.last().map_or(0, |e| e.clock)
    }

    /// Returns a copy of the current state: table name → key → raw JSON
    /// value. The result does not alias the log; modifying it does not
    /// affect the database.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, BTreeMap<String, Box<RawValue>>> {
        self.tabs
            .iter()
            .map(|(name, sub)| {
                let copy = sub
                    .iter()
                    .map(|(key, &pos)| (key.clone(), self.entry_value(pos).to_owned()))
                    .collect();
                (name.clone(), copy)
            })
            .collect()
    }

    /// Appends an entry to the log and marks the database modified.
    pub(crate) fn push_entry(&mut self, entry: LogEntry) {
        self.log.push(entry);
        self.dirty = true;
    }

    /// Returns the value held by the indexed entry at `pos`.
    ///
    /// # Panics
    ///
    /// Panics if `pos` does not refer to an `update` entry; the index only
    /// ever points at updates.
    pub(crate) fn entry_value(&self, pos: usize) -> &RawValue {
        self.log[pos]
            .value
            .as_deref()
            .expect("indexed entry is an update and carries a value")
    }

    /// Reconstructs the index from the live log.
    fn rebuild_index(&mut self) {
        self.tabs = replay(&self.log).expect("a previously valid log replays cleanly");
    }

    /// Encodes the persistent form: `{"log": [...]}`. Only the log is
    /// written; the index is derived state.
    pub(crate) fn encode(&self) -> Result<Vec<u8>> {
        #[derive(Serialize)]
        struct WireLog<'a> {
            log: &'a [LogEntry],
        }
        serde_json::to_vec(&WireLog { log: &self.log })
            .map_err(|err| Error::Malformed(err.to_string()))
    }

    /// Decodes the persistent form and rebuilds the index.
    ///
    /// Unknown top-level fields are ignored; a missing or null `log` is an
    /// empty database.
    pub(crate) fn decode(bytes: &[u8]) -> Result<Self> {
        #[derive(Deserialize)]
        struct WireLog {
            #[serde(default, deserialize_with = "nullable_entries")]
            log: Vec<LogEntry>,
        }
        let wire: WireLog =
            serde_json::from_slice(bytes).map_err(|err| Error::Malformed(err.to_string()))?;
        Self::from_log(wire.log)
    }
}

fn nullable_entries<'de, D>(deserializer: D) -> std::result::Result<Vec<LogEntry>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let entries: Option<Vec<LogEntry>> = Option::deserialize(deserializer)?;
    Ok(entries.unwrap_or_default())
}

/// Reads the wall clock once, in microseconds since the Unix epoch.
/// Best-effort monotonic within a process; not strictly increasing.
///
/// # Panics
///
/// Panics if the system clock is before the Unix epoch or past the range
/// of `i64` microseconds.
pub(crate) fn now_micros() -> i64 {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before Unix epoch");
    i64::try_from(elapsed.as_micros()).expect("timestamp exceeds i64 microseconds")
}

/// Builds the table index by replaying a log from the start.
///
/// Fails with [`Error::UnknownOp`] on an unrecognised operation and
/// [`Error::Malformed`] on an entry missing its required arguments or an
/// update referencing a table absent at that point; both indicate a
/// corrupted or hand-edited log. A rename whose source is missing removes
/// the destination; deletes and clears of missing tables fall through.
fn replay(log: &[LogEntry]) -> Result<TableIndex> {
    let mut tabs = TableIndex::new();
    for (pos, entry) in log.iter().enumerate() {
        match &entry.op {
            Op::CreateTable => {
                tabs.entry(arg(&entry.table, entry)?.to_string()).or_default();
            }
            Op::DeleteTable => {
                tabs.remove(arg(&entry.table, entry)?);
            }
            Op::RenameTable => {
                let old = arg(&entry.table, entry)?.to_string();
                let new = arg(&entry.key, entry)?.to_string();
                if let Some(sub) = tabs.remove(&old) {
                    tabs.insert(new, sub);
                } else {
                    tabs.remove(&new);
                }
            }
            Op::ClearTable => {
                if let Some(sub) = tabs.get_mut(arg(&entry.table, entry)?) {
                    sub.clear();
                }
            }
            Op::Update => {
                let name = arg(&entry.table, entry)?;
                let key = arg(&entry.key, entry)?.to_string();
                if entry.value.is_none() {
                    return Err(Error::Malformed("update entry missing value".to_string()));
                }
                let sub = tabs.get_mut(name).ok_or_else(|| {
                    Error::Malformed(format!("update references missing table {name:?}"))
                })?;
                sub.insert(key, pos);
            }
            Op::Delete => {
                let name = arg(&entry.table, entry)?;
                let key = arg(&entry.key, entry)?;
                if let Some(sub) = tabs.get_mut(name) {
                    sub.remove(key);
                }
            }
            Op::Other(name) => return Err(Error::UnknownOp(name.clone())),
        }
    }
    Ok(tabs)
}

/// Extracts a required string argument from an entry.
fn arg<'a>(field: &'a Option<String>, entry: &LogEntry) -> Result<&'a str> {
    field
        .as_deref()
        .ok_or_else(|| Error::Malformed(format!("{} entry missing argument", entry.op.as_str())))
}
