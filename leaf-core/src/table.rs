//! Named table handles.
//!
//! A [`Table`] is a lightweight view onto one table of a [`Database`]; it
//! owns no state beyond the name. All operations project through the
//! database index, and every mutation appends one log entry.

use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::value::to_raw_value;

use crate::database::{now_micros, Database};
use crate::log::{LogEntry, Op};

/// A mapping of string keys to JSON-serializable values.
///
/// Handles are obtained from [`Database::table`] or
/// [`Database::get_table`] and borrow the database exclusively, so a
/// table cannot be deleted or rewound out from under a live handle.
#[derive(Debug)]
pub struct Table<'a> {
    name: String,
    db: &'a mut Database,
}

impl<'a> Table<'a> {
    pub(crate) fn new(name: String, db: &'a mut Database) -> Self {
        Self { name, db }
    }

    /// Returns the current name of the table.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reports whether the table contains `key`, without decoding its
    /// value.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.db
            .tabs
            .get(&self.name)
            .is_some_and(|tab| tab.contains_key(key))
    }

    /// Returns the value of `key` decoded as `T`, or `None` if the key is
    /// absent.
    ///
    /// # Panics
    ///
    /// Panics if the stored value does not decode into `T`. That is a
    /// type mismatch in the caller, not file corruption; the value was
    /// well-formed JSON when it was stored.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let pos = *self.db.tabs.get(&self.name)?.get(key)?;
        let raw = self.db.entry_value(pos);
        Some(
            serde_json::from_str(raw.get())
                .expect("stored value decodes into the requested type"),
        )
    }

    /// Returns the keys of the table in lexicographic order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.db
            .tabs
            .get(&self.name)
            .map(|tab| tab.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns all entries decoded as `T`. The result is independent of
    /// the table; modifying it does not affect the database.
    ///
    /// # Panics
    ///
    /// Panics if a stored value does not decode into `T`.
    #[must_use]
    pub fn as_map<T: DeserializeOwned>(&self) -> BTreeMap<String, T> {
        self.db
            .tabs
            .get(&self.name)
            .map(|tab| {
                tab.iter()
                    .map(|(key, &pos)| {
                        let raw = self.db.entry_value(pos);
                        let value = serde_json::from_str(raw.get())
                            .expect("stored value decodes into the requested type");
                        (key.clone(), value)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Adds or updates the value of `key` and reports whether it was new.
    ///
    /// # Panics
    ///
    /// Panics if `value` cannot be encoded as JSON.
    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> bool {
        let raw = to_raw_value(value).expect("value encodes to JSON");
        self.db.push_entry(LogEntry {
            op: Op::Update,
            table: Some(self.name.clone()),
            key: Some(key.to_string()),
            value: Some(raw),
            clock: now_micros(),
        });
        let pos = self.db.log.len() - 1;
        let tab = self.db.tabs.entry(self.name.clone()).or_default();
        tab.insert(key.to_string(), pos).is_none()
    }

    /// Sets every entry of `values` in key order. Equivalent to individual
    /// [`set`](Table::set) calls; there is no atomicity beyond the
    /// sequence of appends.
    pub fn set_map<T: Serialize>(&mut self, values: &BTreeMap<String, T>) {
        for (key, value) in values {
            self.set(key, value);
        }
    }

    /// Removes `key` and reports whether it was present. Deleting an
    /// absent key appends nothing.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self
            .db
            .tabs
            .get_mut(&self.name)
            .is_some_and(|tab| tab.remove(key).is_some());
        if removed {
            self.db.push_entry(LogEntry {
                op: Op::Delete,
                table: Some(self.name.clone()),
                key: Some(key.to_string()),
                value: None,
                clock: now_micros(),
            });
        }
        removed
    }

    /// Renames the table. Renaming to the current name is a no-op; the
    /// handle follows the new name.
    pub fn rename(&mut self, new_name: &str) {
        if self.name == new_name {
            return;
        }
        let sub = self.db.tabs.remove(&self.name).unwrap_or_default();
        self.db.tabs.insert(new_name.to_string(), sub);
        self.db.push_entry(LogEntry {
            op: Op::RenameTable,
            table: Some(self.name.clone()),
            key: Some(new_name.to_string()),
            value: None,
            clock: now_micros(),
        });
        self.name = new_name.to_string();
    }

    /// Removes all keys, keeping the table itself. Clearing an empty
    /// table appends nothing.
    pub fn clear(&mut self) {
        let cleared = self.db.tabs.get_mut(&self.name).is_some_and(|tab| {
            if tab.is_empty() {
                false
            } else {
                tab.clear();
                true
            }
        });
        if cleared {
            self.db.push_entry(LogEntry {
                op: Op::ClearTable,
                table: Some(self.name.clone()),
                key: None,
                value: None,
                clock: now_micros(),
            });
        }
    }

    /// Returns the number of keys in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.db.tabs.get(&self.name).map_or(0, BTreeMap::len)
    }

    /// Reports whether the table has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
