//! Change log entries and their wire representation.
//!
//! Each mutation of a database appends one tagged entry. Entries serialize
//! to compact JSON objects with short field names; absent fields are
//! omitted entirely. The stored value slot is raw JSON that the engine
//! never inspects or canonicalises.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

const OP_CREATE_TABLE: &str = "create-table";
const OP_DELETE_TABLE: &str = "delete-table";
const OP_RENAME_TABLE: &str = "rename-table";
const OP_CLEAR_TABLE: &str = "clear-table";
const OP_UPDATE: &str = "update";
const OP_DELETE: &str = "delete";

/// Operation code of a log entry.
///
/// Decoding preserves unrecognised codes in [`Op::Other`] so that replay
/// can reject them with a precise error instead of failing the JSON parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Op {
    /// Ensure a table exists.
    CreateTable,
    /// Remove a table and all its keys.
    DeleteTable,
    /// Rename a table.
    RenameTable,
    /// Empty a table, keeping the table itself.
    ClearTable,
    /// Set a key to a value.
    Update,
    /// Remove a key.
    Delete,
    /// An operation code this crate does not understand.
    Other(String),
}

impl Op {
    /// Returns the wire spelling of the operation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::CreateTable => OP_CREATE_TABLE,
            Self::DeleteTable => OP_DELETE_TABLE,
            Self::RenameTable => OP_RENAME_TABLE,
            Self::ClearTable => OP_CLEAR_TABLE,
            Self::Update => OP_UPDATE,
            Self::Delete => OP_DELETE,
            Self::Other(name) => name,
        }
    }
}

impl From<String> for Op {
    fn from(name: String) -> Self {
        match name.as_str() {
            OP_CREATE_TABLE => Self::CreateTable,
            OP_DELETE_TABLE => Self::DeleteTable,
            OP_RENAME_TABLE => Self::RenameTable,
            OP_CLEAR_TABLE => Self::ClearTable,
            OP_UPDATE => Self::Update,
            OP_DELETE => Self::Delete,
            _ => Self::Other(name),
        }
    }
}

impl From<Op> for String {
    fn from(op: Op) -> Self {
        op.as_str().to_string()
    }
}

/// One mutation in a database change log.
///
/// Field meanings depend on the operation:
///
/// | op           | table | key      | value |
/// |--------------|-------|----------|-------|
/// | create-table | name  | —        | —     |
/// | delete-table | name  | —        | —     |
/// | rename-table | old   | new name | —     |
/// | clear-table  | name  | —        | —     |
/// | update       | table | key      | value |
/// | delete       | table | key      | —     |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Operation code.
    pub op: Op,
    /// Table name, or the old name for a rename.
    #[serde(rename = "tab", default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Key, or the new table name for a rename.
    #[serde(rename = "key", default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Raw JSON value for an update; stored byte-for-byte.
    #[serde(rename = "val", default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Box<RawValue>>,
    /// Microseconds since the Unix epoch; informational except for rewind.
    #[serde(rename = "clk", default, skip_serializing_if = "clock_is_zero")]
    pub clock: i64,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // signature fixed by serde
const fn clock_is_zero(clock: &i64) -> bool {
    *clock == 0
}

impl PartialEq for LogEntry {
    fn eq(&self, other: &Self) -> bool {
        self.op == other.op
            && self.table == other.table
            && self.key == other.key
            && self.clock == other.clock
            && self.value.as_deref().map(RawValue::get) == other.value.as_deref().map(RawValue::get)
    }
}

impl Eq for LogEntry {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_wire_spellings() {
        for (op, name) in [
            (Op::CreateTable, "create-table"),
            (Op::DeleteTable, "delete-table"),
            (Op::RenameTable, "rename-table"),
            (Op::ClearTable, "clear-table"),
            (Op::Update, "update"),
            (Op::Delete, "delete"),
        ] {
            assert_eq!(op.as_str(), name);
            assert_eq!(Op::from(name.to_string()), op);
        }
    }

    #[test]
    fn test_op_unknown_preserved() {
        let op = Op::from("truncate-table".to_string());
        assert_eq!(op, Op::Other("truncate-table".to_string()));
        assert_eq!(op.as_str(), "truncate-table");
    }

    #[test]
    fn test_entry_omits_absent_fields() {
        let entry = LogEntry {
            op: Op::CreateTable,
            table: Some("test".to_string()),
            key: None,
            value: None,
            clock: 0,
        };
        let text = serde_json::to_string(&entry).expect("encode");
        assert_eq!(text, r#"{"op":"create-table","tab":"test"}"#);
    }

    #[test]
    fn test_entry_full_round_trip() {
        let text = r#"{"op":"update","tab":"test","key":"x","val":[1,"two",null],"clk":1712000000000000}"#;
        let entry: LogEntry = serde_json::from_str(text).expect("decode");
        assert_eq!(entry.op, Op::Update);
        assert_eq!(entry.table.as_deref(), Some("test"));
        assert_eq!(entry.key.as_deref(), Some("x"));
        assert_eq!(entry.value.as_deref().map(RawValue::get), Some(r#"[1,"two",null]"#));
        assert_eq!(entry.clock, 1_712_000_000_000_000);
        assert_eq!(serde_json::to_string(&entry).expect("encode"), text);
    }

    #[test]
    fn test_entry_missing_clock_is_zero() {
        let entry: LogEntry =
            serde_json::from_str(r#"{"op":"delete","tab":"t","key":"k"}"#).expect("decode");
        assert_eq!(entry.clock, 0);
    }

    #[test]
    fn test_entry_unknown_op_decodes() {
        let entry: LogEntry =
            serde_json::from_str(r#"{"op":"compact","tab":"t"}"#).expect("decode");
        assert_eq!(entry.op, Op::Other("compact".to_string()));
    }
}
