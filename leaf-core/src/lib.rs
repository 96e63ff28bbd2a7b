//! Storage engine for the LEAF lightweight encrypted archive format.
//!
//! A LEAF file is a single encrypted container for small, high-value
//! structured data (passwords, notes, bookmarks). It holds a collection of
//! named tables; each table maps string keys to arbitrary JSON values. The
//! store never interprets those values.
//!
//! # Envelope
//!
//! Two keys protect a file. The caller-provided 32-byte *access key* wraps
//! a per-file random 32-byte *data key*; the data key encrypts the payload.
//! Both encryptions are XChaCha20-Poly1305 with a random 24-byte nonce
//! prepended to the ciphertext. On disk the file is a small JSON object:
//!
//! ```text
//! {"leaf": 1, "key": <base64 wrapped data key>, "data": <base64 payload>}
//! ```
//!
//! Because the wrapped data key is cached verbatim, reopening a file needs
//! only the same access key; saves never re-wrap or regenerate keys.
//!
//! # Pipeline
//!
//! Save: database → JSON → snappy → AEAD(data key) → envelope → writer.
//! Load: reader → envelope → AEAD⁻¹(access key) over the wrapped key →
//! AEAD⁻¹(data key) over the payload → snappy⁻¹ → JSON → database.
//!
//! # Log-structured state
//!
//! The canonical state of a database is an append-only log of mutation
//! entries; the table index is always rebuilt by replaying the log. The
//! full history is persisted, so a database can be rewound to any prior
//! timestamp and either saved in that state or reverted. See [`Database`].

#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
// Algorithm names like XChaCha20-Poly1305 appear in docs without backticks
#![allow(clippy::doc_markdown)]

pub mod codec;
pub mod database;
mod envelope;
pub mod error;
pub mod file;
pub mod format;
pub mod log;
pub mod table;

pub use codec::DataKey;
pub use database::Database;
pub use error::{Error, Result};
pub use file::File;
pub use log::{LogEntry, Op};
pub use table::Table;
