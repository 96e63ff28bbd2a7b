//! Archive files: key binding plus the load/save pipeline.
//!
//! A [`File`] binds the two forms of the data key to a [`Database`] and
//! drives persistence: save encodes the database, compresses it, encrypts
//! it under the plaintext data key, and wraps the result with the cached
//! wrapped key into the outer envelope; load runs the same pipeline in
//! reverse. The data key is generated once at [`File::new`] and reused
//! verbatim across saves, so reopening needs only the same access key.

use std::io::{Read, Write};

use zeroize::Zeroize;

use crate::codec::{self, DataKey};
use crate::database::Database;
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::format::{ACCESS_KEY_LEN, DATA_KEY_LEN};

/// An open archive file.
///
/// The plaintext data key is sensitive; it is zeroized when the file is
/// dropped and on every failing load path that has already unwrapped it.
#[derive(Debug)]
pub struct File {
    /// Data key encrypted under the access key; persisted verbatim.
    data_key_encrypted: Vec<u8>,
    /// Plaintext data key; encrypts the payload.
    data_key: DataKey,
    db: Database,
}

impl File {
    /// Constructs a new empty archive using the given access key.
    ///
    /// A fresh random data key is generated and wrapped under the access
    /// key; both forms are kept for the lifetime of the file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadKeyLength`] unless `access_key` is exactly
    /// [`ACCESS_KEY_LEN`] bytes.
    pub fn new(access_key: &[u8]) -> Result<Self> {
        if access_key.len() != ACCESS_KEY_LEN {
            return Err(Error::BadKeyLength(access_key.len()));
        }
        let data_key = DataKey::generate();
        let data_key_encrypted = codec::encrypt(access_key, data_key.as_bytes())?;
        Ok(Self {
            data_key_encrypted,
            data_key,
            db: Database::new(),
        })
    }

    /// Reads and decrypts an archive from `reader` using `access_key`.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - [`Error::BadKeyLength`] unless the key is 32 bytes
    /// - [`Error::Io`] if the reader fails
    /// - [`Error::Malformed`] if the envelope or payload does not parse
    /// - [`Error::VersionMismatch`] for an unsupported format version
    /// - [`Error::AuthFailed`] for a wrong key or tampered file
    /// - [`Error::CompressionFailed`] if the payload does not decompress
    /// - [`Error::UnknownOp`] if the log holds an unrecognised operation
    pub fn open<R: Read>(access_key: &[u8], mut reader: R) -> Result<Self> {
        if access_key.len() != ACCESS_KEY_LEN {
            return Err(Error::BadKeyLength(access_key.len()));
        }

        // Phase 1: decode the plaintext wrapper.
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let envelope = Envelope::decode(&bytes)?;

        // Phase 2: unwrap the data key with the access key.
        let mut key_bytes = codec::decrypt(access_key, &envelope.key)?;
        if key_bytes.len() != DATA_KEY_LEN {
            key_bytes.zeroize();
            return Err(Error::Malformed(format!(
                "wrapped data key has length {}, want {DATA_KEY_LEN}",
                key_bytes.len()
            )));
        }
        let mut raw_key = [0u8; DATA_KEY_LEN];
        raw_key.copy_from_slice(&key_bytes);
        key_bytes.zeroize();
        // From here on the key zeroizes when dropped, including on the
        // error paths below.
        let data_key = DataKey::from_bytes(raw_key);
        raw_key.zeroize();

        // Phase 3: decrypt and decompress the payload with the data key.
        let payload = codec::decrypt(data_key.as_bytes(), &envelope.data)?;
        let payload = codec::decompress(&payload)?;

        // Phase 4: decode the log and rebuild the index.
        let db = Database::decode(&payload)?;
        Ok(Self {
            data_key_encrypted: envelope.key,
            data_key,
            db,
        })
    }

    /// Encodes, encrypts, and writes the current contents to `writer` as
    /// a single write, returning the number of bytes written.
    ///
    /// The cached wrapped data key is reused verbatim; no key is
    /// regenerated or re-wrapped. The payload nonce is fresh per save, so
    /// saving identical content twice produces different bytes. The
    /// modification flag is cleared only after a successful write; if the
    /// writer fails, bytes it already consumed are not rewound.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if no wrapped key is present and
    /// [`Error::Io`] if the writer fails. Nothing is written unless
    /// encoding and encryption succeed.
    pub fn write_to<W: Write>(&mut self, mut writer: W) -> Result<usize> {
        if self.data_key_encrypted.is_empty() {
            return Err(Error::Malformed("no encryption key present".to_string()));
        }
        let payload = self.db.encode()?;
        let sealed = codec::encrypt(self.data_key.as_bytes(), &codec::compress(&payload))?;
        let envelope = Envelope::new(self.data_key_encrypted.clone(), sealed);
        let bytes = envelope.encode()?;

        writer.write_all(&bytes)?;
        self.db.dirty = false;
        Ok(bytes.len())
    }

    /// Returns the database stored in the file.
    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.db
    }

    /// Returns the database stored in the file, mutably.
    pub fn database_mut(&mut self) -> &mut Database {
        &mut self.db
    }

    /// Reports whether the contents have been modified since the last
    /// save.
    #[must_use]
    pub const fn is_modified(&self) -> bool {
        self.db.is_modified()
    }
}
