//! Outer wire envelope persistence helpers.
//!
//! The envelope is the only plaintext structure in a file: a JSON object
//! carrying the format version, the wrapped data key, and the encrypted
//! payload. Byte fields are base64 (standard alphabet, padded). The
//! envelope itself is never compressed.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::format::FORMAT_VERSION;

/// The on-disk file object: `{"leaf": 1, "key": ..., "data": ...}`.
#[derive(Clone, Serialize, Deserialize)]
pub(crate) struct Envelope {
    /// Format version; always [`FORMAT_VERSION`] for files we write.
    #[serde(rename = "leaf")]
    pub(crate) version: i64,
    /// Data key encrypted under the access key.
    #[serde(with = "base64_bytes")]
    pub(crate) key: Vec<u8>,
    /// Payload encrypted under the data key.
    #[serde(with = "base64_bytes")]
    pub(crate) data: Vec<u8>,
}

impl Envelope {
    pub(crate) const fn new(key: Vec<u8>, data: Vec<u8>) -> Self {
        Self {
            version: FORMAT_VERSION,
            key,
            data,
        }
    }

    pub(crate) fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|err| Error::Malformed(err.to_string()))
    }

    pub(crate) fn decode(bytes: &[u8]) -> Result<Self> {
        let envelope: Self =
            serde_json::from_slice(bytes).map_err(|err| Error::Malformed(err.to_string()))?;
        if envelope.version != FORMAT_VERSION {
            return Err(Error::VersionMismatch {
                found: envelope.version,
            });
        }
        Ok(envelope)
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(&encoded).map_err(serde::de::Error::custom)
    }
}
