//! Cryptographic and compression primitives for archive payloads.
//!
//! Encryption is XChaCha20-Poly1305 with a 256-bit key and a random
//! 24-byte nonce prepended to the ciphertext. Compression is the Snappy
//! block format, applied to the payload JSON only.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};
use crate::format::{DATA_KEY_LEN, NONCE_LEN};

/// Per-file data encryption key (256-bit).
///
/// The data key encrypts the archive payload. It is generated randomly
/// when a file is created, wrapped under the access key for storage, and
/// kept in memory for the lifetime of the [`File`](crate::File).
///
/// # Security
///
/// - The key is zeroized on drop to prevent memory leaks.
/// - The key is never logged or serialized in plaintext.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DataKey([u8; DATA_KEY_LEN]);

impl DataKey {
    /// Creates a data key from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; DATA_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Generates a new random data key.
    ///
    /// # Panics
    ///
    /// Panics if the system's random number generator fails.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; DATA_KEY_LEN];
        getrandom::getrandom(&mut bytes).expect("getrandom failed");
        Self(bytes)
    }

    /// Returns a reference to the raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; DATA_KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for DataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataKey").field("key", &"[REDACTED]").finish()
    }
}

/// Generates a random nonce for XChaCha20-Poly1305.
///
/// # Panics
///
/// Panics if the system's random number generator fails.
fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    getrandom::getrandom(&mut nonce).expect("getrandom failed");
    nonce
}

/// Encrypts `plaintext` under `key`.
///
/// Returns `nonce ‖ ciphertext ‖ tag` with a fresh random nonce, so
/// encrypting identical input twice produces different bytes.
///
/// # Errors
///
/// Returns [`Error::CodecInit`] if `key` is not 32 bytes.
///
/// # Panics
///
/// This function will not panic; the `expect` is for a condition that
/// cannot fail (sealing an in-memory buffer).
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new_from_slice(key).map_err(|_| Error::CodecInit)?;
    let nonce_bytes = generate_nonce();
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce_bytes), plaintext)
        .expect("XChaCha20-Poly1305 seal of an in-memory buffer");

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypts a `nonce ‖ ciphertext ‖ tag` blob under `key`.
///
/// # Errors
///
/// Returns:
/// - [`Error::CodecInit`] if `key` is not 32 bytes
/// - [`Error::ShortInput`] if `blob` is smaller than a nonce
/// - [`Error::AuthFailed`] if tag verification fails (wrong key or
///   tampered data)
pub fn decrypt(key: &[u8], blob: &[u8]) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new_from_slice(key).map_err(|_| Error::CodecInit)?;
    if blob.len() < NONCE_LEN {
        return Err(Error::ShortInput);
    }
    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
    cipher
        .decrypt(XNonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| Error::AuthFailed)
}

/// Compresses `data` with the Snappy block format.
///
/// # Panics
///
/// Panics if compression fails, which cannot happen for an in-memory
/// buffer of valid length.
#[must_use]
pub fn compress(data: &[u8]) -> Vec<u8> {
    snap::raw::Encoder::new()
        .compress_vec(data)
        .expect("snappy block compression of an in-memory buffer")
}

/// Decompresses a Snappy block.
///
/// # Errors
///
/// Returns [`Error::CompressionFailed`] if `data` is not a valid Snappy
/// block.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    snap::raw::Decoder::new()
        .decompress_vec(data)
        .map_err(|err| Error::CompressionFailed(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [0x42u8; 32];

    #[test]
    fn test_data_key_generation() {
        let key1 = DataKey::generate();
        let key2 = DataKey::generate();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_data_key_debug_redacted() {
        let key = DataKey::from_bytes(KEY);
        let debug = format!("{key:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("66")); // no key bytes
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let plaintext = b"secret archive data";
        let blob = encrypt(&KEY, plaintext).expect("encrypt");

        // nonce + ciphertext + tag
        assert_eq!(blob.len(), NONCE_LEN + plaintext.len() + 16);
        assert_ne!(&blob[NONCE_LEN..NONCE_LEN + plaintext.len()], plaintext);

        let decrypted = decrypt(&KEY, &blob).expect("decrypt");
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_encrypt_fresh_nonce() {
        let blob1 = encrypt(&KEY, b"same input").expect("encrypt");
        let blob2 = encrypt(&KEY, b"same input").expect("encrypt");
        assert_ne!(blob1, blob2);
    }

    #[test]
    fn test_decrypt_wrong_key() {
        let blob = encrypt(&KEY, b"secret data").expect("encrypt");
        let result = decrypt(&[0x43u8; 32], &blob);
        assert!(matches!(result, Err(Error::AuthFailed)));
    }

    #[test]
    fn test_decrypt_tampered_ciphertext() {
        let mut blob = encrypt(&KEY, b"secret data").expect("encrypt");
        let last = blob.len() - 1;
        blob[last] ^= 0xFF;
        assert!(matches!(decrypt(&KEY, &blob), Err(Error::AuthFailed)));
    }

    #[test]
    fn test_decrypt_short_input() {
        let result = decrypt(&KEY, &[0u8; NONCE_LEN - 1]);
        assert!(matches!(result, Err(Error::ShortInput)));
    }

    #[test]
    fn test_bad_key_length() {
        assert!(matches!(encrypt(b"short", b"data"), Err(Error::CodecInit)));
        assert!(matches!(
            decrypt(b"short", &[0u8; 64]),
            Err(Error::CodecInit)
        ));
    }

    #[test]
    fn test_empty_plaintext() {
        let blob = encrypt(&KEY, b"").expect("encrypt");
        assert_eq!(blob.len(), NONCE_LEN + 16);
        assert!(decrypt(&KEY, &blob).expect("decrypt").is_empty());
    }

    #[test]
    fn test_compress_roundtrip() {
        let data = br#"{"log":[{"op":"create-table","tab":"test"}]}"#;
        let packed = compress(data);
        let unpacked = decompress(&packed).expect("decompress");
        assert_eq!(unpacked, data);
    }

    #[test]
    fn test_decompress_garbage() {
        let result = decompress(&[0xFFu8; 16]);
        assert!(matches!(result, Err(Error::CompressionFailed(_))));
    }
}
