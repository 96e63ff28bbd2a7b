//! Wire format constants.

/// Required length in bytes of an access key.
pub const ACCESS_KEY_LEN: usize = 32;

/// Length in bytes of the per-file data key.
pub const DATA_KEY_LEN: usize = 32;

/// Size of an XChaCha20-Poly1305 nonce in bytes.
pub const NONCE_LEN: usize = 24;

/// Size of a Poly1305 authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Size of the wrapped data key stored in the envelope: nonce ‖ key ‖ tag.
pub const WRAPPED_KEY_LEN: usize = NONCE_LEN + DATA_KEY_LEN + TAG_LEN;

/// File format version understood by this crate.
pub const FORMAT_VERSION: i64 = 1;
