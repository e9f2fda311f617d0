//! Master-key derivation.
//!
//! The AES key is the single-round SHA-256 digest of the master key's UTF-8
//! bytes. There is no salt and no work factor: every blob already persisted
//! by the vault was produced this way, so changing the derivation would make
//! those records undecryptable. A slow KDF (Argon2id) needs a versioned blob
//! format first.

use ring::digest;

use crate::error::CryptoError;
use crate::memory::{MasterKey, SecretBytes};

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// Derive the 256-bit AES key from the master key.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKey`] if the master key is empty.
pub fn derive_key(master_key: &MasterKey) -> Result<SecretBytes<KEY_LEN>, CryptoError> {
    let master_key = master_key.require_non_empty()?;
    let hash = digest::digest(&digest::SHA256, master_key.expose());

    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(hash.as_ref());
    Ok(SecretBytes::new(key))
}
