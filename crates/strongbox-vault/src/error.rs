//! Vault error types for `strongbox-vault`.

use strongbox_crypto_core::CryptoError;
use thiserror::Error;

use crate::entry::EntryStatus;

/// Errors produced by entry and collection operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Cryptographic operation failed (delegated from crypto-core).
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Operation not permitted in the entry's current state. A caller
    /// contract violation; the UI should never trigger it.
    #[error("cannot {operation} an entry in state {state}")]
    InvalidState {
        /// The attempted operation.
        operation: &'static str,
        /// The state the entry was in.
        state: EntryStatus,
    },

    /// Locking requires a non-empty secret.
    #[error("cannot lock an empty secret")]
    EmptySecret,

    /// Entry not found by ID.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// Entry still carries a temporary ID; it has never been saved.
    #[error("entry {0} has not been saved")]
    NotPersisted(String),

    /// Preferences file could not be encoded.
    #[error("preferences error: {0}")]
    Preferences(String),

    /// I/O error from the filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VaultError {
    /// `true` when the master key was wrong (or the record is corrupted).
    /// The UI answers with "incorrect master password" and lets the user retry.
    #[must_use]
    pub const fn is_wrong_password(&self) -> bool {
        matches!(self, Self::Crypto(CryptoError::Decryption))
    }

    /// `true` when a master key was required but missing or empty.
    #[must_use]
    pub const fn is_invalid_key(&self) -> bool {
        matches!(self, Self::Crypto(CryptoError::InvalidKey))
    }
}
