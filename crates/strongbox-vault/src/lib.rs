//! `strongbox-vault` — Password entries and their encryption lifecycle.
//!
//! Each [`PasswordEntry`] moves between `ENCRYPTED`, `DECRYPTED`,
//! `MODIFIED` and `NEW`, encrypting through a
//! [`strongbox_crypto_core::SecretCipher`]. [`PasswordCollection`] holds the
//! user's entries and runs bulk decrypt and lock.
//!
//! The master key is borrowed per call and never stored here.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod api;
pub mod collection;
pub mod entry;
pub mod error;
pub mod preferences;

pub use api::{PasswordPayload, PasswordRecord};
pub use collection::{DecryptSummary, PasswordCollection, StateCounts, DEFAULT_TEMP_ID_PREFIX};
pub use entry::{EntryId, EntryMetadata, EntryStatus, PasswordEntry, SecretView};
pub use error::VaultError;
pub use preferences::VaultPreferences;
