//! Password entry state machine.
//!
//! An entry's secret is either ciphertext (state `ENCRYPTED`) or plaintext
//! (every other state), never both. The state is a sum type whose variants
//! carry only what is valid for them:
//!
//! ```text
//! ENCRYPTED --decrypt(key)--> DECRYPTED --update_secret--> MODIFIED
//!     ^                           |                           |
//!     +------- lock (cached) -----+                           |
//!     +------- lock(key) / prepare_for_save(key) -------------+
//!     +------- cancel ----------------------------------------+
//!
//! NEW --update_secret--> NEW --lock(key) / prepare_for_save(key)--> ENCRYPTED (pending)
//! ```
//!
//! A plaintext goes through the cipher at most once per edit: after a lock or
//! a save preparation the fresh ciphertext is kept as *pending* and reused
//! until the save is confirmed with [`PasswordEntry::mark_persisted`].
//!
//! The master key is passed to each operation and never stored.

use std::fmt;

use serde::{Deserialize, Serialize};
use strongbox_crypto_core::{CryptoError, MasterKey, Plaintext, SecretBlob, SecretCipher};
use tracing::{debug, warn};

use crate::api::{PasswordPayload, PasswordRecord};
use crate::error::VaultError;

// ---------------------------------------------------------------------------
// Identifiers and status
// ---------------------------------------------------------------------------

/// Identifier of a vault entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryId {
    /// Assigned by the server on first save.
    Persisted(i64),
    /// Client-generated placeholder (`new-…`) for an entry never saved.
    Temporary(String),
}

impl EntryId {
    /// Returns `true` for a client-generated placeholder.
    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }

    /// The server ID, if persisted.
    #[must_use]
    pub const fn persisted(&self) -> Option<i64> {
        match self {
            Self::Persisted(id) => Some(*id),
            Self::Temporary(_) => None,
        }
    }
}

impl From<i64> for EntryId {
    fn from(id: i64) -> Self {
        Self::Persisted(id)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Persisted(id) => write!(f, "{id}"),
            Self::Temporary(token) => f.write_str(token),
        }
    }
}

/// Encryption status of an entry, as shown by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStatus {
    /// Secret holds ciphertext.
    Encrypted,
    /// Secret decrypted for viewing, unchanged.
    Decrypted,
    /// Decrypted secret edited.
    Modified,
    /// Created on the client, secret is plaintext.
    New,
}

impl EntryStatus {
    /// Every status, in display order.
    pub const ALL: [Self; 4] = [Self::Encrypted, Self::Decrypted, Self::Modified, Self::New];

    /// Upper-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Encrypted => "ENCRYPTED",
            Self::Decrypted => "DECRYPTED",
            Self::Modified => "MODIFIED",
            Self::New => "NEW",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Metadata and secret state
// ---------------------------------------------------------------------------

/// Plaintext metadata of an entry. Never encrypted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryMetadata {
    /// What the credential is for.
    pub description: String,
    /// Account or user name.
    pub name: String,
    /// Login URL.
    pub link_url: String,
    /// ID of the CRM link record this credential belongs to.
    pub optional_link: Option<i64>,
}

/// Borrowed view of an entry's secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretView<'a> {
    /// State is `ENCRYPTED`.
    Ciphertext(&'a SecretBlob),
    /// Any other state.
    Plaintext(&'a str),
}

#[derive(Debug, Clone)]
enum SecretState {
    Encrypted {
        blob: SecretBlob,
        /// `blob` was sealed on the client and has not been confirmed saved.
        pending: bool,
    },
    Decrypted {
        plaintext: Plaintext,
        /// The ciphertext `plaintext` was opened from; restored by a cheap lock.
        sealed: SecretBlob,
        pending: bool,
    },
    Modified {
        plaintext: Plaintext,
    },
    New {
        plaintext: Plaintext,
    },
}

impl SecretState {
    const fn status(&self) -> EntryStatus {
        match self {
            Self::Encrypted { .. } => EntryStatus::Encrypted,
            Self::Decrypted { .. } => EntryStatus::Decrypted,
            Self::Modified { .. } => EntryStatus::Modified,
            Self::New { .. } => EntryStatus::New,
        }
    }
}

/// Last-known-persisted values.
#[derive(Debug, Clone, Default)]
struct Snapshot {
    /// `None` until the entry has been saved once.
    ciphertext: Option<SecretBlob>,
    metadata: EntryMetadata,
}

// ---------------------------------------------------------------------------
// PasswordEntry
// ---------------------------------------------------------------------------

/// One password-vault record and its encryption state.
#[derive(Debug, Clone)]
pub struct PasswordEntry {
    id: Option<EntryId>,
    metadata: EntryMetadata,
    original: Snapshot,
    state: SecretState,
}

impl PasswordEntry {
    /// A user-created entry in state `NEW`. The ID is assigned when the entry
    /// is added to a collection.
    #[must_use]
    pub fn create_new(metadata: EntryMetadata, secret: impl Into<Plaintext>) -> Self {
        Self {
            id: None,
            original: Snapshot {
                ciphertext: None,
                metadata: metadata.clone(),
            },
            metadata,
            state: SecretState::New {
                plaintext: secret.into(),
            },
        }
    }

    /// A persisted entry in state `ENCRYPTED`.
    #[must_use]
    pub fn encrypted(id: EntryId, metadata: EntryMetadata, ciphertext: SecretBlob) -> Self {
        Self {
            id: Some(id),
            original: Snapshot {
                ciphertext: Some(ciphertext.clone()),
                metadata: metadata.clone(),
            },
            metadata,
            state: SecretState::Encrypted {
                blob: ciphertext,
                pending: false,
            },
        }
    }

    /// Hydrate from a `GET /passwords` record. Missing fields become empty.
    #[must_use]
    pub fn from_record(record: PasswordRecord) -> Self {
        let metadata = EntryMetadata {
            description: record.descr.unwrap_or_default(),
            name: record.name.unwrap_or_default(),
            link_url: record.link_url.unwrap_or_default(),
            optional_link: record.opt_link_id,
        };
        Self::encrypted(
            EntryId::Persisted(record.id),
            metadata,
            record.passwd.unwrap_or_default(),
        )
    }

    /// Convert back to the `GET /passwords` record shape.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidState`] unless the entry is `ENCRYPTED`
    /// (a record must never carry plaintext), and
    /// [`VaultError::NotPersisted`] if the entry has no server ID.
    pub fn to_record(&self) -> Result<PasswordRecord, VaultError> {
        let SecretState::Encrypted { blob, .. } = &self.state else {
            return Err(self.invalid_state("export"));
        };
        let id = self
            .id
            .as_ref()
            .and_then(EntryId::persisted)
            .ok_or_else(|| VaultError::NotPersisted(self.id_label()))?;
        Ok(PasswordRecord {
            id,
            descr: Some(self.metadata.description.clone()),
            name: Some(self.metadata.name.clone()),
            passwd: Some(blob.clone()),
            opt_link_id: self.metadata.optional_link,
            link_url: Some(self.metadata.link_url.clone()),
        })
    }

    // -- accessors ---------------------------------------------------------

    /// The entry ID, once assigned.
    #[must_use]
    pub const fn id(&self) -> Option<&EntryId> {
        self.id.as_ref()
    }

    pub(crate) fn assign_id(&mut self, id: EntryId) {
        self.id = Some(id);
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> EntryStatus {
        self.state.status()
    }

    /// Current metadata.
    #[must_use]
    pub const fn metadata(&self) -> &EntryMetadata {
        &self.metadata
    }

    /// Description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.metadata.description
    }

    /// Account name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Login URL.
    #[must_use]
    pub fn link_url(&self) -> &str {
        &self.metadata.link_url
    }

    /// Linked CRM record.
    #[must_use]
    pub const fn optional_link(&self) -> Option<i64> {
        self.metadata.optional_link
    }

    /// The secret: ciphertext iff `ENCRYPTED`.
    #[must_use]
    pub fn secret(&self) -> SecretView<'_> {
        match &self.state {
            SecretState::Encrypted { blob, .. } => SecretView::Ciphertext(blob),
            SecretState::Decrypted { plaintext, .. }
            | SecretState::Modified { plaintext }
            | SecretState::New { plaintext } => SecretView::Plaintext(plaintext.expose()),
        }
    }

    /// The visible ciphertext, if `ENCRYPTED`.
    #[must_use]
    pub const fn ciphertext(&self) -> Option<&SecretBlob> {
        match &self.state {
            SecretState::Encrypted { blob, .. } => Some(blob),
            _ => None,
        }
    }

    /// The plaintext secret, if not `ENCRYPTED` (for display or clipboard).
    #[must_use]
    pub fn plaintext(&self) -> Option<&str> {
        match self.secret() {
            SecretView::Plaintext(text) => Some(text),
            SecretView::Ciphertext(_) => None,
        }
    }

    /// Ciphertext sealed on the client and not yet confirmed saved.
    #[must_use]
    pub const fn pending_ciphertext(&self) -> Option<&SecretBlob> {
        match &self.state {
            SecretState::Encrypted {
                blob,
                pending: true,
            }
            | SecretState::Decrypted {
                sealed: blob,
                pending: true,
                ..
            } => Some(blob),
            _ => None,
        }
    }

    /// Last persisted ciphertext; `None` if never saved.
    #[must_use]
    pub const fn original_ciphertext(&self) -> Option<&SecretBlob> {
        self.original.ciphertext.as_ref()
    }

    /// Last persisted metadata.
    #[must_use]
    pub const fn original_metadata(&self) -> &EntryMetadata {
        &self.original.metadata
    }

    // -- predicates --------------------------------------------------------

    /// State is `ENCRYPTED`.
    #[must_use]
    pub const fn is_encrypted(&self) -> bool {
        matches!(self.state, SecretState::Encrypted { .. })
    }

    /// State is `DECRYPTED` or `MODIFIED`.
    #[must_use]
    pub const fn is_decrypted(&self) -> bool {
        matches!(
            self.state,
            SecretState::Decrypted { .. } | SecretState::Modified { .. }
        )
    }

    /// State is `NEW`.
    #[must_use]
    pub const fn is_new(&self) -> bool {
        matches!(self.state, SecretState::New { .. })
    }

    /// Has a server-assigned ID.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.id.as_ref().and_then(EntryId::persisted).is_some()
    }

    /// `MODIFIED`, or any metadata field differs from the last saved value.
    /// Holds while `ENCRYPTED` too (metadata-only edits).
    #[must_use]
    pub fn is_modified(&self) -> bool {
        matches!(self.state, SecretState::Modified { .. })
            || self.metadata != self.original.metadata
    }

    // -- metadata edits ----------------------------------------------------

    /// Replace the description.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.metadata.description = description.into();
    }

    /// Replace the account name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.metadata.name = name.into();
    }

    /// Replace the login URL.
    pub fn set_link_url(&mut self, link_url: impl Into<String>) {
        self.metadata.link_url = link_url.into();
    }

    /// Replace the linked CRM record.
    pub fn set_optional_link(&mut self, optional_link: Option<i64>) {
        self.metadata.optional_link = optional_link;
    }

    // -- transitions -------------------------------------------------------

    /// Decrypt the secret for viewing: `ENCRYPTED` → `DECRYPTED`.
    ///
    /// On failure the entry is left untouched so the user can retry with a
    /// different key.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InvalidState`] if the entry is not `ENCRYPTED`
    /// - [`VaultError::Crypto`] with [`CryptoError::Decryption`] for a wrong
    ///   key, `MalformedCiphertext` for a corrupted blob, `InvalidKey` for an
    ///   empty key
    pub fn decrypt<C>(&mut self, cipher: &C, master_key: &MasterKey) -> Result<(), VaultError>
    where
        C: SecretCipher + ?Sized,
    {
        let SecretState::Encrypted { blob, pending } = &self.state else {
            return Err(self.invalid_state("decrypt"));
        };

        let plaintext = cipher.decrypt(blob, master_key)?;
        let sealed = blob.clone();
        let pending = *pending;
        self.state = SecretState::Decrypted {
            plaintext,
            sealed,
            pending,
        };
        debug!(entry_id = %self.id_label(), "entry decrypted");
        Ok(())
    }

    /// Replace the plaintext secret.
    ///
    /// `DECRYPTED` → `MODIFIED`; `MODIFIED` and `NEW` keep their state.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidState`] while `ENCRYPTED`: writing
    /// plaintext into a ciphertext slot would break the entry invariant.
    pub fn update_secret(&mut self, secret: impl Into<Plaintext>) -> Result<(), VaultError> {
        let plaintext = secret.into();
        self.state = match self.state {
            SecretState::Encrypted { .. } => {
                return Err(self.invalid_state("update the secret of"));
            }
            SecretState::New { .. } => SecretState::New { plaintext },
            SecretState::Decrypted { .. } | SecretState::Modified { .. } => {
                SecretState::Modified { plaintext }
            }
        };
        Ok(())
    }

    /// Return to `ENCRYPTED`.
    ///
    /// - `DECRYPTED`: restores the ciphertext it was opened from; the cipher
    ///   is not called and no key is needed.
    /// - `MODIFIED` / `NEW`: encrypts the secret once and keeps the result as
    ///   the pending ciphertext, so a later save reuses it.
    /// - `ENCRYPTED`: nothing to do.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Crypto`] with [`CryptoError::InvalidKey`] if encryption
    ///   is needed and `master_key` is missing or empty
    /// - [`VaultError::EmptySecret`] if encryption is needed and the secret is
    ///   empty
    pub fn lock<C>(&mut self, cipher: &C, master_key: Option<&MasterKey>) -> Result<(), VaultError>
    where
        C: SecretCipher + ?Sized,
    {
        match &self.state {
            SecretState::Encrypted { .. } => Ok(()),
            SecretState::Decrypted { .. } => self.lock_cached(),
            SecretState::Modified { plaintext } | SecretState::New { plaintext } => {
                if plaintext.is_empty() {
                    // Key check first: a missing key is the more actionable error.
                    require_key(master_key)?;
                    return Err(VaultError::EmptySecret);
                }
                self.seal(cipher, master_key).map(|_| ())
            }
        }
    }

    /// Cheap lock: `DECRYPTED` → `ENCRYPTED` with the cached ciphertext.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidState`] unless the entry is `DECRYPTED`.
    pub fn lock_cached(&mut self) -> Result<(), VaultError> {
        let SecretState::Decrypted {
            sealed, pending, ..
        } = &self.state
        else {
            return Err(self.invalid_state("lock without a key"));
        };

        let blob = sealed.clone();
        let pending = *pending;
        self.state = SecretState::Encrypted { blob, pending };
        debug!(entry_id = %self.id_label(), "entry locked from cache");
        Ok(())
    }

    /// Build the `POST`/`PUT` payload.
    ///
    /// - Pending ciphertext (already locked): reused, no key needed.
    /// - `ENCRYPTED` with no pending value (metadata-only edit): the existing
    ///   ciphertext is sent unchanged.
    /// - `DECRYPTED` (viewed, not edited): the ciphertext it was opened from.
    /// - `MODIFIED` / `NEW`: encrypted now, and the entry moves to `ENCRYPTED`
    ///   with that ciphertext pending, so preparing again does not re-encrypt.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Crypto`] with [`CryptoError::InvalidKey`] if
    /// encryption is needed and `master_key` is missing or empty.
    pub fn prepare_for_save<C>(
        &mut self,
        cipher: &C,
        master_key: Option<&MasterKey>,
    ) -> Result<PasswordPayload, VaultError>
    where
        C: SecretCipher + ?Sized,
    {
        let password = match &self.state {
            SecretState::Encrypted { blob, .. } => blob.clone(),
            SecretState::Decrypted { sealed, .. } => sealed.clone(),
            SecretState::Modified { .. } | SecretState::New { .. } => {
                self.seal(cipher, master_key)?
            }
        };
        Ok(PasswordPayload::new(&self.metadata, password))
    }

    /// Discard unsaved edits.
    ///
    /// A never-saved entry is reset to an empty `NEW` entry (the caller
    /// usually drops it). Otherwise the last saved ciphertext and metadata
    /// are restored and the state is `ENCRYPTED`.
    pub fn cancel(&mut self) {
        if let Some(blob) = self.original.ciphertext.clone() {
            self.metadata = self.original.metadata.clone();
            self.state = SecretState::Encrypted {
                blob,
                pending: false,
            };
        } else {
            self.metadata = EntryMetadata::default();
            self.original.metadata = EntryMetadata::default();
            self.state = SecretState::New {
                plaintext: Plaintext::default(),
            };
        }
        debug!(entry_id = %self.id_label(), "entry edits cancelled");
    }

    /// Record a confirmed save.
    ///
    /// The payload becomes the new original snapshot and a temporary ID is
    /// replaced by `server_id`. If the entry still holds the saved
    /// ciphertext it ends up `ENCRYPTED` with nothing pending.
    ///
    /// Edits made after the payload was prepared are kept and still count as
    /// unsaved: a plaintext edit (`MODIFIED`/`NEW`), or a newer pending
    /// ciphertext from a later lock.
    pub fn mark_persisted(&mut self, server_id: i64, payload: &PasswordPayload) {
        self.id = Some(EntryId::Persisted(server_id));
        self.original = Snapshot {
            ciphertext: Some(payload.password.clone()),
            metadata: payload.to_metadata(),
        };

        let newer_edit = match &self.state {
            SecretState::Encrypted { blob, pending }
            | SecretState::Decrypted {
                sealed: blob,
                pending,
                ..
            } => *pending && *blob != payload.password,
            SecretState::Modified { .. } | SecretState::New { .. } => true,
        };
        if newer_edit {
            debug!(entry_id = server_id, "save confirmed, newer edit kept");
        } else {
            self.state = SecretState::Encrypted {
                blob: payload.password.clone(),
                pending: false,
            };
            debug!(entry_id = server_id, "entry save confirmed");
        }
    }

    // -- internals ---------------------------------------------------------

    /// Encrypt the current plaintext once and move to `ENCRYPTED` (pending).
    fn seal<C>(
        &mut self,
        cipher: &C,
        master_key: Option<&MasterKey>,
    ) -> Result<SecretBlob, VaultError>
    where
        C: SecretCipher + ?Sized,
    {
        let master_key = require_key(master_key)?;
        let blob = match &self.state {
            SecretState::Modified { plaintext } | SecretState::New { plaintext } => {
                cipher.encrypt(plaintext.expose(), master_key)?
            }
            SecretState::Encrypted { .. } | SecretState::Decrypted { .. } => {
                return Err(self.invalid_state("encrypt"));
            }
        };
        self.state = SecretState::Encrypted {
            blob: blob.clone(),
            pending: true,
        };
        debug!(entry_id = %self.id_label(), "entry sealed, ciphertext pending");
        Ok(blob)
    }

    fn invalid_state(&self, operation: &'static str) -> VaultError {
        let state = self.status();
        warn!(entry_id = %self.id_label(), %state, operation, "invalid entry transition");
        VaultError::InvalidState { operation, state }
    }

    pub(crate) fn id_label(&self) -> String {
        self.id
            .as_ref()
            .map_or_else(|| "<unassigned>".to_owned(), ToString::to_string)
    }
}

fn require_key(master_key: Option<&MasterKey>) -> Result<&MasterKey, VaultError> {
    let master_key = master_key.ok_or(CryptoError::InvalidKey)?;
    Ok(master_key.require_non_empty()?)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
