//! Ordered collection of password entries.
//!
//! Entries keep their insertion order. Never-saved entries receive a
//! temporary `"{prefix}-{uuid}"` ID on insertion, replaced by the server ID
//! once a save is confirmed.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;
use strongbox_crypto_core::{MasterKey, SecretCipher};
use tracing::{debug, info, warn};

use crate::api::{PasswordPayload, PasswordRecord};
use crate::entry::{EntryId, EntryStatus, PasswordEntry};
use crate::error::VaultError;
use crate::preferences::VaultPreferences;

/// Default prefix for temporary entry IDs.
pub const DEFAULT_TEMP_ID_PREFIX: &str = "new";

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

/// Outcome of [`PasswordCollection::decrypt_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecryptSummary {
    /// Entries now `DECRYPTED`.
    pub succeeded: usize,
    /// Entries left `ENCRYPTED` after a failed decrypt.
    pub failed: usize,
}

/// Number of entries in each [`EntryStatus`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateCounts {
    /// Entries in `ENCRYPTED`.
    pub encrypted: usize,
    /// Entries in `DECRYPTED`.
    pub decrypted: usize,
    /// Entries in `MODIFIED`.
    pub modified: usize,
    /// Entries in `NEW`.
    pub new: usize,
}

impl StateCounts {
    /// Count for one status.
    #[must_use]
    pub const fn get(&self, status: EntryStatus) -> usize {
        match status {
            EntryStatus::Encrypted => self.encrypted,
            EntryStatus::Decrypted => self.decrypted,
            EntryStatus::Modified => self.modified,
            EntryStatus::New => self.new,
        }
    }

    /// Sum over all statuses.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.encrypted
            .saturating_add(self.decrypted)
            .saturating_add(self.modified)
            .saturating_add(self.new)
    }

    fn bump(&mut self, status: EntryStatus) {
        let slot = match status {
            EntryStatus::Encrypted => &mut self.encrypted,
            EntryStatus::Decrypted => &mut self.decrypted,
            EntryStatus::Modified => &mut self.modified,
            EntryStatus::New => &mut self.new,
        };
        *slot = slot.saturating_add(1);
    }
}

// ---------------------------------------------------------------------------
// PasswordCollection
// ---------------------------------------------------------------------------

/// The user's password entries, keyed by [`EntryId`].
#[derive(Debug, Clone)]
pub struct PasswordCollection {
    entries: Vec<PasswordEntry>,
    temp_id_prefix: String,
}

impl Default for PasswordCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordCollection {
    /// Empty collection with the default temporary-ID prefix.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            temp_id_prefix: DEFAULT_TEMP_ID_PREFIX.to_owned(),
        }
    }

    /// Empty collection configured from `prefs`.
    #[must_use]
    pub fn with_preferences(prefs: &VaultPreferences) -> Self {
        Self {
            entries: Vec::new(),
            temp_id_prefix: prefs.temp_id_prefix.clone(),
        }
    }

    /// Replace the contents with entries hydrated from server records.
    /// Returns the number of entries loaded.
    pub fn load_from_records<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = PasswordRecord>,
    {
        self.entries.clear();
        for record in records {
            self.add(PasswordEntry::from_record(record));
        }
        debug!(count = self.entries.len(), "collection loaded from records");
        self.entries.len()
    }

    /// Insert `entry`, assigning a temporary ID if it has none. An entry with
    /// the same ID is replaced in place. Returns the entry's ID.
    pub fn add(&mut self, mut entry: PasswordEntry) -> EntryId {
        let id = if let Some(id) = entry.id() {
            id.clone()
        } else {
            let id = EntryId::Temporary(self.generate_temp_id());
            entry.assign_id(id.clone());
            id
        };

        if let Some(pos) = self.position(&id) {
            self.entries[pos] = entry;
            debug!(entry_id = %id, "entry replaced");
        } else {
            self.entries.push(entry);
        }
        id
    }

    /// Remove and return the entry with `id`.
    pub fn remove(&mut self, id: &EntryId) -> Option<PasswordEntry> {
        let pos = self.position(id)?;
        Some(self.entries.remove(pos))
    }

    /// Look up an entry.
    #[must_use]
    pub fn get(&self, id: &EntryId) -> Option<&PasswordEntry> {
        self.entries.iter().find(|e| e.id() == Some(id))
    }

    /// Look up an entry for editing.
    pub fn get_mut(&mut self, id: &EntryId) -> Option<&mut PasswordEntry> {
        self.entries.iter_mut().find(|e| e.id() == Some(id))
    }

    /// All entries in insertion order.
    #[must_use]
    pub fn get_all(&self) -> &[PasswordEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &PasswordEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in `status`, in insertion order.
    #[must_use]
    pub fn by_state(&self, status: EntryStatus) -> Vec<&PasswordEntry> {
        self.entries.iter().filter(|e| e.status() == status).collect()
    }

    /// Case-insensitive substring match on description, name and URL.
    /// An empty query matches everything.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&PasswordEntry> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.entries.iter().collect();
        }
        self.entries
            .iter()
            .filter(|e| {
                [e.description(), e.name(), e.link_url()]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Decrypt every `ENCRYPTED` entry.
    ///
    /// Failures are counted and logged, never raised: one corrupted record
    /// must not block access to the others. Failed entries stay `ENCRYPTED`.
    pub fn decrypt_all<C>(&mut self, cipher: &C, master_key: &MasterKey) -> DecryptSummary
    where
        C: SecretCipher + ?Sized,
    {
        let mut summary = DecryptSummary::default();
        for entry in self.entries.iter_mut().filter(|e| e.is_encrypted()) {
            match entry.decrypt(cipher, master_key) {
                Ok(()) => summary.succeeded = summary.succeeded.saturating_add(1),
                Err(err) => {
                    warn!(entry_id = %entry.id_label(), error = %err, "failed to decrypt entry");
                    summary.failed = summary.failed.saturating_add(1);
                }
            }
        }
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "bulk decrypt finished"
        );
        summary
    }

    /// Cheap-lock every `DECRYPTED` entry back to its cached ciphertext.
    /// `MODIFIED` and `NEW` entries are left alone. Returns how many were
    /// locked.
    pub fn lock_all(&mut self) -> usize {
        let mut locked = 0usize;
        for entry in self.entries.iter_mut().filter(|e| e.status() == EntryStatus::Decrypted) {
            if entry.lock_cached().is_ok() {
                locked = locked.saturating_add(1);
            }
        }
        debug!(locked, "bulk lock finished");
        locked
    }

    /// Count entries per status. The counts always sum to [`Self::len`].
    #[must_use]
    pub fn state_counts(&self) -> StateCounts {
        let mut counts = StateCounts::default();
        for entry in &self.entries {
            counts.bump(entry.status());
        }
        counts
    }

    /// `true` if any entry is `NEW`, modified, or holds a ciphertext that
    /// has not been confirmed saved.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.is_new() || e.is_modified() || e.pending_ciphertext().is_some())
    }

    /// Record a confirmed save of the entry `id` under `server_id`.
    ///
    /// A temporary ID is replaced by the server ID. A stale entry already
    /// holding `server_id` is dropped so IDs stay unique.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::EntryNotFound`] if no entry has `id`.
    pub fn confirm_saved(
        &mut self,
        id: &EntryId,
        server_id: i64,
        payload: &PasswordPayload,
    ) -> Result<(), VaultError> {
        let pos = self
            .position(id)
            .ok_or_else(|| VaultError::EntryNotFound(id.to_string()))?;
        self.entries[pos].mark_persisted(server_id, payload);

        let saved = EntryId::Persisted(server_id);
        if *id != saved {
            let before = self.entries.len();
            let mut index = 0usize;
            self.entries.retain(|e| {
                let keep = index == pos || e.id() != Some(&saved);
                index = index.saturating_add(1);
                keep
            });
            if self.entries.len() != before {
                warn!(entry_id = server_id, "dropped stale entry sharing the saved ID");
            }
        }
        Ok(())
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn position(&self, id: &EntryId) -> Option<usize> {
        self.entries.iter().position(|e| e.id() == Some(id))
    }

    fn generate_temp_id(&self) -> String {
        format!("{}-{}", self.temp_id_prefix, generate_uuid())
    }
}

impl<'a> IntoIterator for &'a PasswordCollection {
    type Item = &'a PasswordEntry;
    type IntoIter = std::slice::Iter<'a, PasswordEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Random RFC 4122 version 4 UUID in hyphenated lower-case form.
fn generate_uuid() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);

    bytes[6] = (bytes[6] & 0x0F) | 0x40; // version 4
    bytes[8] = (bytes[8] & 0x3F) | 0x80; // variant 1

    let hex = data_encoding::HEXLOWER.encode(&bytes);
    format!(
        "{}-{}-{}-{}-{}",
        &hex[..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryMetadata;
    use strongbox_crypto_core::{encrypt, Engine, SecretBlob};

    fn record(id: i64, descr: &str, passwd: SecretBlob) -> PasswordRecord {
        PasswordRecord {
            id,
            descr: Some(descr.to_owned()),
            name: Some("user".to_owned()),
            passwd: Some(passwd),
            opt_link_id: None,
            link_url: None,
        }
    }

    #[test]
    fn generate_uuid_format() {
        let uuid = generate_uuid();
        assert_eq!(uuid.len(), 36);
        assert_eq!(uuid.chars().nth(8), Some('-'));
        assert_eq!(uuid.chars().nth(14), Some('4'));
        let variant = uuid.chars().nth(19).unwrap();
        assert!(['8', '9', 'a', 'b'].contains(&variant));
    }

    #[test]
    fn add_assigns_unique_temporary_ids() {
        let mut collection = PasswordCollection::new();
        let a = collection.add(PasswordEntry::create_new(EntryMetadata::default(), "x"));
        let b = collection.add(PasswordEntry::create_new(EntryMetadata::default(), "y"));
        assert_ne!(a, b);
        assert!(a.is_temporary());
        assert!(a.to_string().starts_with("new-"));
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn add_replaces_same_id_in_place() {
        let key = MasterKey::new("k");
        let mut collection = PasswordCollection::new();
        collection.load_from_records(vec![
            record(1, "one", encrypt("a", &key).unwrap()),
            record(2, "two", encrypt("b", &key).unwrap()),
        ]);
        collection.add(PasswordEntry::from_record(record(
            1,
            "uno",
            encrypt("a", &key).unwrap(),
        )));
        let names: Vec<_> = collection.iter().map(PasswordEntry::description).collect();
        assert_eq!(names, ["uno", "two"]);
    }

    #[test]
    fn search_matches_any_text_field() {
        let mut collection = PasswordCollection::new();
        collection.load_from_records(vec![
            record(1, "Bank account", SecretBlob::default()),
            record(2, "Mail", SecretBlob::default()),
        ]);
        assert_eq!(collection.search("BANK").len(), 1);
        assert_eq!(collection.search("user").len(), 2);
        assert_eq!(collection.search("").len(), 2);
        assert!(collection.search("nothing").is_empty());
    }

    #[test]
    fn temp_prefix_comes_from_preferences() {
        let prefs = VaultPreferences {
            temp_id_prefix: "draft".to_owned(),
            ..VaultPreferences::default()
        };
        let mut collection = PasswordCollection::with_preferences(&prefs);
        let id = collection.add(PasswordEntry::create_new(EntryMetadata::default(), "x"));
        assert!(id.to_string().starts_with("draft-"));
    }

    #[test]
    fn confirm_saved_rekeys_entry() {
        let key = MasterKey::new("k");
        let engine = Engine::default();
        let mut collection = PasswordCollection::new();
        let temp = collection.add(PasswordEntry::create_new(EntryMetadata::default(), "pw"));

        let payload = collection
            .get_mut(&temp)
            .unwrap()
            .prepare_for_save(&engine, Some(&key))
            .unwrap();
        collection.confirm_saved(&temp, 77, &payload).unwrap();

        assert!(collection.get(&temp).is_none());
        let saved = collection.get(&EntryId::Persisted(77)).unwrap();
        assert!(saved.is_encrypted());
        assert!(!collection.has_unsaved_changes());
    }

    #[test]
    fn confirm_saved_unknown_id() {
        let mut collection = PasswordCollection::new();
        let payload = PasswordPayload::new(&EntryMetadata::default(), SecretBlob::default());
        let err = collection
            .confirm_saved(&EntryId::Persisted(1), 1, &payload)
            .unwrap_err();
        assert!(matches!(err, VaultError::EntryNotFound(_)));
    }

    #[test]
    fn state_counts_total_matches_len() {
        let mut collection = PasswordCollection::new();
        collection.add(PasswordEntry::create_new(EntryMetadata::default(), "x"));
        collection.load_from_records(Vec::new());
        assert_eq!(collection.state_counts().total(), 0);
        collection.add(PasswordEntry::create_new(EntryMetadata::default(), "x"));
        let counts = collection.state_counts();
        assert_eq!(counts.get(EntryStatus::New), 1);
        assert_eq!(counts.total(), collection.len());
    }
}
