//! Wire shapes exchanged with the CRM password endpoints.
//!
//! Records arrive from `GET /passwords`; payloads are sent with
//! `POST /passwords` and `PUT /passwords/{id}`. Neither ever carries a
//! plaintext secret or the master key.

use serde::{Deserialize, Serialize};
use strongbox_crypto_core::SecretBlob;

use crate::entry::{EntryMetadata, PasswordEntry};

/// One row of `GET /passwords`. Every field except `id` may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordRecord {
    /// Server ID.
    pub id: i64,
    /// Description.
    #[serde(default)]
    pub descr: Option<String>,
    /// Account name.
    #[serde(default)]
    pub name: Option<String>,
    /// Secret Blob.
    #[serde(default)]
    pub passwd: Option<SecretBlob>,
    /// Linked CRM record.
    #[serde(default)]
    pub opt_link_id: Option<i64>,
    /// Login URL.
    #[serde(default)]
    pub link_url: Option<String>,
}

impl From<PasswordRecord> for PasswordEntry {
    fn from(record: PasswordRecord) -> Self {
        Self::from_record(record)
    }
}

/// Body of a create or update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordPayload {
    /// Description.
    pub description: String,
    /// Account name.
    pub name: String,
    /// Always ciphertext.
    pub password: SecretBlob,
    /// Linked CRM record.
    pub optional_link: Option<i64>,
    /// `null` when the entry has no URL.
    pub link_url: Option<String>,
}

impl PasswordPayload {
    /// Payload for `metadata` with an already-sealed secret.
    #[must_use]
    pub fn new(metadata: &EntryMetadata, password: SecretBlob) -> Self {
        Self {
            description: metadata.description.clone(),
            name: metadata.name.clone(),
            password,
            optional_link: metadata.optional_link,
            link_url: (!metadata.link_url.is_empty()).then(|| metadata.link_url.clone()),
        }
    }

    /// The metadata this payload saves.
    #[must_use]
    pub fn to_metadata(&self) -> EntryMetadata {
        EntryMetadata {
            description: self.description.clone(),
            name: self.name.clone(),
            link_url: self.link_url.clone().unwrap_or_default(),
            optional_link: self.optional_link,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntryId, EntryStatus};

    #[test]
    fn record_parses_sparse_row() {
        let record: PasswordRecord = serde_json::from_str(r#"{"id": 3, "descr": "Mail"}"#).unwrap();
        assert_eq!(record.id, 3);
        assert_eq!(record.descr.as_deref(), Some("Mail"));
        assert!(record.passwd.is_none());

        let entry = PasswordEntry::from(record);
        assert_eq!(entry.id(), Some(&EntryId::Persisted(3)));
        assert_eq!(entry.status(), EntryStatus::Encrypted);
        assert_eq!(entry.name(), "");
        assert_eq!(entry.ciphertext().map(SecretBlob::as_str), Some(""));
    }

    #[test]
    fn record_uses_wire_field_names() {
        let json = r#"{"id":1,"descr":"d","name":"n","passwd":"QUJD","optLinkId":9,"linkUrl":"https://x"}"#;
        let record: PasswordRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.opt_link_id, Some(9));
        assert_eq!(record.link_url.as_deref(), Some("https://x"));
        assert_eq!(record.passwd.as_ref().map(SecretBlob::as_str), Some("QUJD"));
    }

    #[test]
    fn payload_serializes_empty_url_as_null() {
        let metadata = EntryMetadata {
            description: "Bank".into(),
            name: "alice".into(),
            link_url: String::new(),
            optional_link: None,
        };
        let payload = PasswordPayload::new(&metadata, SecretBlob::new("QUJD"));
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["linkUrl"], serde_json::Value::Null);
        assert_eq!(value["optionalLink"], serde_json::Value::Null);
        assert_eq!(value["password"], "QUJD");
        assert_eq!(payload.to_metadata(), metadata);
    }
}
