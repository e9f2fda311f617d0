//! Secret Blob framing.
//!
//! Wire format (base64, standard alphabet, padded):
//!
//! ```text
//! IV (16 bytes) || AES-256-CBC-PKCS7( salt (16 bytes) || UTF-8 plaintext )
//! ```
//!
//! This layout is shared with every client that has ever written a vault
//! record and must stay bit-exact.

use std::fmt;

use data_encoding::BASE64;
use serde::{Deserialize, Serialize};

use crate::backend::BLOCK_LEN;
use crate::error::CryptoError;

/// IV length in bytes.
pub const IV_LEN: usize = 16;

/// Length of the random salt prepended to the plaintext before encryption.
pub const SALT_LEN: usize = 16;

/// Minimum decoded blob length: IV + one ciphertext block.
pub const MIN_BLOB_LEN: usize = IV_LEN + BLOCK_LEN;

// ---------------------------------------------------------------------------
// SecretBlob
// ---------------------------------------------------------------------------

/// A persisted, base64-encoded ciphertext.
///
/// Opaque to everything except the engine. Serializes as a bare string so it
/// drops straight into the REST records.
#[must_use = "encrypted data must be stored or transmitted"]
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretBlob(String);

impl SecretBlob {
    /// Wrap a base64 string as received from storage. No validation happens
    /// here; a malformed blob fails at decrypt time.
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// The base64 text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the empty string (a record that never held a secret).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode into IV and ciphertext.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::MalformedCiphertext`] if the text is not valid
    /// base64 or the decoded bytes are not a valid layout.
    pub fn decode(&self) -> Result<BlobParts, CryptoError> {
        let bytes = BASE64
            .decode(self.0.as_bytes())
            .map_err(|e| CryptoError::MalformedCiphertext(format!("invalid base64: {e}")))?;
        BlobParts::from_bytes(&bytes)
    }
}

impl From<String> for SecretBlob {
    fn from(encoded: String) -> Self {
        Self(encoded)
    }
}

impl From<&str> for SecretBlob {
    fn from(encoded: &str) -> Self {
        Self(encoded.to_owned())
    }
}

impl fmt::Debug for SecretBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Ciphertext is not secret, but it is long and useless in logs.
        write!(f, "SecretBlob({} chars)", self.0.len())
    }
}

impl fmt::Display for SecretBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// BlobParts
// ---------------------------------------------------------------------------

/// The decoded byte layout of a [`SecretBlob`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobParts {
    /// CBC initialization vector, random per encryption.
    pub iv: [u8; IV_LEN],
    /// Block-aligned ciphertext of `salt || plaintext`.
    pub ciphertext: Vec<u8>,
}

impl BlobParts {
    /// Serialize to `iv || ciphertext`.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(IV_LEN.saturating_add(self.ciphertext.len()));
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Parse `iv || ciphertext`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::MalformedCiphertext`] if the input is shorter
    /// than [`MIN_BLOB_LEN`] or the ciphertext is not block-aligned.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() < MIN_BLOB_LEN {
            return Err(CryptoError::MalformedCiphertext(format!(
                "blob too short: {} bytes (minimum {MIN_BLOB_LEN})",
                bytes.len()
            )));
        }

        let (iv_bytes, ciphertext) = bytes.split_at(IV_LEN);
        if ciphertext.len().checked_rem(BLOCK_LEN) != Some(0) {
            return Err(CryptoError::MalformedCiphertext(format!(
                "ciphertext length {} is not a multiple of {BLOCK_LEN}",
                ciphertext.len()
            )));
        }

        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(iv_bytes);
        Ok(Self {
            iv,
            ciphertext: ciphertext.to_vec(),
        })
    }

    /// Encode as a [`SecretBlob`].
    pub fn encode(&self) -> SecretBlob {
        SecretBlob(BASE64.encode(&self.to_bytes()))
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_encode_decode_roundtrip() {
        let parts = BlobParts {
            iv: [9u8; IV_LEN],
            ciphertext: vec![1u8; 32],
        };
        let blob = parts.encode();
        assert_eq!(blob.decode().unwrap(), parts);
        assert_eq!(blob.as_str().len(), 64);
    }

    #[test]
    fn decode_rejects_invalid_base64() {
        let result = SecretBlob::new("not base64 at all!").decode();
        assert!(matches!(result, Err(CryptoError::MalformedCiphertext(_))));
    }

    #[test]
    fn decode_rejects_short_blob() {
        let short = BASE64.encode(&[0u8; 31]);
        let result = SecretBlob::new(short).decode();
        let err = result.unwrap_err();
        assert!(err.to_string().contains("too short"), "{err}");
    }

    #[test]
    fn decode_rejects_unaligned_ciphertext() {
        let unaligned = BASE64.encode(&[0u8; 40]);
        let result = SecretBlob::new(unaligned).decode();
        assert!(matches!(result, Err(CryptoError::MalformedCiphertext(_))));
    }

    #[test]
    fn empty_blob_is_malformed() {
        let blob = SecretBlob::default();
        assert!(blob.is_empty());
        assert!(matches!(
            blob.decode(),
            Err(CryptoError::MalformedCiphertext(_))
        ));
    }

    #[test]
    fn serde_is_transparent_string() {
        let blob = SecretBlob::new("AAAA");
        assert_eq!(serde_json::to_string(&blob).unwrap(), "\"AAAA\"");
        let back: SecretBlob = serde_json::from_str("\"AAAA\"").unwrap();
        assert_eq!(back, blob);
    }

    #[test]
    fn debug_does_not_print_contents() {
        let blob = SecretBlob::new("QUJDRA==");
        assert_eq!(format!("{blob:?}"), "SecretBlob(8 chars)");
    }
}
