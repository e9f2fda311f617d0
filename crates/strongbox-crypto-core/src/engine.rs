//! Salted AES-256-CBC secret engine.
//!
//! This module provides:
//! - [`encrypt`] / [`decrypt`]: seal and open a secret with the default back-end
//! - [`encrypt_with`] / [`decrypt_with`]: the same with an explicit [`CbcBackend`]
//! - [`verify_master_key`]: trial decryption as a key check
//! - [`SecretCipher`]: the seam the entry state machine encrypts through
//! - [`Engine`]: a [`SecretCipher`] bound to a [`BackendKind`]
//!
//! There is no authentication tag. A wrong master key is detected only by the
//! PKCS#7 padding check and the UTF-8 check on the recovered text; a random
//! key passes both with low but non-zero probability.

use zeroize::Zeroizing;

use crate::backend::{BackendKind, CbcBackend};
use crate::blob::{BlobParts, SecretBlob, IV_LEN, SALT_LEN};
use crate::error::CryptoError;
use crate::kdf::derive_key;
use crate::memory::{MasterKey, Plaintext, SecretBytes};

// ---------------------------------------------------------------------------
// SecretCipher
// ---------------------------------------------------------------------------

/// Encrypts and decrypts vault secrets under a master key.
pub trait SecretCipher {
    /// Seal `plaintext` into a fresh [`SecretBlob`].
    ///
    /// # Errors
    ///
    /// See [`encrypt`].
    fn encrypt(&self, plaintext: &str, master_key: &MasterKey) -> Result<SecretBlob, CryptoError>;

    /// Open a [`SecretBlob`].
    ///
    /// # Errors
    ///
    /// See [`decrypt`].
    fn decrypt(&self, blob: &SecretBlob, master_key: &MasterKey) -> Result<Plaintext, CryptoError>;
}

/// The production [`SecretCipher`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Engine {
    backend: BackendKind,
}

impl Engine {
    /// Engine over the given back-end.
    #[must_use]
    pub const fn new(backend: BackendKind) -> Self {
        Self { backend }
    }

    /// The selected back-end.
    #[must_use]
    pub const fn backend(&self) -> BackendKind {
        self.backend
    }
}

impl SecretCipher for Engine {
    fn encrypt(&self, plaintext: &str, master_key: &MasterKey) -> Result<SecretBlob, CryptoError> {
        encrypt_with(self.backend.backend(), plaintext, master_key)
    }

    fn decrypt(&self, blob: &SecretBlob, master_key: &MasterKey) -> Result<Plaintext, CryptoError> {
        decrypt_with(self.backend.backend(), blob, master_key)
    }
}

// ---------------------------------------------------------------------------
// Core encryption
// ---------------------------------------------------------------------------

/// Encrypt `plaintext` under `master_key` with the default back-end.
///
/// A fresh random salt and IV are drawn on every call, so encrypting the same
/// plaintext twice yields different blobs.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKey`] if the master key is empty,
/// [`CryptoError::RandomSource`] if the CSPRNG fails.
pub fn encrypt(plaintext: &str, master_key: &MasterKey) -> Result<SecretBlob, CryptoError> {
    encrypt_with(BackendKind::default().backend(), plaintext, master_key)
}

/// Encrypt with an explicit back-end.
///
/// # Errors
///
/// See [`encrypt`]; additionally [`CryptoError::Encryption`] if the
/// back-end fails.
pub fn encrypt_with(
    backend: &dyn CbcBackend,
    plaintext: &str,
    master_key: &MasterKey,
) -> Result<SecretBlob, CryptoError> {
    let key = derive_key(master_key)?;
    let salt = SecretBytes::<SALT_LEN>::random()?;
    let iv = SecretBytes::<IV_LEN>::random()?;
    seal(backend, &key, salt.expose(), iv.expose(), plaintext)
}

/// Build the blob from explicit salt and IV.
fn seal(
    backend: &dyn CbcBackend,
    key: &SecretBytes<32>,
    salt: &[u8; SALT_LEN],
    iv: &[u8; IV_LEN],
    plaintext: &str,
) -> Result<SecretBlob, CryptoError> {
    let mut salted = Zeroizing::new(Vec::with_capacity(SALT_LEN.saturating_add(plaintext.len())));
    salted.extend_from_slice(salt);
    salted.extend_from_slice(plaintext.as_bytes());

    let ciphertext = backend.encrypt(key.expose(), iv, &salted)?;
    Ok(BlobParts {
        iv: *iv,
        ciphertext,
    }
    .encode())
}

/// Decrypt `blob` under `master_key` with the default back-end.
///
/// # Errors
///
/// - [`CryptoError::InvalidKey`] if the master key is empty
/// - [`CryptoError::MalformedCiphertext`] if the blob is not base64, is shorter
///   than 32 bytes, or is not block-aligned
/// - [`CryptoError::Decryption`] on a padding failure, a payload shorter than
///   the salt, or non-UTF-8 text (wrong key or corrupted record)
pub fn decrypt(blob: &SecretBlob, master_key: &MasterKey) -> Result<Plaintext, CryptoError> {
    decrypt_with(BackendKind::default().backend(), blob, master_key)
}

/// Decrypt with an explicit back-end.
///
/// # Errors
///
/// See [`decrypt`].
pub fn decrypt_with(
    backend: &dyn CbcBackend,
    blob: &SecretBlob,
    master_key: &MasterKey,
) -> Result<Plaintext, CryptoError> {
    let key = derive_key(master_key)?;
    let parts = blob.decode()?;

    let salted = backend.decrypt(key.expose(), &parts.iv, &parts.ciphertext)?;
    let text = salted.get(SALT_LEN..).ok_or(CryptoError::Decryption)?;
    let text = std::str::from_utf8(text).map_err(|_| CryptoError::Decryption)?;
    Ok(Plaintext::new(text))
}

/// Returns `true` if `master_key` opens `blob`.
///
/// Subject to the same rare false accepts as [`decrypt`].
#[must_use]
pub fn verify_master_key(blob: &SecretBlob, master_key: &MasterKey) -> bool {
    decrypt(blob, master_key).is_ok()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
