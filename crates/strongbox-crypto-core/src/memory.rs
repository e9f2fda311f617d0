//! Memory types for secret material.
//!
//! - [`MasterKey`]: the user's master password, transient, never serialized
//! - [`Plaintext`]: a decrypted secret, zeroized on drop
//! - [`SecretBytes`]: fixed-size key material, zeroized on drop
//!
//! All three mask their `Debug` output.

use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::CryptoError;

// ---------------------------------------------------------------------------
// MasterKey
// ---------------------------------------------------------------------------

/// The user-supplied master password.
///
/// Deliberately neither `Clone` nor `Serialize`: the owner (the UI state)
/// lends it out as `&MasterKey` for the duration of a single operation.
pub struct MasterKey {
    inner: SecretString,
}

impl MasterKey {
    /// Wrap a master password.
    ///
    /// An empty key is representable; operations that need a key reject it
    /// with [`CryptoError::InvalidKey`].
    #[must_use]
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            inner: SecretString::from(password.into()),
        }
    }

    /// Returns `true` if the key is the empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.expose_secret().is_empty()
    }

    /// Expose the UTF-8 bytes for key derivation.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        self.inner.expose_secret().as_bytes()
    }

    /// Reject the empty key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKey`] if the key is empty.
    pub fn require_non_empty(&self) -> Result<&Self, CryptoError> {
        if self.is_empty() {
            Err(CryptoError::InvalidKey)
        } else {
            Ok(self)
        }
    }
}

impl From<&str> for MasterKey {
    fn from(password: &str) -> Self {
        Self::new(password)
    }
}

impl From<String> for MasterKey {
    fn from(password: String) -> Self {
        Self::new(password)
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey(***)")
    }
}

// ---------------------------------------------------------------------------
// Plaintext
// ---------------------------------------------------------------------------

/// A decrypted (or user-typed) secret.
///
/// The backing `String` is wiped when the value is dropped. Cloning is
/// allowed because the entry state machine moves plaintext between states.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Plaintext {
    inner: Zeroizing<String>,
}

impl Plaintext {
    /// Wrap a plaintext secret.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: Zeroizing::new(value.into()),
        }
    }

    /// Borrow the plaintext. Keep the borrow short.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.inner.as_str()
    }

    /// Returns `true` if the secret is the empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl From<&str> for Plaintext {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Plaintext {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for Plaintext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Plaintext(***)")
    }
}

// ---------------------------------------------------------------------------
// SecretBytes<N>
// ---------------------------------------------------------------------------

/// Fixed-size buffer for keys, salts, and IVs.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretBytes<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> SecretBytes<N> {
    /// Take ownership of a fixed-size array.
    #[must_use]
    pub const fn new(bytes: [u8; N]) -> Self {
        Self { bytes }
    }

    /// Fill a new buffer from the OS CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::RandomSource`] if the CSPRNG fails.
    pub fn random() -> Result<Self, CryptoError> {
        let mut bytes = [0u8; N];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CryptoError::RandomSource(format!("CSPRNG fill failed: {e}")))?;
        Ok(Self::new(bytes))
    }

    /// Expose the underlying bytes for a cryptographic operation.
    #[must_use]
    pub const fn expose(&self) -> &[u8; N] {
        &self.bytes
    }
}

impl<const N: usize> fmt::Debug for SecretBytes<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes<{N}>(***)")
    }
}

impl<const N: usize> From<[u8; N]> for SecretBytes<N> {
    fn from(bytes: [u8; N]) -> Self {
        Self::new(bytes)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
