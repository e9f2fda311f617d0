//! Cryptographic error types for `strongbox-crypto-core`.

use thiserror::Error;

/// Errors produced by the secret engine and its CBC back-ends.
///
/// None of the variants carry key material or plaintext.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The master key is missing or empty.
    #[error("master key is required")]
    InvalidKey,

    /// The blob is not valid base64 or its byte layout is impossible
    /// (too short, ciphertext not block-aligned). Indicates corruption.
    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// Padding check failed or the recovered payload is not a salted UTF-8
    /// string: wrong master key, or a corrupted/foreign record.
    #[error("decryption failed: incorrect master password or corrupted record")]
    Decryption,

    /// The back-end refused to encrypt.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// The operating system CSPRNG failed to produce salt or IV bytes.
    #[error("random source failure: {0}")]
    RandomSource(String),
}
