//! `strongbox-crypto-core` — Client-side secret encryption for the Strongbox vault.
//!
//! This crate is the audit target: zero network, zero async, zero logging.
//! The master key and plaintext never leave it except as return values.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod memory;

pub mod kdf;

pub mod backend;
pub mod blob;
pub mod engine;

pub use backend::{BackendKind, BlockwiseCbc, CbcBackend, RustCryptoCbc, BLOCK_LEN};
#[cfg(feature = "openssl")]
pub use backend::OpenSslCbc;
pub use blob::{BlobParts, SecretBlob, IV_LEN, MIN_BLOB_LEN, SALT_LEN};
pub use engine::{
    decrypt, decrypt_with, encrypt, encrypt_with, verify_master_key, Engine, SecretCipher,
};
pub use error::CryptoError;
pub use kdf::{derive_key, KEY_LEN};
pub use memory::{MasterKey, Plaintext, SecretBytes};
