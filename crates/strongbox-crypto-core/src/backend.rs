//! AES-256-CBC back-ends with PKCS#7 padding.
//!
//! Every back-end implements the same primitive (CBC chaining over AES-256
//! with PKCS#7 block padding) and MUST stay bit-compatible with the others:
//! a blob sealed by one back-end opens under any other. The shared fixture
//! set in `tests/kat_vectors` pins the exact output.
//!
//! - [`RustCryptoCbc`]: the RustCrypto `cbc` block mode (default)
//! - [`BlockwiseCbc`]: the bare `aes` block cipher, chaining and padding done here
//! - `OpenSslCbc`: the platform OpenSSL library (`openssl` feature)

use aes::cipher::{Block, BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes256;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::kdf::KEY_LEN;

/// AES block length in bytes; also the IV length.
pub const BLOCK_LEN: usize = 16;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// One AES-256-CBC-PKCS#7 implementation.
pub trait CbcBackend: Send + Sync {
    /// Short stable name, used in preferences and test output.
    fn name(&self) -> &'static str;

    /// Pad and encrypt `plaintext`. The output length is a non-zero multiple
    /// of [`BLOCK_LEN`].
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Encryption`] if the underlying library fails.
    fn encrypt(
        &self,
        key: &[u8; KEY_LEN],
        iv: &[u8; BLOCK_LEN],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;

    /// Decrypt and unpad `ciphertext`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::MalformedCiphertext`] if `ciphertext` is empty
    /// or not block-aligned, [`CryptoError::Decryption`] if the padding is
    /// invalid (wrong key or corrupted data).
    fn decrypt(
        &self,
        key: &[u8; KEY_LEN],
        iv: &[u8; BLOCK_LEN],
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError>;
}

fn check_block_aligned(ciphertext: &[u8]) -> Result<(), CryptoError> {
    if ciphertext.is_empty() || ciphertext.len().checked_rem(BLOCK_LEN) != Some(0) {
        return Err(CryptoError::MalformedCiphertext(format!(
            "ciphertext length {} is not a positive multiple of {BLOCK_LEN}",
            ciphertext.len()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Back-end selection
// ---------------------------------------------------------------------------

/// Selects a [`CbcBackend`]. Stored in vault preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BackendKind {
    /// RustCrypto `cbc` block mode.
    #[default]
    RustCrypto,
    /// Bare `aes` block cipher with local chaining and padding.
    Blockwise,
    /// Platform OpenSSL. Resolves to [`BackendKind::RustCrypto`] when the
    /// crate is built without the `openssl` feature; the blobs are identical.
    OpenSsl,
}

impl BackendKind {
    /// Resolve to a back-end instance.
    #[must_use]
    pub fn backend(self) -> &'static dyn CbcBackend {
        match self {
            Self::RustCrypto => &RustCryptoCbc,
            Self::Blockwise => &BlockwiseCbc,
            #[cfg(feature = "openssl")]
            Self::OpenSsl => &OpenSslCbc,
            #[cfg(not(feature = "openssl"))]
            Self::OpenSsl => &RustCryptoCbc,
        }
    }

    /// Back-ends compiled into this build.
    #[must_use]
    pub fn available() -> Vec<Self> {
        let mut kinds = vec![Self::RustCrypto, Self::Blockwise];
        if cfg!(feature = "openssl") {
            kinds.push(Self::OpenSsl);
        }
        kinds
    }
}

// ---------------------------------------------------------------------------
// RustCrypto `cbc`
// ---------------------------------------------------------------------------

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// AES-256-CBC via the RustCrypto `cbc` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCryptoCbc;

impl CbcBackend for RustCryptoCbc {
    fn name(&self) -> &'static str {
        "rust-crypto"
    }

    fn encrypt(
        &self,
        key: &[u8; KEY_LEN],
        iv: &[u8; BLOCK_LEN],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        use aes::cipher::block_padding::Pkcs7;
        use aes::cipher::{BlockEncryptMut, KeyIvInit};

        let encryptor = Aes256CbcEnc::new(key.into(), iv.into());
        Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
    }

    fn decrypt(
        &self,
        key: &[u8; KEY_LEN],
        iv: &[u8; BLOCK_LEN],
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        use aes::cipher::block_padding::Pkcs7;
        use aes::cipher::{BlockDecryptMut, KeyIvInit};

        check_block_aligned(ciphertext)?;
        let decryptor = Aes256CbcDec::new(key.into(), iv.into());
        decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map(Zeroizing::new)
            .map_err(|_| CryptoError::Decryption)
    }
}

// ---------------------------------------------------------------------------
// Blockwise (bare AES block cipher)
// ---------------------------------------------------------------------------

/// AES-256-CBC built on the `aes` block primitive alone.
///
/// Chaining and PKCS#7 are implemented here, independent of the `cbc`
/// crate, so the two back-ends cross-check each other.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockwiseCbc;

impl CbcBackend for BlockwiseCbc {
    fn name(&self) -> &'static str {
        "blockwise"
    }

    fn encrypt(
        &self,
        key: &[u8; KEY_LEN],
        iv: &[u8; BLOCK_LEN],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let cipher = <Aes256 as KeyInit>::new(key.into());
        let padded = pkcs7_pad(plaintext);

        let mut out = Vec::with_capacity(padded.len());
        let mut chain = *iv;
        for chunk in padded.chunks_exact(BLOCK_LEN) {
            let mut block = Block::<Aes256>::default();
            for ((dst, p), c) in block.iter_mut().zip(chunk).zip(chain.iter()) {
                *dst = p ^ c;
            }
            cipher.encrypt_block(&mut block);
            chain.copy_from_slice(&block);
            out.extend_from_slice(&block);
        }
        Ok(out)
    }

    fn decrypt(
        &self,
        key: &[u8; KEY_LEN],
        iv: &[u8; BLOCK_LEN],
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        check_block_aligned(ciphertext)?;
        let cipher = <Aes256 as KeyInit>::new(key.into());

        let mut out = Zeroizing::new(Vec::with_capacity(ciphertext.len()));
        let mut chain = *iv;
        for chunk in ciphertext.chunks_exact(BLOCK_LEN) {
            let mut block = Block::<Aes256>::clone_from_slice(chunk);
            cipher.decrypt_block(&mut block);
            for (b, c) in block.iter_mut().zip(chain.iter()) {
                *b ^= c;
            }
            out.extend_from_slice(&block);
            chain.copy_from_slice(chunk);
        }

        pkcs7_unpad(&mut out)?;
        Ok(out)
    }
}

/// Append PKCS#7 padding: `n` bytes of value `n`, `1 <= n <= 16`.
fn pkcs7_pad(data: &[u8]) -> Zeroizing<Vec<u8>> {
    let rem = data.len().checked_rem(BLOCK_LEN).unwrap_or(0);
    let pad_len = BLOCK_LEN.saturating_sub(rem);
    let mut padded = Zeroizing::new(Vec::with_capacity(data.len().saturating_add(pad_len)));
    padded.extend_from_slice(data);
    // pad_len is in 1..=16, always fits a byte.
    let pad_byte = u8::try_from(pad_len).unwrap_or(0);
    padded.resize(data.len().saturating_add(pad_len), pad_byte);
    padded
}

/// Strip PKCS#7 padding in place.
fn pkcs7_unpad(data: &mut Vec<u8>) -> Result<(), CryptoError> {
    let &last = data.last().ok_or(CryptoError::Decryption)?;
    let pad_len = usize::from(last);
    if pad_len == 0 || pad_len > BLOCK_LEN {
        return Err(CryptoError::Decryption);
    }
    let keep = data
        .len()
        .checked_sub(pad_len)
        .ok_or(CryptoError::Decryption)?;

    // Fold over every padding byte instead of returning at the first mismatch.
    let mismatch = data[keep..].iter().fold(0u8, |acc, &b| acc | (b ^ last));
    if mismatch != 0 {
        return Err(CryptoError::Decryption);
    }
    data.truncate(keep);
    Ok(())
}

// ---------------------------------------------------------------------------
// OpenSSL
// ---------------------------------------------------------------------------

/// AES-256-CBC via the platform OpenSSL library.
#[cfg(feature = "openssl")]
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenSslCbc;

#[cfg(feature = "openssl")]
impl CbcBackend for OpenSslCbc {
    fn name(&self) -> &'static str {
        "openssl"
    }

    fn encrypt(
        &self,
        key: &[u8; KEY_LEN],
        iv: &[u8; BLOCK_LEN],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        use openssl::symm::{encrypt, Cipher};

        encrypt(Cipher::aes_256_cbc(), key, Some(iv.as_slice()), plaintext)
            .map_err(|e| CryptoError::Encryption(format!("openssl: {e}")))
    }

    fn decrypt(
        &self,
        key: &[u8; KEY_LEN],
        iv: &[u8; BLOCK_LEN],
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        use openssl::symm::{decrypt, Cipher};

        check_block_aligned(ciphertext)?;
        decrypt(Cipher::aes_256_cbc(), key, Some(iv.as_slice()), ciphertext)
            .map(Zeroizing::new)
            .map_err(|_| CryptoError::Decryption)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
