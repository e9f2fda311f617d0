//! FIPS 180-4 SHA-256 vectors applied to master-key derivation.

use data_encoding::HEXLOWER;
use strongbox_crypto_core::{derive_key, CryptoError, MasterKey};

fn derived_hex(master: &str) -> String {
    let key = derive_key(&MasterKey::new(master)).expect("derive should succeed");
    HEXLOWER.encode(key.expose())
}

/// SHA-256("abc"), FIPS 180-4 appendix B.1.
#[test]
fn fips_abc() {
    assert_eq!(
        derived_hex("abc"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

/// Two-block message, FIPS 180-4 appendix B.2.
#[test]
fn fips_two_block() {
    assert_eq!(
        derived_hex("abcdbcdecdefdefgefghfghighijhijkijkljklmklmnlmnomnopnopq"),
        "248d6a61d20638b8e5c026930c3e6039a33ce45964ff2167f6ecedd419db06c1"
    );
}

#[test]
fn vault_fixture_key() {
    assert_eq!(
        derived_hex("master123"),
        "e7bc2f973afb8dfaf00fadfb19596741108be08ab4a107c6a799c429b684c64a"
    );
}

/// The empty string has a well-known digest, but the vault refuses it as a key.
#[test]
fn empty_master_key_is_rejected_not_hashed() {
    let result = derive_key(&MasterKey::new(""));
    assert!(matches!(result, Err(CryptoError::InvalidKey)));
}
