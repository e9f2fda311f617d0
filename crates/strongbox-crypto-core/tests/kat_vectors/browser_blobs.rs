//! Fixed-salt compatibility vectors for the browser client's blob format.
//!
//! Each blob was sealed with Web Crypto `AES-CBC` from a fixed (not random)
//! salt and IV so the output is reproducible. Every back-end must open the
//! blob, and re-sealing with the same salt and IV must reproduce it byte for
//! byte.

use data_encoding::HEXLOWER;
use strongbox_crypto_core::{
    decrypt_with, derive_key, BackendKind, BlobParts, CbcBackend, CryptoError, MasterKey,
    SecretBlob, SALT_LEN,
};

struct Fixture {
    master_key: &'static str,
    plaintext: &'static str,
    salt: &'static str,
    iv: &'static str,
    blob: &'static str,
}

const FIXTURES: &[Fixture] = &[
    Fixture {
        master_key: "master123",
        plaintext: "simple",
        salt: "01080f161d242b323940474e555c636a",
        iv: "030e19242f3a45505b66717c87929da8",
        blob: "Aw4ZJC86RVBbZnF8h5KdqASRga1DUsGCP3Jv+V1qt2VS0H/Dck6bHUVrYAYL7BHP",
    },
    Fixture {
        master_key: "MyMasterKey",
        plaintext: "P@ssw0rd!#$%",
        salt: "0e151c232a31383f464d545b62697077",
        iv: "08131e29343f4a55606b76818c97a2ad",
        blob: "CBMeKTQ/SlVga3aBjJeirW7X6vT0ywGmzjB+wwpI8Vc2C5aNn+iQvY0c6CJC2u8Y",
    },
    Fixture {
        master_key: "test",
        plaintext: "Unicode: \u{65e5}\u{672c}\u{8a9e} \u{e9}mojis \u{1f510}",
        salt: "1b222930373e454c535a61686f767d84",
        iv: "0d18232e39444f5a65707b86919ca7b2",
        blob: "DRgjLjlET1plcHuGkZynsqgyLFQ/8r41WxjIsxG2ewFHmm9dFhjALZfwaVaRqfJA4itWY/qhY+o+Qj10JwTJkg==",
    },
    Fixture {
        master_key: "empty",
        plaintext: "",
        salt: "282f363d444b525960676e757c838a91",
        iv: "121d28333e49545f6a75808b96a1acb7",
        blob: "Eh0oMz5JVF9qdYCLlqGst6XN2/7e82uFNoNKaF3+j4uvQvOAAjulK0ciJgnZQkd3",
    },
];

fn hex(s: &str) -> Vec<u8> {
    HEXLOWER.decode(s.as_bytes()).expect("fixture hex is valid")
}

#[test]
fn every_backend_opens_compatibility_blobs() {
    for fixture in FIXTURES {
        let blob = SecretBlob::new(fixture.blob);
        let key = MasterKey::new(fixture.master_key);
        for kind in BackendKind::available() {
            let plaintext = decrypt_with(kind.backend(), &blob, &key)
                .unwrap_or_else(|e| panic!("{kind:?} failed on {:?}: {e}", fixture.plaintext));
            assert_eq!(plaintext.expose(), fixture.plaintext, "{kind:?}");
        }
    }
}

#[test]
fn compatibility_blobs_carry_fixed_iv_and_salt() {
    for fixture in FIXTURES {
        let parts = SecretBlob::new(fixture.blob).decode().unwrap();
        assert_eq!(parts.iv.as_slice(), hex(fixture.iv).as_slice());

        let key = derive_key(&MasterKey::new(fixture.master_key)).unwrap();
        let salted = BackendKind::RustCrypto
            .backend()
            .decrypt(key.expose(), &parts.iv, &parts.ciphertext)
            .unwrap();
        assert_eq!(&salted[..SALT_LEN], hex(fixture.salt).as_slice());
    }
}

#[test]
fn every_backend_reproduces_compatibility_blobs() {
    for fixture in FIXTURES {
        let key = derive_key(&MasterKey::new(fixture.master_key)).unwrap();
        let mut iv = [0u8; 16];
        iv.copy_from_slice(&hex(fixture.iv));

        let mut salted = hex(fixture.salt);
        salted.extend_from_slice(fixture.plaintext.as_bytes());

        for kind in BackendKind::available() {
            let ciphertext = kind.backend().encrypt(key.expose(), &iv, &salted).unwrap();
            let blob = BlobParts { iv, ciphertext }.encode();
            assert_eq!(blob.as_str(), fixture.blob, "{kind:?}");
        }
    }
}

#[test]
fn compatibility_blobs_reject_other_keys() {
    for fixture in FIXTURES {
        let blob = SecretBlob::new(fixture.blob);
        for wrong in ["master124", "nope", "WRONG"] {
            for kind in BackendKind::available() {
                let result = decrypt_with(kind.backend(), &blob, &MasterKey::new(wrong));
                assert_eq!(result.unwrap_err(), CryptoError::Decryption, "{kind:?}");
            }
        }
    }
}
