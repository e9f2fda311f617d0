mod browser_blobs;
mod sha256_kdf;
