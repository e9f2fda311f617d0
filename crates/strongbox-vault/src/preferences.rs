//! Non-sensitive vault preferences, stored as plain JSON.
//!
//! Nothing here is secret: the master key is never persisted, and these
//! settings only choose how secrets are processed.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strongbox_crypto_core::{BackendKind, Engine};

use crate::collection::DEFAULT_TEMP_ID_PREFIX;
use crate::error::VaultError;

// ── Preferences ────────────────────────────────────────────────────

/// Vault preferences.
///
/// Persisted to `{data_dir}/vault-preferences.json`. All fields have
/// defaults via [`Default`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VaultPreferences {
    /// AES-CBC back-end used by the secret engine.
    #[serde(default)]
    pub cipher_backend: BackendKind,

    /// Prefix of client-generated IDs for unsaved entries.
    #[serde(default = "default_temp_id_prefix")]
    pub temp_id_prefix: String,
}

impl Default for VaultPreferences {
    fn default() -> Self {
        Self {
            cipher_backend: BackendKind::default(),
            temp_id_prefix: default_temp_id_prefix(),
        }
    }
}

fn default_temp_id_prefix() -> String {
    DEFAULT_TEMP_ID_PREFIX.into()
}

impl VaultPreferences {
    /// Secret engine over the configured back-end.
    #[must_use]
    pub const fn engine(&self) -> Engine {
        Engine::new(self.cipher_backend)
    }
}

// ── File I/O ───────────────────────────────────────────────────────

const PREFERENCES_FILE: &str = "vault-preferences.json";
const PREFERENCES_TMP: &str = ".vault-preferences.json.tmp";

impl VaultPreferences {
    /// Load from `{data_dir}/vault-preferences.json`.
    ///
    /// Returns [`Default::default()`] when the file is missing or
    /// contains invalid JSON.
    #[must_use]
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(PREFERENCES_FILE);
        fs::read_to_string(&path).map_or_else(
            |_| Self::default(),
            |contents| serde_json::from_str(&contents).unwrap_or_default(),
        )
    }

    /// Persist to `{data_dir}/vault-preferences.json`.
    ///
    /// Written to a `.tmp` file first, then renamed over the target.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Preferences`] if encoding fails and
    /// [`VaultError::Io`] if the directory does not exist or the file
    /// system rejects the write or rename.
    pub fn save(&self, data_dir: &Path) -> Result<(), VaultError> {
        let path = data_dir.join(PREFERENCES_FILE);
        let tmp = data_dir.join(PREFERENCES_TMP);

        let json =
            serde_json::to_string_pretty(self).map_err(|e| VaultError::Preferences(e.to_string()))?;

        fs::write(&tmp, &json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
        }

        fs::rename(&tmp, &path)?;

        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let prefs = VaultPreferences::default();
        assert_eq!(prefs.cipher_backend, BackendKind::RustCrypto);
        assert_eq!(prefs.temp_id_prefix, "new");
        assert_eq!(prefs.engine(), Engine::default());
    }

    #[test]
    fn load_returns_default_on_missing_file() {
        let dir = TempDir::new().unwrap();
        assert_eq!(VaultPreferences::load(dir.path()), VaultPreferences::default());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let prefs = VaultPreferences {
            cipher_backend: BackendKind::Blockwise,
            temp_id_prefix: "draft".into(),
        };
        prefs.save(dir.path()).unwrap();

        let loaded = VaultPreferences::load(dir.path());
        assert_eq!(loaded, prefs);
        assert_eq!(loaded.engine().backend(), BackendKind::Blockwise);
        assert!(!dir.path().join(PREFERENCES_TMP).exists());
    }

    #[test]
    fn load_recovers_from_corrupt_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PREFERENCES_FILE), "{ not json").unwrap();
        assert_eq!(VaultPreferences::load(dir.path()), VaultPreferences::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(PREFERENCES_FILE),
            r#"{"cipherBackend":"openSsl"}"#,
        )
        .unwrap();
        let prefs = VaultPreferences::load(dir.path());
        assert_eq!(prefs.cipher_backend, BackendKind::OpenSsl);
        assert_eq!(prefs.temp_id_prefix, "new");
    }

    #[test]
    fn save_into_missing_dir_is_io_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent");
        let err = VaultPreferences::default().save(&missing).unwrap_err();
        assert!(matches!(err, VaultError::Io(_)));
    }

    #[cfg(unix)]
    #[test]
    fn save_sets_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        VaultPreferences::default().save(dir.path()).unwrap();
        let mode = fs::metadata(dir.path().join(PREFERENCES_FILE))
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn serde_uses_camel_case() {
        let json = serde_json::to_string(&VaultPreferences::default()).unwrap();
        assert!(json.contains("cipherBackend"));
        assert!(json.contains("tempIdPrefix"));
        assert!(json.contains("\"rustCrypto\""));
    }
}
