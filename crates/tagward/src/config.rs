use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tagward_core::{Credential, ReaderDevice};
use tagward_policy::DisclosurePolicy;

use crate::error::{RootError, RootResult};
use crate::registry::Registry;

/// A reading device as registered in the config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub authorized: bool,
    pub range_meters: f64,
}

impl DeviceConfig {
    pub fn build(&self) -> RootResult<ReaderDevice> {
        Ok(ReaderDevice::new(
            self.id.as_str(),
            self.name.as_str(),
            self.authorized,
            self.range_meters,
        )?)
    }
}

/// A credential as registered in the config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CredentialConfig {
    /// Issued as a random v4 UUID when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub owner_name: String,
    pub account_number: String,
    pub expiry: String,
    #[serde(default = "default_true")]
    pub can_be_read: bool,
}

impl CredentialConfig {
    pub fn build(&self) -> RootResult<Credential> {
        let credential = match &self.id {
            Some(id) => Credential::new(
                id.as_str(),
                self.owner_name.as_str(),
                self.account_number.as_str(),
                self.expiry.as_str(),
            )?,
            None => Credential::issue(
                self.owner_name.as_str(),
                self.account_number.as_str(),
                self.expiry.as_str(),
            ),
        };
        Ok(credential.with_readable(self.can_be_read))
    }
}

/// A scripted read attempt replayed by `tagward simulate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttemptConfig {
    pub device_id: String,
    pub credential_id: String,
    pub distance_m: f64,
}

/// Encryption service configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VaultConfig {
    /// Path to the base64url-encoded AES-256 key.
    #[serde(default = "default_key_file")]
    pub key_file: PathBuf,
}

fn default_true() -> bool {
    true
}

fn default_key_file() -> PathBuf {
    dirs_or_default(".tagward/secret.key")
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            key_file: default_key_file(),
        }
    }
}

/// Returns `$HOME/<suffix>` if HOME is available, otherwise `./<suffix>`.
fn dirs_or_default(suffix: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(suffix))
        .unwrap_or_else(|_| PathBuf::from(suffix))
}

/// Top-level configuration for the Tagward binary.
///
/// Loaded from a TOML file (typically `~/.tagward/config.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RootConfig {
    #[serde(default)]
    pub policy: DisclosurePolicy,

    #[serde(default)]
    pub vault: VaultConfig,

    #[serde(default)]
    pub devices: Vec<DeviceConfig>,

    #[serde(default)]
    pub credentials: Vec<CredentialConfig>,

    #[serde(default)]
    pub attempts: Vec<AttemptConfig>,
}

impl RootConfig {
    /// Load configuration from a TOML file. If the file does not exist,
    /// returns a default configuration.
    pub fn load(path: &Path) -> RootResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config: RootConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> RootResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| RootError::Config(format!("TOML serialize error: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Validate every record the way it will be registered, plus the
    /// scripted attempts.
    pub fn validate(&self) -> RootResult<()> {
        self.policy.validate()?;
        Registry::from_config(self)?;

        let device_ids: HashSet<&str> = self.devices.iter().map(|d| d.id.as_str()).collect();
        let credential_ids: HashSet<&str> = self
            .credentials
            .iter()
            .filter_map(|c| c.id.as_deref())
            .collect();

        for attempt in &self.attempts {
            if !device_ids.contains(attempt.device_id.as_str()) {
                return Err(RootError::Config(format!(
                    "attempt references unknown device '{}'",
                    attempt.device_id
                )));
            }
            if !credential_ids.contains(attempt.credential_id.as_str()) {
                return Err(RootError::Config(format!(
                    "attempt references unknown credential '{}'",
                    attempt.credential_id
                )));
            }
            if !attempt.distance_m.is_finite() || attempt.distance_m < 0.0 {
                return Err(RootError::Config(format!(
                    "attempt distance must be a finite value >= 0, got {}",
                    attempt.distance_m
                )));
            }
        }
        Ok(())
    }

    /// Return the path to the default config file location.
    pub fn default_config_path() -> PathBuf {
        dirs_or_default(".tagward/config.toml")
    }

    /// Built-in demonstration setup: a whitelisted point-of-sale terminal,
    /// an unauthorized long-range reader, two cards and four attempts.
    pub fn demo() -> Self {
        let alice = uuid::Uuid::new_v4().to_string();
        let bob = uuid::Uuid::new_v4().to_string();
        let attempt = |device: &str, credential: &str, distance_m: f64| AttemptConfig {
            device_id: device.to_string(),
            credential_id: credential.to_string(),
            distance_m,
        };

        Self {
            policy: DisclosurePolicy::new(["POS-001"], true, true),
            vault: VaultConfig::default(),
            devices: vec![
                DeviceConfig {
                    id: "POS-001".into(),
                    name: "CoffeeShopPOS".into(),
                    authorized: true,
                    range_meters: 0.5,
                },
                DeviceConfig {
                    id: "SHADY-999".into(),
                    name: "MallFreeReader".into(),
                    authorized: false,
                    range_meters: 2.5,
                },
            ],
            credentials: vec![
                CredentialConfig {
                    id: Some(alice.clone()),
                    owner_name: "Alice".into(),
                    account_number: "4111222233334444".into(),
                    expiry: "12/27".into(),
                    can_be_read: true,
                },
                CredentialConfig {
                    id: Some(bob.clone()),
                    owner_name: "Bob".into(),
                    account_number: "5500001111222233".into(),
                    expiry: "03/26".into(),
                    can_be_read: true,
                },
            ],
            attempts: vec![
                attempt("POS-001", alice.as_str(), 0.4),
                attempt("SHADY-999", alice.as_str(), 1.0),
                attempt("SHADY-999", bob.as_str(), 0.3),
                attempt("POS-001", bob.as_str(), 0.6),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!("tagward-test-config-{}-{}", std::process::id(), id))
    }

    #[test]
    fn test_default_config() {
        let config = RootConfig::default();
        assert!(config.devices.is_empty());
        assert!(config.policy.redact_on_unauthorized);
        assert!(config.policy.alert_on_unauthorized);
        assert!(config.vault.key_file.to_str().unwrap().contains(".tagward"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_demo_config_is_valid() {
        let config = RootConfig::demo();
        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.credentials.len(), 2);
        assert_eq!(config.attempts.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
[policy]
whitelisted_device_ids = ["POS-001"]
redact_on_unauthorized = false

[vault]
key_file = "/tmp/tagward-test.key"

[[devices]]
id = "POS-001"
name = "CoffeeShopPOS"
authorized = true
range_meters = 0.5

[[credentials]]
id = "tag-alice"
owner_name = "Alice"
account_number = "4111222233334444"
expiry = "12/27"

[[attempts]]
device_id = "POS-001"
credential_id = "tag-alice"
distance_m = 0.4
"#;
        let config: RootConfig = toml::from_str(toml_str).unwrap();
        assert!(!config.policy.redact_on_unauthorized);
        assert!(config.policy.alert_on_unauthorized);
        assert_eq!(config.vault.key_file, PathBuf::from("/tmp/tagward-test.key"));
        assert_eq!(config.devices[0].range_meters, 0.5);
        assert!(config.credentials[0].can_be_read);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validate_negative_range() {
        let mut config = RootConfig::demo();
        config.devices[0].range_meters = -1.0;
        assert!(matches!(config.validate(), Err(RootError::Core(_))));
    }

    #[test]
    fn test_config_validate_duplicate_device() {
        let mut config = RootConfig::demo();
        let dup = config.devices[0].clone();
        config.devices.push(dup);
        assert!(matches!(config.validate(), Err(RootError::Config(_))));
    }

    #[test]
    fn test_config_validate_unknown_attempt_device() {
        let mut config = RootConfig::demo();
        config.attempts[0].device_id = "GHOST".into();
        assert!(matches!(config.validate(), Err(RootError::Config(_))));
    }

    #[test]
    fn test_config_validate_negative_distance() {
        let mut config = RootConfig::demo();
        config.attempts[0].distance_m = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validate_empty_whitelist_entry() {
        let mut config = RootConfig::default();
        config.policy = DisclosurePolicy::new([""], true, true);
        assert!(matches!(config.validate(), Err(RootError::Policy(_))));
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = RootConfig::load(Path::new("/nonexistent/tagward.toml")).unwrap();
        assert_eq!(config, RootConfig::default());
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = temp_dir();
        let path = dir.join("config.toml");
        let config = RootConfig::demo();

        config.save(&path).unwrap();
        let loaded = RootConfig::load(&path).unwrap();
        assert_eq!(loaded, config);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[[devices]]\nid = 3").unwrap();
        assert!(matches!(RootConfig::load(&path), Err(RootError::Config(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
