//! Config-entry store for campcare.
//!
//! One TOML file holds every configured instance as `data` (captured at
//! setup) plus optional `options` (edited later). This crate loads and
//! saves that file, resolves credentials (env + keyring + plaintext), and
//! translates stored entries into `campcare_core` types.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use indexmap::IndexMap;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use campcare_core::{
    ClientSettings, ConfigEntry, InstanceConfig, InstanceId, InstanceOptions, TlsVerification,
};

const KEYRING_SERVICE: &str = "campcare";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no API key configured for entry '{entry}'")]
    NoCredentials { entry: String },

    #[error("no entry with id '{id}'")]
    UnknownEntry { id: String },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Config entries keyed by instance id, in creation order.
    #[serde(default)]
    pub entries: IndexMap<String, StoredEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default)]
    pub insecure: bool,

    /// Extra CA certificate (PEM) to trust.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
            insecure: false,
            ca_cert: None,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_base_url() -> String {
    campcare_core::DEFAULT_API_URL.into()
}

/// One persisted config entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoredEntry {
    pub data: EntryData,
    #[serde(default, skip_serializing_if = "EntryOverrides::is_empty")]
    pub options: EntryOverrides,
}

/// Values captured when the entry was first set up.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EntryData {
    pub display_name: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key (plaintext; prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

/// Values edited after setup. Each present field overrides `data`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EntryOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl EntryOverrides {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.base_url.is_none()
            && self.api_key.is_none()
            && self.api_key_env.is_none()
    }

    /// Layer `newer` on top of `self`, field by field.
    pub fn merge(&mut self, newer: Self) {
        if newer.display_name.is_some() {
            self.display_name = newer.display_name;
        }
        if newer.base_url.is_some() {
            self.base_url = newer.base_url;
        }
        if newer.api_key.is_some() {
            self.api_key = newer.api_key;
        }
        if newer.api_key_env.is_some() {
            self.api_key_env = newer.api_key_env;
        }
    }
}

impl StoredEntry {
    /// Display name after applying options.
    pub fn display_name(&self) -> &str {
        self.options
            .display_name
            .as_deref()
            .unwrap_or(&self.data.display_name)
    }

    /// Base URL after applying options.
    pub fn base_url(&self) -> &str {
        self.options.base_url.as_deref().unwrap_or(&self.data.base_url)
    }
}

impl Config {
    pub fn entry(&self, id: &str) -> Result<&StoredEntry, ConfigError> {
        self.entries
            .get(id)
            .ok_or_else(|| ConfigError::UnknownEntry { id: id.into() })
    }

    pub fn entry_mut(&mut self, id: &str) -> Result<&mut StoredEntry, ConfigError> {
        self.entries
            .get_mut(id)
            .ok_or_else(|| ConfigError::UnknownEntry { id: id.into() })
    }

    /// Find an entry by id, falling back to an exact display-name match.
    pub fn find(&self, id_or_name: &str) -> Option<(&str, &StoredEntry)> {
        self.entries
            .get_key_value(id_or_name)
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|(_, e)| e.display_name().trim() == id_or_name.trim())
            })
            .map(|(id, e)| (id.as_str(), e))
    }

    /// Transport settings shared by every instance.
    pub fn client_settings(&self) -> ClientSettings {
        let tls = if self.defaults.insecure {
            TlsVerification::DangerAcceptInvalid
        } else if let Some(ref ca) = self.defaults.ca_cert {
            TlsVerification::CustomCa(ca.clone())
        } else {
            TlsVerification::SystemDefaults
        };
        ClientSettings {
            timeout: Duration::from_secs(self.defaults.timeout),
            tls,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path. `CAMPCARE_CONFIG` wins over platform
/// conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os("CAMPCARE_CONFIG") {
        return PathBuf::from(path);
    }
    ProjectDirs::from("care", "camping", "campcare").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("campcare");
    p
}

// ── Loading / saving ────────────────────────────────────────────────

/// Load from an explicit file. A missing file yields defaults.
///
/// `CAMPCARE_DEFAULTS__TIMEOUT=30` style variables override file values.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("CAMPCARE_").split("__").ignore(&["config"]));

    Ok(figment.extract()?)
}

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    debug!(path = %path.display(), entries = cfg.entries.len(), "config saved");
    Ok(())
}

// ── Credentials ─────────────────────────────────────────────────────

fn keyring_user(entry_id: &str) -> String {
    format!("{entry_id}/api-key")
}

/// Store an API key in the system keyring for `entry_id`.
pub fn store_api_key(entry_id: &str, api_key: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &keyring_user(entry_id))
        .and_then(|entry| entry.set_password(api_key))
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

/// Remove a stored key. A missing keyring entry is not an error.
pub fn forget_api_key(entry_id: &str) {
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(entry_id)) {
        let _ = entry.delete_credential();
    }
}

fn keyring_api_key(entry_id: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, &keyring_user(entry_id))
        .ok()?
        .get_password()
        .ok()
}

/// Resolve the setup-time API key: `api_key_env` → keyring → plaintext.
pub fn resolve_api_key(data: &EntryData, entry_id: &str) -> Result<SecretString, ConfigError> {
    resolve_api_key_with(data, entry_id, |name| std::env::var(name).ok())
}

/// [`resolve_api_key`] with an injectable environment lookup.
pub fn resolve_api_key_with(
    data: &EntryData,
    entry_id: &str,
    env: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Entry's api_key_env → env var lookup
    if let Some(value) = data.api_key_env.as_deref().and_then(&env) {
        return Ok(SecretString::from(value));
    }

    // 2. System keyring
    if let Some(secret) = keyring_api_key(entry_id) {
        return Ok(SecretString::from(secret));
    }

    // 3. Plaintext in config
    if let Some(ref key) = data.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        entry: entry_id.into(),
    })
}

/// Override key from options: `api_key_env` → plaintext. `None` keeps the
/// setup-time key.
fn resolve_override_key(
    options: &EntryOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> Option<SecretString> {
    options
        .api_key_env
        .as_deref()
        .and_then(env)
        .or_else(|| options.api_key.clone())
        .map(SecretString::from)
}

// ── Translation to core types ───────────────────────────────────────

/// Build a `ConfigEntry` from a stored entry, resolving credentials.
pub fn to_config_entry(entry_id: &str, stored: &StoredEntry) -> Result<ConfigEntry, ConfigError> {
    to_config_entry_with(entry_id, stored, |name| std::env::var(name).ok())
}

pub fn to_config_entry_with(
    entry_id: &str,
    stored: &StoredEntry,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ConfigEntry, ConfigError> {
    let credential = match resolve_api_key_with(&stored.data, entry_id, &env) {
        Ok(key) => key,
        // An override key alone is enough to run the entry.
        Err(err) => match resolve_override_key(&stored.options, &env) {
            Some(key) => key,
            None => return Err(err),
        },
    };

    let data = InstanceConfig::new(stored.data.display_name.clone(), credential)
        .with_base_url(stored.data.base_url.clone());
    let options = InstanceOptions {
        display_name: stored.options.display_name.clone(),
        base_url: stored.options.base_url.clone(),
        credential: resolve_override_key(&stored.options, &env),
    };

    Ok(ConfigEntry {
        id: InstanceId::from(entry_id),
        data,
        options,
    })
}
