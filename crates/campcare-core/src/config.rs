// ── Runtime instance configuration ──
//
// These types describe *which* account to talk to and *how*. They carry
// credential data but never touch disk; `campcare-config` loads them
// from the config-entry store and hands them in.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use campcare_api::{TlsMode, TransportConfig};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::CoreError;

// ── Identifiers ──────────────────────────────────────────────────────

/// Opaque identifier of one integration instance (config entry).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    /// A fresh random id for a newly created entry.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for InstanceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ── User-supplied settings ───────────────────────────────────────────

/// Settings captured when an instance is first configured.
#[derive(Debug, Clone)]
pub struct InstanceConfig {
    pub display_name: String,
    pub base_url: String,
    pub credential: SecretString,
}

impl InstanceConfig {
    /// Config against the production API root.
    pub fn new(display_name: impl Into<String>, credential: SecretString) -> Self {
        Self {
            display_name: display_name.into(),
            base_url: campcare_api::DEFAULT_API_URL.to_owned(),
            credential,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Settings edited after setup. Each present field overrides the value
/// stored at setup time.
#[derive(Debug, Clone, Default)]
pub struct InstanceOptions {
    pub display_name: Option<String>,
    pub base_url: Option<String>,
    pub credential: Option<SecretString>,
}

impl InstanceOptions {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.base_url.is_none() && self.credential.is_none()
    }

    /// Layer `newer` on top of `self`, field by field.
    pub fn merged(self, newer: Self) -> Self {
        Self {
            display_name: newer.display_name.or(self.display_name),
            base_url: newer.base_url.or(self.base_url),
            credential: newer.credential.or(self.credential),
        }
    }
}

/// A stored config entry: original data plus any option overrides.
#[derive(Debug, Clone)]
pub struct ConfigEntry {
    pub id: InstanceId,
    pub data: InstanceConfig,
    pub options: InstanceOptions,
}

impl ConfigEntry {
    pub fn new(id: InstanceId, data: InstanceConfig) -> Self {
        Self {
            id,
            data,
            options: InstanceOptions::default(),
        }
    }

    /// Display name after applying options.
    pub fn display_name(&self) -> &str {
        self.options
            .display_name
            .as_deref()
            .unwrap_or(&self.data.display_name)
            .trim()
    }

    /// Resolve the effective instance: options override data per field.
    pub fn effective(&self) -> Result<IntegrationInstance, CoreError> {
        let display_name = self.display_name();
        if display_name.is_empty() {
            return Err(CoreError::validation("display_name", "must not be empty"));
        }

        let raw_url = self
            .options
            .base_url
            .as_deref()
            .unwrap_or(&self.data.base_url)
            .trim();
        let base_url = Url::parse(raw_url)
            .map_err(|e| CoreError::validation("base_url", format!("'{raw_url}': {e}")))?;

        let credential = self
            .options
            .credential
            .clone()
            .unwrap_or_else(|| self.data.credential.clone());
        if credential.expose_secret().trim().is_empty() {
            return Err(CoreError::validation("credential", "must not be empty"));
        }

        Ok(IntegrationInstance {
            id: self.id.clone(),
            display_name: display_name.to_owned(),
            base_url,
            credential,
        })
    }
}

/// One fully-resolved integration instance, ready to build a client from.
#[derive(Debug, Clone)]
pub struct IntegrationInstance {
    pub id: InstanceId,
    pub display_name: String,
    pub base_url: Url,
    pub credential: SecretString,
}

// ── Client tuning ────────────────────────────────────────────────────

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// Bundled root store (strict).
    #[default]
    SystemDefaults,
    /// Additional CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed proxies).
    DangerAcceptInvalid,
}

/// Transport settings applied to every client the registry builds.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Per-request upper bound; the only cancellation mechanism.
    pub timeout: Duration,
    pub tls: TlsVerification,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            tls: TlsVerification::default(),
        }
    }
}

impl ClientSettings {
    pub(crate) fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }
}
