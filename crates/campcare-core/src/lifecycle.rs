// ── Config-entry lifecycle ──
//
// Setup, options update and unload of integration instances. This layer
// owns the entry records (what the user configured) and drives the
// registry (what is live). Display-name uniqueness is enforced here,
// before any network traffic.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::{ConfigEntry, InstanceConfig, InstanceId, InstanceOptions};
use crate::error::CoreError;
use crate::registry::InstanceRegistry;

/// Load state of one config entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EntryState {
    /// Validated and registered.
    Loaded,
    /// Known but not usable; `reason` is the last setup failure.
    SetupError { reason: String },
    /// Known but not started (after shutdown).
    NotLoaded,
}

/// A config entry together with its current load state.
#[derive(Debug, Clone)]
pub struct EntryRecord {
    pub entry: ConfigEntry,
    pub state: EntryState,
}

/// Drives config entries through their lifecycle against one registry.
pub struct IntegrationManager {
    registry: Arc<InstanceRegistry>,
    entries: Mutex<IndexMap<InstanceId, EntryRecord>>,
}

impl IntegrationManager {
    pub fn new(registry: Arc<InstanceRegistry>) -> Self {
        Self {
            registry,
            entries: Mutex::new(IndexMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<InstanceRegistry> {
        &self.registry
    }

    /// Configure a brand-new instance.
    ///
    /// A display name already in use fails with `AlreadyConfigured` before
    /// anything is probed. A failed probe leaves no entry behind.
    pub async fn setup(&self, config: InstanceConfig) -> Result<ConfigEntry, CoreError> {
        let mut entries = self.entries.lock().await;

        let entry = ConfigEntry::new(InstanceId::generate(), config);
        ensure_unique_name(&entries, entry.display_name(), None)?;
        let instance = entry.effective()?;

        self.registry.register(&instance).await?;
        info!(instance = %entry.id, name = %instance.display_name, "entry created");

        entries.insert(
            entry.id.clone(),
            EntryRecord {
                entry: entry.clone(),
                state: EntryState::Loaded,
            },
        );
        Ok(entry)
    }

    /// Bring a previously persisted entry back.
    ///
    /// The record is kept even when the probe fails, in `SetupError` state,
    /// so a later options update can repair it.
    pub async fn load(&self, entry: ConfigEntry) -> Result<(), CoreError> {
        let mut entries = self.entries.lock().await;

        if entries.contains_key(&entry.id) {
            return Err(CoreError::AlreadyRegistered {
                id: entry.id.to_string(),
            });
        }
        ensure_unique_name(&entries, entry.display_name(), None)?;

        let result = match entry.effective() {
            Ok(instance) => self.registry.register(&instance).await.map(drop),
            Err(err) => Err(err),
        };

        let state = match &result {
            Ok(()) => EntryState::Loaded,
            Err(err) => {
                warn!(instance = %entry.id, "entry failed to load: {err}");
                EntryState::SetupError {
                    reason: err.to_string(),
                }
            }
        };
        entries.insert(entry.id.clone(), EntryRecord { entry, state });
        result
    }

    /// Track a persisted entry without probing it.
    ///
    /// The record starts in `NotLoaded`; a following `update_options`
    /// builds and validates the live client from the edited settings.
    pub async fn restore(&self, entry: ConfigEntry) -> Result<(), CoreError> {
        let mut entries = self.entries.lock().await;

        if entries.contains_key(&entry.id) {
            return Err(CoreError::AlreadyRegistered {
                id: entry.id.to_string(),
            });
        }
        ensure_unique_name(&entries, entry.display_name(), None)?;

        entries.insert(
            entry.id.clone(),
            EntryRecord {
                entry,
                state: EntryState::NotLoaded,
            },
        );
        Ok(())
    }

    /// Apply edited options and rebuild the live client from them.
    ///
    /// Options are kept even if the rebuilt client fails validation; the
    /// entry then sits in `SetupError` with no live client.
    pub async fn update_options(
        &self,
        id: &InstanceId,
        options: InstanceOptions,
    ) -> Result<ConfigEntry, CoreError> {
        let mut entries = self.entries.lock().await;

        let current = entries
            .get(id)
            .ok_or_else(|| CoreError::UnknownInstance { id: id.to_string() })?;

        let mut candidate = current.entry.clone();
        candidate.options = candidate.options.merged(options);
        ensure_unique_name(&entries, candidate.display_name(), Some(id))?;
        let instance = candidate.effective()?;

        let result = if self.registry.contains(id) {
            self.registry.update(&instance).await
        } else {
            self.registry.register(&instance).await
        };

        let state = match &result {
            Ok(_) => EntryState::Loaded,
            Err(err) => EntryState::SetupError {
                reason: err.to_string(),
            },
        };
        if let Some(record) = entries.get_mut(id) {
            record.entry = candidate.clone();
            record.state = state;
        }

        result.map(|_| {
            info!(instance = %id, "options updated");
            candidate
        })
    }

    /// Remove an entry and its live client.
    pub async fn unload(&self, id: &InstanceId) -> Result<ConfigEntry, CoreError> {
        let mut entries = self.entries.lock().await;

        let record = entries
            .shift_remove(id)
            .ok_or_else(|| CoreError::UnknownInstance { id: id.to_string() })?;
        self.registry.unregister(id).await;

        info!(instance = %id, "entry removed");
        Ok(record.entry)
    }

    /// Drop every live client but keep the records.
    pub async fn shutdown(&self) {
        let mut entries = self.entries.lock().await;
        self.registry.clear().await;
        for record in entries.values_mut() {
            record.state = EntryState::NotLoaded;
        }
    }

    /// All records, in insertion order.
    pub async fn entries(&self) -> Vec<EntryRecord> {
        self.entries.lock().await.values().cloned().collect()
    }

    pub async fn entry(&self, id: &InstanceId) -> Option<EntryRecord> {
        self.entries.lock().await.get(id).cloned()
    }
}

fn ensure_unique_name(
    entries: &IndexMap<InstanceId, EntryRecord>,
    name: &str,
    except: Option<&InstanceId>,
) -> Result<(), CoreError> {
    let taken = entries
        .iter()
        .any(|(id, record)| Some(id) != except && record.entry.display_name() == name);
    if taken {
        return Err(CoreError::AlreadyConfigured {
            name: name.to_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn record(id: &str, name: &str) -> (InstanceId, EntryRecord) {
        let entry = ConfigEntry::new(
            InstanceId::from(id),
            InstanceConfig::new(name, SecretString::from("k".to_owned())),
        );
        (
            entry.id.clone(),
            EntryRecord {
                entry,
                state: EntryState::Loaded,
            },
        )
    }

    #[test]
    fn unique_name_ignores_the_entry_being_edited() {
        let entries: IndexMap<_, _> = [record("a", "North"), record("b", "South")]
            .into_iter()
            .collect();

        assert!(ensure_unique_name(&entries, "West", None).is_ok());
        assert!(matches!(
            ensure_unique_name(&entries, "North", None),
            Err(CoreError::AlreadyConfigured { .. })
        ));
        assert!(ensure_unique_name(&entries, "North", Some(&InstanceId::from("a"))).is_ok());
        assert!(ensure_unique_name(&entries, "North", Some(&InstanceId::from("b"))).is_err());
    }

    #[test]
    fn entry_state_serializes_with_tag() {
        let state = EntryState::SetupError {
            reason: "boom".into(),
        };
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            serde_json::json!({ "state": "setup_error", "reason": "boom" })
        );
    }
}
