// ── Instance registry ──
//
// Exclusive owner of the `instance id → live client` mapping. Entries are
// immutable once inserted and replaced as a whole, so a resolve never sees
// a half-updated instance. Callers hold an `Arc` for the duration of one
// call only; a request in flight on a replaced client finishes on it.

use std::sync::Arc;

use campcare_api::{CampingCareClient, ErrorKind};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};
use url::Url;

use crate::config::{ClientSettings, InstanceId, IntegrationInstance};
use crate::error::CoreError;
use crate::validator;

/// A validated, reachable instance.
#[derive(Debug)]
pub struct RegisteredInstance {
    id: InstanceId,
    display_name: String,
    base_url: Url,
    client: CampingCareClient,
    api_version: String,
}

impl RegisteredInstance {
    pub fn id(&self) -> &InstanceId {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn client(&self) -> &CampingCareClient {
        &self.client
    }

    /// Version string reported by the probe that admitted this client.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }
}

/// Process-wide registry of live instances.
///
/// Map changes (`register`, `update`, `unregister`, `clear`) are serialized
/// through one async lock, which is never held across a network probe.
/// Reads go straight to the map.
pub struct InstanceRegistry {
    entries: DashMap<InstanceId, Arc<RegisteredInstance>>,
    settings: ClientSettings,
    mutations: Mutex<()>,
}

impl InstanceRegistry {
    pub fn new(settings: ClientSettings) -> Self {
        Self {
            entries: DashMap::new(),
            settings,
            mutations: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Build a fresh client for `instance` and admit it only if the version
    /// probe succeeds.
    async fn build(&self, instance: &IntegrationInstance) -> Result<RegisteredInstance, CoreError> {
        let client = CampingCareClient::from_api_key(
            instance.base_url.as_str(),
            &instance.credential,
            &self.settings.transport(),
        )?;

        match validator::verify(&client).await {
            Ok(api_version) => Ok(RegisteredInstance {
                id: instance.id.clone(),
                display_name: instance.display_name.clone(),
                base_url: client.base_url().clone(),
                client,
                api_version,
            }),
            Err(err) if err.kind == ErrorKind::Unauthorized => {
                Err(CoreError::AuthenticationFailed {
                    name: instance.display_name.clone(),
                    message: err.message,
                })
            }
            Err(err) => Err(CoreError::SetupFailed {
                name: instance.display_name.clone(),
                reason: err,
            }),
        }
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Validate and insert a new instance. Nothing is inserted on failure.
    ///
    /// The probe runs outside the mutation lock; presence is checked again
    /// before the insert.
    pub async fn register(
        &self,
        instance: &IntegrationInstance,
    ) -> Result<Arc<RegisteredInstance>, CoreError> {
        self.ensure_absent(&instance.id)?;
        let registered = Arc::new(self.build(instance).await?);

        let _guard = self.mutations.lock().await;
        self.ensure_absent(&instance.id)?;
        self.entries
            .insert(instance.id.clone(), Arc::clone(&registered));

        info!(
            instance = %instance.id,
            name = %instance.display_name,
            api_version = %registered.api_version,
            "instance registered"
        );
        Ok(registered)
    }

    /// Replace an instance with a client built from its new settings.
    ///
    /// The old client is never reused. If the new one fails validation the
    /// old entry is removed as well. An instance unregistered while the
    /// probe ran stays gone.
    pub async fn update(
        &self,
        instance: &IntegrationInstance,
    ) -> Result<Arc<RegisteredInstance>, CoreError> {
        self.ensure_present(&instance.id)?;
        let built = self.build(instance).await;

        let _guard = self.mutations.lock().await;
        self.ensure_present(&instance.id)?;
        match built {
            Ok(registered) => {
                let registered = Arc::new(registered);
                self.entries
                    .insert(instance.id.clone(), Arc::clone(&registered));
                info!(instance = %instance.id, name = %instance.display_name, "instance updated");
                Ok(registered)
            }
            Err(err) => {
                self.entries.remove(&instance.id);
                warn!(instance = %instance.id, "update failed, instance removed: {err}");
                Err(err)
            }
        }
    }

    fn ensure_absent(&self, id: &InstanceId) -> Result<(), CoreError> {
        if self.entries.contains_key(id) {
            return Err(CoreError::AlreadyRegistered { id: id.to_string() });
        }
        Ok(())
    }

    fn ensure_present(&self, id: &InstanceId) -> Result<(), CoreError> {
        if !self.entries.contains_key(id) {
            return Err(CoreError::UnknownInstance { id: id.to_string() });
        }
        Ok(())
    }

    /// Drop an instance. Returns the removed entry, if it was present.
    pub async fn unregister(&self, id: &InstanceId) -> Option<Arc<RegisteredInstance>> {
        let _guard = self.mutations.lock().await;
        let removed = self.entries.remove(id).map(|(_, v)| v);
        if removed.is_some() {
            info!(instance = %id, "instance unregistered");
        }
        removed
    }

    /// Remove every instance.
    pub async fn clear(&self) {
        let _guard = self.mutations.lock().await;
        self.entries.clear();
    }

    // ── Lookups ──────────────────────────────────────────────────────

    pub fn resolve(&self, id: &InstanceId) -> Result<Arc<RegisteredInstance>, CoreError> {
        self.entries
            .get(id)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| CoreError::UnknownInstance { id: id.to_string() })
    }

    /// Resolve an explicit id, or fall back to the sole registered instance.
    ///
    /// Without an id, zero instances is `NoInstance` and more than one is
    /// `AmbiguousInstance`.
    pub fn resolve_target(
        &self,
        id: Option<&InstanceId>,
    ) -> Result<Arc<RegisteredInstance>, CoreError> {
        if let Some(id) = id {
            return self.resolve(id);
        }

        let mut all = self.snapshot();
        match all.len() {
            0 => Err(CoreError::NoInstance),
            1 => Ok(all.remove(0)),
            count => Err(CoreError::AmbiguousInstance { count }),
        }
    }

    pub fn contains(&self, id: &InstanceId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All live instances, ordered by id.
    pub fn snapshot(&self) -> Vec<Arc<RegisteredInstance>> {
        let mut all: Vec<_> = self.entries.iter().map(|r| Arc::clone(r.value())).collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }
}

impl Default for InstanceRegistry {
    fn default() -> Self {
        Self::new(ClientSettings::default())
    }
}
