//! Instance management: list, add, update, remove, probe.
//!
//! Add and update validate against the live API through the lifecycle
//! manager before (add) or while (update) the config file is rewritten.

use std::sync::Arc;

use secrecy::SecretString;
use serde::Serialize;
use tabled::Tabled;

use campcare_config::{Config, EntryData, EntryOverrides, StoredEntry};
use campcare_core::{
    DEFAULT_API_URL, InstanceConfig, InstanceId, InstanceOptions, InstanceRegistry,
    IntegrationManager,
};

use crate::cli::{GlobalOpts, InstancesArgs, InstancesCommand, KeySourceArgs, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

// ── Views ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct InstanceView {
    id: String,
    display_name: String,
    base_url: String,
    key_source: String,
}

impl InstanceView {
    fn new(id: &str, entry: &StoredEntry) -> Self {
        Self {
            id: id.to_owned(),
            display_name: entry.display_name().to_owned(),
            base_url: entry.base_url().to_owned(),
            key_source: key_source(entry),
        }
    }
}

#[derive(Tabled)]
struct InstanceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Base URL")]
    base_url: String,
    #[tabled(rename = "Key")]
    key: String,
}

impl From<&InstanceView> for InstanceRow {
    fn from(v: &InstanceView) -> Self {
        Self {
            id: v.id.clone(),
            name: v.display_name.clone(),
            base_url: v.base_url.clone(),
            key: v.key_source.clone(),
        }
    }
}

#[derive(Serialize)]
struct ProbeView {
    id: String,
    display_name: String,
    base_url: String,
    connected: bool,
    api_version: String,
}

fn probe_detail(p: &ProbeView) -> String {
    output::detail(&[
        ("ID", Some(p.id.clone())),
        ("Name", Some(p.display_name.clone())),
        ("Base URL", Some(p.base_url.clone())),
        ("Status", Some(output::status_marker(p.connected))),
        ("API version", Some(p.api_version.clone())),
    ])
}

/// Where the key in effect comes from, without reading the keyring.
fn key_source(entry: &StoredEntry) -> String {
    let env = |name: Option<&str>| name.map(|n| format!("env:{n}"));
    env(entry.options.api_key_env.as_deref())
        .or_else(|| entry.options.api_key.as_ref().map(|_| "config".into()))
        .or_else(|| env(entry.data.api_key_env.as_deref()))
        .or_else(|| entry.data.api_key.as_ref().map(|_| "config".into()))
        .unwrap_or_else(|| "keyring".into())
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Resolve the key a command line supplies, if any.
fn supplied_key(key: &KeySourceArgs) -> Result<Option<String>, CliError> {
    if let Some(ref var) = key.api_key_env {
        return std::env::var(var).map(Some).map_err(|_| CliError::Validation {
            field: "api_key_env".into(),
            reason: format!("environment variable {var} is not set"),
        });
    }
    Ok(key.api_key.clone())
}

fn name_taken(cfg: &Config, name: &str, except: Option<&str>) -> bool {
    cfg.entries
        .iter()
        .any(|(id, e)| Some(id.as_str()) != except && e.display_name().trim() == name.trim())
}

fn manager(cfg: &Config, global: &GlobalOpts) -> IntegrationManager {
    let registry = Arc::new(InstanceRegistry::new(config::client_settings(cfg, global)));
    IntegrationManager::new(registry)
}

fn note(global: &GlobalOpts, message: &str) {
    if !global.quiet {
        eprintln!("{message}");
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: InstancesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = config::config_file(global);
    let mut cfg = campcare_config::load_config_from(&path)?;
    let format = config::output_format(&cfg, global);

    match args.command {
        InstancesCommand::List => list(&cfg, format, global),

        InstancesCommand::Add {
            name,
            base_url,
            key,
        } => {
            add(&mut cfg, name, base_url, &key, global).await?;
            campcare_config::save_config_to(&cfg, &path)?;
            Ok(())
        }

        InstancesCommand::Update {
            instance,
            name,
            base_url,
            key,
        } => {
            let outcome = update(&mut cfg, &instance, name, base_url, &key, global).await;
            // Options persist even when the rebuilt client fails validation.
            if !matches!(outcome, Err(UpdateError::Rejected(_))) {
                campcare_config::save_config_to(&cfg, &path)?;
            }
            outcome.map_err(CliError::from)
        }

        InstancesCommand::Remove { instance } => {
            let id = cfg
                .find(&instance)
                .map(|(id, _)| id.to_owned())
                .ok_or_else(|| CliError::UnknownInstance {
                    identifier: instance.clone(),
                })?;
            cfg.entries.shift_remove(&id);
            campcare_config::save_config_to(&cfg, &path)?;
            campcare_config::forget_api_key(&id);
            note(global, &format!("Instance '{instance}' removed"));
            Ok(())
        }

        InstancesCommand::Probe { instance } => probe(&cfg, instance.as_deref(), format, global).await,
    }
}

fn list(cfg: &Config, format: OutputFormat, global: &GlobalOpts) -> Result<(), CliError> {
    let views: Vec<InstanceView> = cfg
        .entries
        .iter()
        .map(|(id, entry)| InstanceView::new(id, entry))
        .collect();
    let out = output::render_list(format, &views, |v| InstanceRow::from(v), |v| v.id.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

async fn add(
    cfg: &mut Config,
    name: String,
    base_url: Option<String>,
    key: &KeySourceArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if name_taken(cfg, &name, None) {
        return Err(CliError::Conflict { name });
    }
    let api_key = supplied_key(key)?.ok_or_else(|| CliError::Validation {
        field: "api_key".into(),
        reason: "an API key is required (--api-key or --api-key-env)".into(),
    })?;
    let base_url = base_url.unwrap_or_else(|| DEFAULT_API_URL.into());

    let manager = manager(cfg, global);
    let entry = manager
        .setup(
            InstanceConfig::new(name.clone(), SecretString::from(api_key.clone()))
                .with_base_url(base_url.clone()),
        )
        .await?;
    let version = manager
        .registry()
        .resolve(&entry.id)
        .map(|instance| instance.api_version().to_owned())?;
    manager.shutdown().await;

    if key.keyring {
        campcare_config::store_api_key(entry.id.as_str(), &api_key)?;
    }
    let plaintext = !key.keyring && key.api_key_env.is_none();
    cfg.entries.insert(
        entry.id.to_string(),
        StoredEntry {
            data: EntryData {
                display_name: name.clone(),
                base_url,
                api_key: plaintext.then_some(api_key),
                api_key_env: key.api_key_env.clone(),
            },
            options: EntryOverrides::default(),
        },
    );

    note(global, &format!("Instance '{name}' added (API {version})"));
    output::print_output(entry.id.as_str(), global.quiet);
    Ok(())
}

/// Failure of an update, split by whether the config should be rewritten.
enum UpdateError {
    /// Rejected before anything changed.
    Rejected(CliError),
    /// Options were stored; the rebuilt client failed.
    Failed(CliError),
}

impl From<UpdateError> for CliError {
    fn from(err: UpdateError) -> Self {
        match err {
            UpdateError::Rejected(e) | UpdateError::Failed(e) => e,
        }
    }
}

async fn update(
    cfg: &mut Config,
    instance: &str,
    name: Option<String>,
    base_url: Option<String>,
    key: &KeySourceArgs,
    global: &GlobalOpts,
) -> Result<(), UpdateError> {
    let (id, current) = cfg
        .find(instance)
        .map(|(id, entry)| (id.to_owned(), entry.clone()))
        .ok_or_else(|| {
            UpdateError::Rejected(CliError::UnknownInstance {
                identifier: instance.to_owned(),
            })
        })?;

    if let Some(ref name) = name {
        if name_taken(cfg, name, Some(&id)) {
            return Err(UpdateError::Rejected(CliError::Conflict { name: name.clone() }));
        }
    }
    let api_key = supplied_key(key).map_err(UpdateError::Rejected)?;
    if name.is_none() && base_url.is_none() && api_key.is_none() {
        return Err(UpdateError::Rejected(CliError::Validation {
            field: "options".into(),
            reason: "nothing to update (--name, --base-url or an API key)".into(),
        }));
    }

    let mut candidate = current.clone();
    if key.keyring {
        if let Some(ref api_key) = api_key {
            campcare_config::store_api_key(&id, api_key)
                .map_err(|e| UpdateError::Rejected(e.into()))?;
        }
        // The keyring becomes the only key source.
        candidate.data.api_key = None;
        candidate.data.api_key_env = None;
        candidate.options.api_key = None;
        candidate.options.api_key_env = None;
    }
    candidate.options.merge(EntryOverrides {
        display_name: name.clone(),
        base_url: base_url.clone(),
        api_key: api_key
            .clone()
            .filter(|_| !key.keyring && key.api_key_env.is_none()),
        api_key_env: key.api_key_env.clone(),
    });

    let manager = manager(cfg, global);
    let instance_id = InstanceId::from(id.as_str());
    let result = match campcare_config::to_config_entry(&id, &current) {
        // Only the edited settings are probed, never the current ones.
        Ok(entry) => match manager.restore(entry).await {
            Ok(()) => manager
                .update_options(
                    &instance_id,
                    InstanceOptions {
                        display_name: name,
                        base_url,
                        credential: api_key.map(SecretString::from),
                    },
                )
                .await
                .map(drop),
            Err(err) => Err(err),
        },
        // No usable key before the update: validate the candidate directly.
        Err(_) => match campcare_config::to_config_entry(&id, &candidate) {
            Ok(entry) => manager.load(entry).await,
            Err(err) => Err(campcare_core::CoreError::Validation {
                field: "api_key".into(),
                reason: err.to_string(),
            }),
        },
    };
    manager.shutdown().await;

    if let Some(stored) = cfg.entries.get_mut(&id) {
        *stored = candidate;
    }

    result.map_err(|e| UpdateError::Failed(e.into()))?;
    note(global, &format!("Instance '{instance}' updated"));
    Ok(())
}

async fn probe(
    cfg: &Config,
    instance: Option<&str>,
    format: OutputFormat,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let (id, stored) = config::select_entry(cfg, instance.or(global.instance.as_deref()))?;
    let entry = campcare_config::to_config_entry(id, stored)?;

    let manager = manager(cfg, global);
    manager.load(entry).await?;
    let live = manager.registry().resolve(&InstanceId::from(id))?;

    let view = ProbeView {
        id: id.to_owned(),
        display_name: live.display_name().to_owned(),
        base_url: live.base_url().to_string(),
        connected: true,
        api_version: live.api_version().to_owned(),
    };
    manager.shutdown().await;

    let out = output::render_single(format, &view, probe_detail, |p| p.api_version.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
