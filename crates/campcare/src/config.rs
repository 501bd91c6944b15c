//! Wiring between the stored config and a running core host.
//!
//! Selects the entry a command runs against, applies CLI transport
//! overrides, and brings that one entry up through the lifecycle manager.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;

use campcare_config::{Config, StoredEntry};
use campcare_core::{
    ClientSettings, Dispatcher, InstanceId, InstanceRegistry, IntegrationManager, TlsVerification,
};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

/// A loaded entry plus the dispatcher that serves it.
pub struct Host {
    pub manager: IntegrationManager,
    pub dispatcher: Dispatcher,
    pub instance_id: InstanceId,
}

/// Config file in effect: `--config`, else the platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(campcare_config::config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(campcare_config::load_config_from(&config_file(global))?)
}

/// Output format: `--output`, else `defaults.output`, else table.
pub fn output_format(cfg: &Config, global: &GlobalOpts) -> OutputFormat {
    global
        .output
        .or_else(|| OutputFormat::from_str(&cfg.defaults.output, true).ok())
        .unwrap_or(OutputFormat::Table)
}

/// Transport settings from the file, with `--timeout` / `--insecure` on top.
pub fn client_settings(cfg: &Config, global: &GlobalOpts) -> ClientSettings {
    let mut settings = cfg.client_settings();
    if let Some(secs) = global.timeout {
        settings.timeout = Duration::from_secs(secs);
    }
    if global.insecure {
        settings.tls = TlsVerification::DangerAcceptInvalid;
    }
    settings
}

/// Pick the entry to run against.
///
/// An explicit selector matches id or display name. Without one, exactly
/// one entry must exist.
pub fn select_entry<'a>(
    cfg: &'a Config,
    wanted: Option<&str>,
) -> Result<(&'a str, &'a StoredEntry), CliError> {
    if let Some(wanted) = wanted {
        return cfg.find(wanted).ok_or_else(|| CliError::UnknownInstance {
            identifier: wanted.to_owned(),
        });
    }

    match cfg.entries.len() {
        0 => Err(CliError::NoInstance),
        1 => cfg
            .entries
            .first()
            .map(|(id, entry)| (id.as_str(), entry))
            .ok_or(CliError::NoInstance),
        count => Err(CliError::AmbiguousInstance { count }),
    }
}

/// Load the selected entry and return a host ready to dispatch to it.
pub async fn connect(cfg: &Config, global: &GlobalOpts) -> Result<Host, CliError> {
    let (id, stored) = select_entry(cfg, global.instance.as_deref())?;
    let entry = campcare_config::to_config_entry(id, stored)?;

    let registry = Arc::new(InstanceRegistry::new(client_settings(cfg, global)));
    let manager = IntegrationManager::new(Arc::clone(&registry));
    manager.load(entry).await?;

    Ok(Host {
        manager,
        dispatcher: Dispatcher::new(registry),
        instance_id: InstanceId::from(id),
    })
}
