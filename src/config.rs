//! Component J: layered configuration.
//!
//! Defaults < config file (TOML, loaded if present) < CLI flags, in
//! the style of this corpus's application configuration modules (see
//! e.g. the teacher's `AppConfig::load_from`) — except this core has no
//! persistent state of its own, so there is nothing to migrate or save
//! back: the layering only ever produces one [`RunConfig`] for a single
//! invocation.

use crate::backend::http::HttpBackendConfig;
use crate::backend::DEFAULT_PAGE_SIZE;
use crate::error::FillError;
use crate::model::TaxonId;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Which of the two passes (spec §6 CLI surface: `--ancestors` /
/// `--descendants` / `--both`) a run should execute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSelection {
    pub upward: bool,
    pub downward: bool,
}

impl PassSelection {
    pub fn both() -> Self {
        Self { upward: true, downward: true }
    }

    pub fn is_empty(self) -> bool {
        !self.upward && !self.downward
    }
}

/// Where and how to reach the document store.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendSettings {
    /// Backend hosts, e.g. `["http://localhost:9200"]`. The first is
    /// used as the adapter's base URL; the rest are accepted for
    /// forward compatibility with a future load-balancing adapter.
    #[serde(default = "default_hosts")]
    pub es_hosts: Vec<String>,
    #[serde(default = "default_index")]
    pub index: String,
    #[serde(default = "default_retry_seconds")]
    pub max_retry_seconds: u64,
}

fn default_hosts() -> Vec<String> {
    vec!["http://localhost:9200".to_string()]
}

fn default_index() -> String {
    "taxa".to_string()
}

fn default_retry_seconds() -> u64 {
    30
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            es_hosts: default_hosts(),
            index: default_index(),
            max_retry_seconds: default_retry_seconds(),
        }
    }
}

impl BackendSettings {
    pub fn http_backend_config(&self) -> HttpBackendConfig {
        let base_url = self
            .es_hosts
            .first()
            .cloned()
            .unwrap_or_else(|| default_hosts()[0].clone());
        HttpBackendConfig {
            base_url,
            index: self.index.clone(),
            max_retry_elapsed: Duration::from_secs(self.max_retry_seconds),
        }
    }
}

/// Fully resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub root: TaxonId,
    pub passes: PassSelection,
    pub page_size: usize,
    pub backend: BackendSettings,
    /// Run the selected passes and log what would be submitted without
    /// calling `bulk_update` (spec's ambient `--dry-run` flag).
    pub dry_run: bool,
}

impl RunConfig {
    /// spec §7's "config error ... fatal before any backend I/O"
    /// check: a blank root is the one config fault this crate itself
    /// can detect without consulting the attribute type table (unknown
    /// traverse attribute keys are validated by the CLI against the
    /// type table before calling into the library).
    pub fn validate(&self) -> Result<(), FillError> {
        if self.root.trim().is_empty() {
            return Err(FillError::Config {
                detail: "root taxon id must not be empty".to_string(),
            });
        }
        if self.passes.is_empty() {
            return Err(FillError::Config {
                detail: "at least one of --ancestors, --descendants, --both must be set"
                    .to_string(),
            });
        }
        Ok(())
    }
}

/// The on-disk shape of the optional TOML config file. Every field is
/// optional: values present here sit between the hardcoded defaults
/// and whatever the CLI flags override.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub root: Option<TaxonId>,
    pub page_size: Option<usize>,
    pub dry_run: Option<bool>,
    #[serde(default)]
    pub backend: PartialBackendSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialBackendSettings {
    pub es_hosts: Option<Vec<String>>,
    pub index: Option<String>,
    pub max_retry_seconds: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, FillError> {
        let text = std::fs::read_to_string(path).map_err(|err| FillError::Config {
            detail: format!("failed to read config file {}: {err}", path.display()),
        })?;
        toml::from_str(&text).map_err(|err| FillError::Config {
            detail: format!("failed to parse config file {}: {err}", path.display()),
        })
    }
}

/// The config file path the CLI falls back to when `--config` is not
/// given: `$XDG_CONFIG_HOME/taxafill/config.toml` (and platform
/// equivalents via `dirs::config_dir`).
pub fn default_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|dir| dir.join("taxafill").join("config.toml"))
}

/// CLI-flag overrides, each `None` meaning "not passed, defer to the
/// file / defaults below it".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root: Option<TaxonId>,
    pub passes: PassSelection,
    pub page_size: Option<usize>,
    pub es_hosts: Vec<String>,
    pub index: Option<String>,
    pub dry_run: bool,
}

/// Merge a parsed (optional) file config with CLI overrides into a
/// final [`RunConfig`], then validate it.
pub fn resolve(file: Option<FileConfig>, cli: CliOverrides) -> Result<RunConfig, FillError> {
    let file = file.unwrap_or_default();

    let root = cli
        .root
        .or(file.root)
        .ok_or_else(|| FillError::Config {
            detail: "no root taxon id given (pass --root or set `root` in the config file)"
                .to_string(),
        })?;

    let mut backend = BackendSettings {
        es_hosts: file.backend.es_hosts.unwrap_or_else(default_hosts),
        index: file.backend.index.unwrap_or_else(default_index),
        max_retry_seconds: file.backend.max_retry_seconds.unwrap_or_else(default_retry_seconds),
    };
    if !cli.es_hosts.is_empty() {
        backend.es_hosts = cli.es_hosts;
    }
    if let Some(index) = cli.index {
        backend.index = index;
    }

    let config = RunConfig {
        root,
        passes: if cli.passes.is_empty() { PassSelection::both() } else { cli.passes },
        page_size: cli.page_size.or(file.page_size).unwrap_or(DEFAULT_PAGE_SIZE),
        backend,
        dry_run: cli.dry_run || file.dry_run.unwrap_or(false),
    };
    config.validate()?;
    Ok(config)
}
