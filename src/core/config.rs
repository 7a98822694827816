//! Gateway configuration (`formgate.toml`).
//!
//! Every field has a default, so an absent file is a valid configuration.
//! Lookup order: explicit `--config` path, then `FORMGATE_CONFIG`, then
//! `./formgate.toml` when present.

use crate::core::error::FormgateError;
use crate::core::schemas;
use crate::core::store::StoreKind;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "FORMGATE_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "formgate.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    /// First segment of every document location; the root collection tag is `<namespace>/fr`.
    pub namespace: String,
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub attachments: AttachmentConfig,
    pub search: SearchConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            namespace: "orbeon".to_string(),
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            attachments: AttachmentConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    pub workers: usize,
    pub max_body_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            workers: 4,
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub backend: StoreKind,
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreKind::Sqlite,
            path: PathBuf::from(schemas::DOCUMENT_DB_NAME),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttachmentConfig {
    /// MIME types accepted for attachments. Empty accepts everything.
    pub allowed_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<(), FormgateError> {
        let ns_ok = !self.namespace.is_empty()
            && self.namespace != "."
            && self.namespace != ".."
            && self
                .namespace
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~'));
        if !ns_ok {
            return Err(FormgateError::ConfigError(format!(
                "namespace '{}' must be a non-empty path segment of [A-Za-z0-9._~-]",
                self.namespace
            )));
        }
        if self.server.workers == 0 {
            return Err(FormgateError::ConfigError(
                "server.workers must be at least 1".to_string(),
            ));
        }
        if self.search.default_page_size == 0
            || self.search.default_page_size > self.search.max_page_size
        {
            return Err(FormgateError::ConfigError(format!(
                "search.default_page_size ({}) must be between 1 and search.max_page_size ({})",
                self.search.default_page_size, self.search.max_page_size
            )));
        }
        Ok(())
    }
}

pub fn parse_config(content: &str) -> Result<GatewayConfig, FormgateError> {
    let config: GatewayConfig =
        toml::from_str(content).map_err(|e| FormgateError::ConfigError(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Resolve which config file applies, if any.
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(CONFIG_ENV)
        && !path.is_empty()
    {
        return Some(PathBuf::from(path));
    }
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    local.exists().then_some(local)
}

/// Load configuration. A missing default file means defaults; a missing explicit file is an error.
pub fn load_config(explicit: Option<&Path>) -> Result<GatewayConfig, FormgateError> {
    let Some(path) = config_path(explicit) else {
        return Ok(GatewayConfig::default());
    };
    let content = fs::read_to_string(&path).map_err(|e| {
        FormgateError::ConfigError(format!("cannot read {}: {}", path.display(), e))
    })?;
    parse_config(&content)
}
