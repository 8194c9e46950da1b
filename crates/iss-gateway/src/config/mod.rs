//! Configuration loading and resolution.

use crate::error::{GatewayError, GatewayResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "https://iss.moex.com/iss";
pub const DEFAULT_LISTEN: &str = "127.0.0.1:4000";
pub const CONFIG_FILE_NAME: &str = "iss-gateway.json";

/// What to do when one reference page cannot be turned into fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnReferenceError {
    /// Log a warning, record the reference as skipped, keep going.
    #[default]
    Skip,
    /// Fail the whole schema assembly.
    Abort,
}

/// One ISS reference page to expose as query fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSource {
    /// Numeric reference id (`/iss/reference/<id>`).
    pub id: u32,
    /// Prefix for generated field names, e.g. `security` → `securityBoards`.
    #[serde(default)]
    pub prefix: Option<String>,
    /// Default values for path placeholders.
    #[serde(default)]
    pub default_args: BTreeMap<String, String>,
    /// Block name → field name overrides, applied before prefixing.
    #[serde(default)]
    pub name_replaces: BTreeMap<String, String>,
}

impl ReferenceSource {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            prefix: None,
            default_args: BTreeMap::new(),
            name_replaces: BTreeMap::new(),
        }
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_string());
        self
    }

    pub fn with_default(mut self, name: &str, value: &str) -> Self {
        self.default_args.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_replace(mut self, block: &str, field: &str) -> Self {
        self.name_replaces
            .insert(block.to_string(), field.to_string());
        self
    }
}

/// Gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    pub listen: String,
    pub timeout_ms: u64,
    /// Maximum reference pages fetched at once during assembly.
    pub concurrency: usize,
    pub on_reference_error: OnReferenceError,
    pub references: Vec<ReferenceSource>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            listen: DEFAULT_LISTEN.to_string(),
            timeout_ms: 10_000,
            concurrency: 4,
            on_reference_error: OnReferenceError::Skip,
            references: default_references(),
        }
    }
}

/// The reference pages exposed when no configuration file is given.
pub fn default_references() -> Vec<ReferenceSource> {
    let turnovers = |source: ReferenceSource| {
        source
            .with_replace("turnoversprevdate", "turnoversPreviousDate")
            .with_replace("turnoverssectors", "turnoversSectors")
            .with_replace("turnoverssectorsprevdate", "turnoversSectorsPreviousDate")
    };

    vec![
        ReferenceSource::new(5),
        ReferenceSource::new(13).with_prefix("security"),
        turnovers(ReferenceSource::new(24)),
        ReferenceSource::new(28)
            .with_replace("boardgroups", "boardGroups")
            .with_replace("securitytypes", "securityTypes")
            .with_replace("securitygroups", "securityGroups")
            .with_replace("securitycollections", "securityCollections"),
        ReferenceSource::new(160).with_prefix("security"),
        ReferenceSource::new(214).with_prefix("security"),
        turnovers(
            ReferenceSource::new(95)
                .with_prefix("engine")
                .with_default("engine", "stock"),
        ),
    ]
}

impl GatewayConfig {
    /// Load a configuration file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> GatewayResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| GatewayError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve and load the effective configuration.
    ///
    /// Order: explicit path > `ISS_GATEWAY_CONFIG` > `./iss-gateway.json` >
    /// built-in defaults. `ISS_BASE_URL` overrides the base URL afterwards.
    pub fn load(explicit: Option<&str>) -> GatewayResult<Self> {
        let mut config = match resolve_config_path(explicit) {
            Some(path) => {
                tracing::info!("Loading configuration from {}", path.display());
                Self::from_file(&path)?
            }
            None => Self::default(),
        };

        if let Ok(base_url) = std::env::var("ISS_BASE_URL") {
            config.base_url = base_url;
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> GatewayResult<()> {
        url::Url::parse(&self.base_url)
            .map_err(|e| GatewayError::Config(format!("base_url {:?}: {e}", self.base_url)))?;
        if self.concurrency == 0 {
            return Err(GatewayError::Config("concurrency must be at least 1".into()));
        }
        let mut seen = Vec::new();
        for source in &self.references {
            if seen.contains(&source.id) {
                return Err(GatewayError::Config(format!(
                    "reference {} is listed twice",
                    source.id
                )));
            }
            seen.push(source.id);
        }
        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Resolve the configuration file path, if any.
pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }

    if let Ok(env_path) = std::env::var("ISS_GATEWAY_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    None
}
