//! Layered CLI settings
//!
//! Lowest to highest precedence: built-in defaults, an optional TOML
//! profile, `CEPHKIT_*` environment variables (`__` separates sections,
//! e.g. `CEPHKIT_RGW__ENDPOINT`), then command-line flags.

use cephkit_rgw::ParamPlacement;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Everything a profile can configure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub rgw: RgwSettings,
    pub rados: RadosSettings,
}

/// Admin API connection settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RgwSettings {
    pub endpoint: String,
    pub admin_prefix: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub region: String,
    pub timeout_secs: u64,
    /// `query` or `body`
    pub param_placement: String,
}

impl Default for RgwSettings {
    fn default() -> Self {
        let defaults = cephkit_rgw::Config::default();
        Self {
            endpoint: defaults.endpoint,
            admin_prefix: defaults.admin_prefix,
            access_key: None,
            secret_key: None,
            region: defaults.region,
            timeout_secs: defaults.timeout.as_secs(),
            param_placement: "query".to_string(),
        }
    }
}

/// Cluster connection settings for group commands
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RadosSettings {
    pub client_id: String,
    pub conf_file: Option<String>,
}

impl Default for RadosSettings {
    fn default() -> Self {
        Self {
            client_id: "admin".to_string(),
            conf_file: None,
        }
    }
}

/// Flag values that override the loaded settings
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub region: Option<String>,
}

impl Settings {
    /// Load defaults, the profile at `path` (if any) and the environment
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix("CEPHKIT")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Apply command-line overrides
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(endpoint) = overrides.endpoint {
            self.rgw.endpoint = endpoint;
        }
        if let Some(access_key) = overrides.access_key {
            self.rgw.access_key = Some(access_key);
        }
        if let Some(secret_key) = overrides.secret_key {
            self.rgw.secret_key = Some(secret_key);
        }
        if let Some(region) = overrides.region {
            self.rgw.region = region;
        }
    }

    /// Admin client configuration
    pub fn rgw_config(&self) -> anyhow::Result<cephkit_rgw::Config> {
        let placement = match self.rgw.param_placement.to_ascii_lowercase().as_str() {
            "query" => ParamPlacement::Query,
            "body" => ParamPlacement::Body,
            other => anyhow::bail!("unknown param_placement {:?}, expected query or body", other),
        };

        let mut config = cephkit_rgw::Config::new(&self.rgw.endpoint)
            .with_region(&self.rgw.region)
            .with_timeout(Duration::from_secs(self.rgw.timeout_secs))
            .with_param_placement(placement);
        config.admin_prefix = self.rgw.admin_prefix.clone();
        config.access_key = self.rgw.access_key.clone();
        config.secret_key = self.rgw.secret_key.clone();
        Ok(config)
    }
}
