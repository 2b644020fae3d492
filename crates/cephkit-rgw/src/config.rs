//! Client configuration

use std::time::Duration;

/// Where request parameters go for requests that are not `GET`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParamPlacement {
    /// Query string, for every method
    #[default]
    Query,
    /// `application/x-www-form-urlencoded` body for non-`GET` requests
    Body,
}

/// Admin client configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Gateway endpoint URL, e.g. `http://rgw.local:8080`
    pub endpoint: String,
    /// Path prefix of the admin API
    pub admin_prefix: String,
    /// Access key of an admin user
    pub access_key: Option<String>,
    /// Secret key of an admin user
    pub secret_key: Option<String>,
    /// Region used in request signatures
    pub region: String,
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Parameter placement for non-`GET` requests
    pub param_placement: ParamPlacement,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080".to_string(),
            admin_prefix: "/admin".to_string(),
            access_key: None,
            secret_key: None,
            region: "default".to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("cephkit-rgw/{}", env!("CARGO_PKG_VERSION")),
            param_placement: ParamPlacement::Query,
        }
    }
}

impl Config {
    /// Create a new config with the given endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Set the admin credentials
    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    /// Set the signing region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set where non-`GET` parameters are sent
    pub fn with_param_placement(mut self, placement: ParamPlacement) -> Self {
        self.param_placement = placement;
        self
    }

    /// Base URL of the admin API
    pub fn admin_url(&self) -> String {
        format!(
            "{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.admin_prefix.trim_matches('/')
        )
    }
}
