//! Admin API client

use crate::{
    config::ParamPlacement,
    params::{encode, query_string, Operation, ToParams},
    signer::Signer,
    AdminError, Config, Result,
};
use bytes::Bytes;
use chrono::Utc;
use reqwest::{header, Client, Method};
use tracing::debug;
use url::Url;

/// Client for the object gateway admin API
#[derive(Clone)]
pub struct AdminClient {
    config: Config,
    http: Client,
    signer: Option<Signer>,
}

impl AdminClient {
    /// Create a new client with the given configuration
    pub fn new(config: Config) -> Result<Self> {
        Url::parse(&config.endpoint)
            .map_err(|e| AdminError::Config(format!("invalid endpoint {:?}: {}", config.endpoint, e)))?;

        let signer = match (&config.access_key, &config.secret_key) {
            (Some(access), Some(secret)) => Some(Signer::new(access, secret, &config.region)),
            (None, None) => None,
            _ => {
                return Err(AdminError::Config(
                    "access key and secret key must be set together".to_string(),
                ))
            }
        };

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            config
                .user_agent
                .parse()
                .map_err(|_| AdminError::Config(format!("invalid user agent {:?}", config.user_agent)))?,
        );

        let http = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(AdminError::Http)?;

        Ok(Self {
            config,
            http,
            signer,
        })
    }

    /// Create an unauthenticated client for an endpoint URL
    pub fn with_endpoint(endpoint: &str) -> Result<Self> {
        Self::new(Config::new(endpoint))
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Send one admin request and return the raw response body.
    ///
    /// Single attempt, no retries.
    pub(crate) async fn call(&self, op: Operation, value: &impl ToParams) -> Result<Bytes> {
        let endpoint = op.endpoint();
        let pairs = encode(value, endpoint.params);

        let params_in_body = endpoint.method != Method::GET
            && self.config.param_placement == ParamPlacement::Body;
        let (query, body) = if params_in_body {
            (
                query_string(endpoint.subresource, &[]),
                query_string(None, &pairs),
            )
        } else {
            (query_string(endpoint.subresource, &pairs), String::new())
        };

        let mut url = Url::parse(&format!("{}{}", self.config.admin_url(), endpoint.path))
            .map_err(|e| AdminError::Config(format!("invalid admin URL: {}", e)))?;
        if !query.is_empty() {
            url.set_query(Some(&query));
        }

        let mut req = self.http.request(endpoint.method.clone(), url.clone());
        if params_in_body {
            req = req.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        }
        if let Some(signer) = &self.signer {
            for (name, value) in signer.sign(&endpoint.method, &url, body.as_bytes(), Utc::now()) {
                req = req.header(name, value);
            }
        }
        if !body.is_empty() {
            req = req.body(body);
        }

        debug!(?op, method = %endpoint.method, %url, "Sending admin request");
        let response = req.send().await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            return Err(AdminError::from_response(
                &String::from_utf8_lossy(&bytes),
                status.as_u16(),
            ));
        }

        Ok(bytes)
    }
}

impl std::fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClient")
            .field("endpoint", &self.config.endpoint)
            .field("signed", &self.signer.is_some())
            .finish()
    }
}
