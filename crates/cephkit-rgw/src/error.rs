//! Admin client error types

use serde::Deserialize;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, AdminError>;

/// Prefix of decode failures, followed by the raw body
pub const UNMARSHAL_ERROR: &str = "failed to unmarshal radosgw http response";

/// Admin client errors
#[derive(Error, Debug)]
pub enum AdminError {
    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway rejected the request
    #[error("{code} (status {status}, request id {request_id:?})")]
    Api {
        status: u16,
        code: String,
        request_id: Option<String>,
        host_id: Option<String>,
        /// Raw body when it was not a gateway error document
        body: Option<String>,
    },

    /// The response body did not have the expected shape
    #[error("failed to unmarshal radosgw http response. {body}. {source}")]
    Unmarshal {
        body: String,
        #[source]
        source: serde_json::Error,
    },

    /// A user id is required for this operation
    #[error("missing user ID")]
    MissingUserId,

    /// A bucket name is required for this operation
    #[error("missing bucket")]
    MissingBucket,

    /// Global operations need the global flag explicitly set
    #[error("global rate limit flag must be set to true")]
    GlobalFlagMustBeTrue,

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Error document returned by the gateway
#[derive(Debug, Deserialize)]
struct ErrorDocument {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "RequestId")]
    request_id: Option<String>,
    #[serde(rename = "HostId")]
    host_id: Option<String>,
}

impl AdminError {
    /// Build an error from a non-success response body.
    ///
    /// Bodies that are not an error document (proxy pages, empty bodies)
    /// get the code `HTTP{status}` and are kept in `body`.
    pub fn from_response(body: &str, status: u16) -> Self {
        match serde_json::from_str::<ErrorDocument>(body) {
            Ok(doc) => Self::Api {
                status,
                code: doc.code,
                request_id: doc.request_id,
                host_id: doc.host_id,
                body: None,
            },
            Err(_) => {
                let body = body.trim();
                Self::Api {
                    status,
                    code: format!("HTTP{}", status),
                    request_id: None,
                    host_id: None,
                    body: (!body.is_empty()).then(|| body.to_string()),
                }
            }
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { code, .. } if code.starts_with("NoSuch"))
    }

    /// Check if this is an access denied error
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::Api { code, .. } if code == "AccessDenied")
    }

    /// Check if the request was rejected before reaching the gateway
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingUserId | Self::MissingBucket | Self::GlobalFlagMustBeTrue
        )
    }
}

/// Decode a JSON body, keeping the raw body on failure
pub(crate) fn decode<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|source| AdminError::Unmarshal {
        body: String::from_utf8_lossy(body).into_owned(),
        source,
    })
}
