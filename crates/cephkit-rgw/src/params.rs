//! Wire parameters of the admin API
//!
//! Every admin call sends a fixed, ordered allow-list of parameters. The
//! table below is the single place those lists are written down.

use reqwest::Method;

/// A request parameter understood by the admin API
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Param {
    Uid,
    Bucket,
    Global,
    RateLimitScope,
    Enabled,
    MaxReadBytes,
    MaxWriteBytes,
    MaxReadOps,
    MaxWriteOps,
    QuotaType,
    MaxSize,
    MaxSizeKb,
    MaxObjects,
}

impl Param {
    /// Name of the parameter on the wire
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Uid => "uid",
            Self::Bucket => "bucket",
            Self::Global => "global",
            Self::RateLimitScope => "ratelimit-scope",
            Self::Enabled => "enabled",
            Self::MaxReadBytes => "max-read-bytes",
            Self::MaxWriteBytes => "max-write-bytes",
            Self::MaxReadOps => "max-read-ops",
            Self::MaxWriteOps => "max-write-ops",
            Self::QuotaType => "quota-type",
            Self::MaxSize => "max-size",
            Self::MaxSizeKb => "max-size-kb",
            Self::MaxObjects => "max-objects",
        }
    }
}

/// Request values that can be encoded as admin parameters
pub trait ToParams {
    /// Encoded value of `param`, or `None` to leave it out
    fn param(&self, param: Param) -> Option<String>;
}

/// Encode a string; empty strings are left out
pub(crate) fn text(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Encode an optional boolean as `true`/`false`
pub(crate) fn flag(value: Option<bool>) -> Option<String> {
    value.map(|v| v.to_string())
}

/// Encode an optional integer in decimal
pub(crate) fn number<N: ToString>(value: Option<N>) -> Option<String> {
    value.map(|v| v.to_string())
}

use Param::*;

const GET_USER_RATELIMIT: &[Param] = &[Uid, RateLimitScope];
const SET_USER_RATELIMIT: &[Param] = &[
    Uid,
    RateLimitScope,
    Enabled,
    MaxReadBytes,
    MaxWriteBytes,
    MaxReadOps,
    MaxWriteOps,
];
const GET_BUCKET_RATELIMIT: &[Param] = &[Bucket, RateLimitScope];
const SET_BUCKET_RATELIMIT: &[Param] = &[
    Bucket,
    RateLimitScope,
    Enabled,
    MaxReadBytes,
    MaxWriteBytes,
    MaxReadOps,
    MaxWriteOps,
];
const GET_GLOBAL_RATELIMIT: &[Param] = &[Global];
const SET_GLOBAL_RATELIMIT: &[Param] = &[
    Global,
    RateLimitScope,
    Enabled,
    MaxReadBytes,
    MaxWriteBytes,
    MaxReadOps,
    MaxWriteOps,
];

const GET_QUOTA: &[Param] = &[Uid, QuotaType];
const SET_QUOTA: &[Param] = &[Uid, QuotaType, Enabled, MaxSize, MaxSizeKb, MaxObjects];
const SET_INDIVIDUAL_BUCKET_QUOTA: &[Param] =
    &[Bucket, Uid, Enabled, MaxSize, MaxSizeKb, MaxObjects];

/// Admin API operations
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    GetUserRateLimit,
    SetUserRateLimit,
    GetBucketRateLimit,
    SetBucketRateLimit,
    GetGlobalRateLimit,
    SetGlobalUserRateLimit,
    SetGlobalBucketRateLimit,
    SetGlobalAnonymousRateLimit,
    GetUserQuota,
    SetUserQuota,
    GetBucketQuota,
    SetBucketQuota,
    SetIndividualBucketQuota,
}

/// Where and how an operation is sent
#[derive(Clone, Debug)]
pub struct Endpoint {
    pub method: Method,
    /// Path below the admin prefix
    pub path: &'static str,
    /// Bare query key selecting a sub-resource, e.g. `quota`
    pub subresource: Option<&'static str>,
    /// Ordered parameter allow-list
    pub params: &'static [Param],
}

impl Operation {
    /// The wire description of this operation
    pub fn endpoint(self) -> Endpoint {
        use Operation::*;

        let (method, path, subresource, params) = match self {
            GetUserRateLimit => (Method::GET, "/ratelimit", None, GET_USER_RATELIMIT),
            SetUserRateLimit => (Method::POST, "/ratelimit", None, SET_USER_RATELIMIT),
            GetBucketRateLimit => (Method::GET, "/ratelimit", None, GET_BUCKET_RATELIMIT),
            SetBucketRateLimit => (Method::POST, "/ratelimit", None, SET_BUCKET_RATELIMIT),
            GetGlobalRateLimit => (Method::GET, "/ratelimit", None, GET_GLOBAL_RATELIMIT),
            SetGlobalUserRateLimit | SetGlobalBucketRateLimit | SetGlobalAnonymousRateLimit => {
                (Method::POST, "/ratelimit", None, SET_GLOBAL_RATELIMIT)
            }
            GetUserQuota | GetBucketQuota => (Method::GET, "/user", Some("quota"), GET_QUOTA),
            SetUserQuota | SetBucketQuota => (Method::PUT, "/user", Some("quota"), SET_QUOTA),
            SetIndividualBucketQuota => (
                Method::PUT,
                "/bucket",
                Some("quota"),
                SET_INDIVIDUAL_BUCKET_QUOTA,
            ),
        };

        Endpoint {
            method,
            path,
            subresource,
            params,
        }
    }
}

/// Encode the allow-listed parameters of `value`, in allow-list order
pub fn encode(value: &impl ToParams, params: &[Param]) -> Vec<(&'static str, String)> {
    params
        .iter()
        .filter_map(|p| value.param(*p).map(|v| (p.wire_name(), v)))
        .collect()
}

/// Percent-encode everything except RFC 3986 unreserved characters
pub(crate) fn uri_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Join a sub-resource key and encoded pairs into a query string
pub(crate) fn query_string(subresource: Option<&str>, pairs: &[(&str, String)]) -> String {
    subresource
        .map(str::to_string)
        .into_iter()
        .chain(
            pairs
                .iter()
                .map(|(k, v)| format!("{}={}", uri_encode(k), uri_encode(v))),
        )
        .collect::<Vec<_>>()
        .join("&")
}
