//! Rate limits for users, buckets and the whole gateway
//!
//! A [`RateLimitSpec`] names its target with exactly one of `uid`, `bucket`
//! or `global = Some(true)`. The scope is always chosen by the operation and
//! overrides whatever the caller put in the spec.

use crate::{
    error::decode,
    params::{flag, number, text, Operation, Param, ToParams},
    AdminClient, AdminError, Result,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Which class of principal a limit applies to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitScope {
    User,
    Bucket,
    Anon,
}

impl RateLimitScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bucket => "bucket",
            Self::Anon => "anon",
        }
    }
}

/// Target and limits of a rate-limit request
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bucket: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<bool>,
    #[serde(rename = "ratelimit-scope", default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<RateLimitScope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_read_bytes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_write_bytes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_read_ops: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_write_ops: Option<i64>,
}

impl RateLimitSpec {
    /// Spec targeting a user
    pub fn for_user(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            ..Default::default()
        }
    }

    /// Spec targeting a bucket
    pub fn for_bucket(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    /// Spec targeting the global limits
    pub fn global() -> Self {
        Self {
            global: Some(true),
            ..Default::default()
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn with_max_read_ops(mut self, ops: i64) -> Self {
        self.max_read_ops = Some(ops);
        self
    }

    pub fn with_max_write_ops(mut self, ops: i64) -> Self {
        self.max_write_ops = Some(ops);
        self
    }

    pub fn with_max_read_bytes(mut self, bytes: i64) -> Self {
        self.max_read_bytes = Some(bytes);
        self
    }

    pub fn with_max_write_bytes(mut self, bytes: i64) -> Self {
        self.max_write_bytes = Some(bytes);
        self
    }

    fn require_uid(&self) -> Result<()> {
        if self.uid.is_empty() {
            return Err(AdminError::MissingUserId);
        }
        Ok(())
    }

    fn require_bucket(&self) -> Result<()> {
        if self.bucket.is_empty() {
            return Err(AdminError::MissingBucket);
        }
        Ok(())
    }

    // Only an explicit `true` counts; `None` and `Some(false)` are rejected.
    fn require_global(&self) -> Result<()> {
        if self.global != Some(true) {
            return Err(AdminError::GlobalFlagMustBeTrue);
        }
        Ok(())
    }
}

impl ToParams for RateLimitSpec {
    fn param(&self, param: Param) -> Option<String> {
        match param {
            Param::Uid => text(&self.uid),
            Param::Bucket => text(&self.bucket),
            Param::Global => flag(self.global),
            Param::RateLimitScope => self.scope.map(|s| s.as_str().to_string()),
            Param::Enabled => flag(self.enabled),
            Param::MaxReadBytes => number(self.max_read_bytes),
            Param::MaxWriteBytes => number(self.max_write_bytes),
            Param::MaxReadOps => number(self.max_read_ops),
            Param::MaxWriteOps => number(self.max_write_ops),
            _ => None,
        }
    }
}

/// Limits as reported by the gateway
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    #[serde(default)]
    pub max_read_ops: Option<i64>,
    #[serde(default)]
    pub max_write_ops: Option<i64>,
    #[serde(default)]
    pub max_read_bytes: Option<i64>,
    #[serde(default)]
    pub max_write_bytes: Option<i64>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRateLimit {
    pub user_ratelimit: RateLimit,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketRateLimit {
    pub bucket_ratelimit: RateLimit,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalRateLimit {
    pub bucket_ratelimit: RateLimit,
    pub user_ratelimit: RateLimit,
    pub anonymous_ratelimit: RateLimit,
}

impl AdminClient {
    /// Read a user's rate limit
    #[instrument(skip(self, spec), fields(uid = %spec.uid))]
    pub async fn get_user_rate_limit(&self, mut spec: RateLimitSpec) -> Result<UserRateLimit> {
        spec.require_uid()?;
        spec.scope = Some(RateLimitScope::User);
        let body = self.call(Operation::GetUserRateLimit, &spec).await?;
        decode(&body)
    }

    /// Write a user's rate limit
    #[instrument(skip(self, spec), fields(uid = %spec.uid))]
    pub async fn set_user_rate_limit(&self, mut spec: RateLimitSpec) -> Result<()> {
        spec.require_uid()?;
        spec.scope = Some(RateLimitScope::User);
        self.call(Operation::SetUserRateLimit, &spec).await?;
        Ok(())
    }

    /// Read a bucket's rate limit
    #[instrument(skip(self, spec), fields(bucket = %spec.bucket))]
    pub async fn get_bucket_rate_limit(&self, mut spec: RateLimitSpec) -> Result<BucketRateLimit> {
        spec.require_bucket()?;
        spec.scope = Some(RateLimitScope::Bucket);
        let body = self.call(Operation::GetBucketRateLimit, &spec).await?;
        decode(&body)
    }

    /// Write a bucket's rate limit
    #[instrument(skip(self, spec), fields(bucket = %spec.bucket))]
    pub async fn set_bucket_rate_limit(&self, mut spec: RateLimitSpec) -> Result<()> {
        spec.require_bucket()?;
        spec.scope = Some(RateLimitScope::Bucket);
        self.call(Operation::SetBucketRateLimit, &spec).await?;
        Ok(())
    }

    /// Read the global user, bucket and anonymous limits
    #[instrument(skip(self))]
    pub async fn get_global_rate_limit(&self) -> Result<GlobalRateLimit> {
        let body = self
            .call(Operation::GetGlobalRateLimit, &RateLimitSpec::global())
            .await?;
        decode(&body)
    }

    /// Write the global limit applied to every user
    #[instrument(skip(self, spec))]
    pub async fn set_global_user_rate_limit(&self, spec: RateLimitSpec) -> Result<()> {
        self.set_global(Operation::SetGlobalUserRateLimit, RateLimitScope::User, spec)
            .await
    }

    /// Write the global limit applied to every bucket
    #[instrument(skip(self, spec))]
    pub async fn set_global_bucket_rate_limit(&self, spec: RateLimitSpec) -> Result<()> {
        self.set_global(Operation::SetGlobalBucketRateLimit, RateLimitScope::Bucket, spec)
            .await
    }

    /// Write the global limit applied to anonymous access
    #[instrument(skip(self, spec))]
    pub async fn set_global_anonymous_rate_limit(&self, spec: RateLimitSpec) -> Result<()> {
        self.set_global(Operation::SetGlobalAnonymousRateLimit, RateLimitScope::Anon, spec)
            .await
    }

    async fn set_global(
        &self,
        op: Operation,
        scope: RateLimitScope,
        mut spec: RateLimitSpec,
    ) -> Result<()> {
        spec.require_global()?;
        spec.scope = Some(scope);
        self.call(op, &spec).await?;
        Ok(())
    }
}
