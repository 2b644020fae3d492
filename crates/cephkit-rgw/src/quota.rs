//! User and bucket quotas

use crate::{
    error::decode,
    params::{flag, number, text, Operation, Param, ToParams},
    AdminClient, AdminError, Result,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Which quota of a user is addressed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaType {
    /// Limits on the user as a whole
    User,
    /// Default limits on each bucket the user owns
    Bucket,
}

impl QuotaType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bucket => "bucket",
        }
    }
}

/// Quota request and response
///
/// Negative sizes and counts mean "unlimited" to the gateway.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaSpec {
    #[serde(rename = "user_id", default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bucket: String,
    #[serde(skip)]
    pub quota_type: Option<QuotaType>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub check_on_raw: bool,
    #[serde(default)]
    pub max_size: Option<i64>,
    #[serde(default)]
    pub max_size_kb: Option<i64>,
    #[serde(default)]
    pub max_objects: Option<i64>,
}

impl QuotaSpec {
    /// Quota of a user
    pub fn for_user(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            ..Default::default()
        }
    }

    /// Quota of one bucket owned by `uid`
    pub fn for_bucket(uid: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn with_max_size(mut self, bytes: i64) -> Self {
        self.max_size = Some(bytes);
        self
    }

    pub fn with_max_objects(mut self, objects: i64) -> Self {
        self.max_objects = Some(objects);
        self
    }
}

impl ToParams for QuotaSpec {
    fn param(&self, param: Param) -> Option<String> {
        match param {
            Param::Uid => text(&self.uid),
            Param::Bucket => text(&self.bucket),
            Param::QuotaType => self.quota_type.map(|t| t.as_str().to_string()),
            Param::Enabled => flag(self.enabled),
            Param::MaxSize => number(self.max_size),
            Param::MaxSizeKb => number(self.max_size_kb),
            Param::MaxObjects => number(self.max_objects),
            _ => None,
        }
    }
}

impl AdminClient {
    /// Read a user's quota
    #[instrument(skip(self, spec), fields(uid = %spec.uid))]
    pub async fn get_user_quota(&self, spec: QuotaSpec) -> Result<QuotaSpec> {
        self.get_quota(Operation::GetUserQuota, QuotaType::User, spec)
            .await
    }

    /// Write a user's quota
    #[instrument(skip(self, spec), fields(uid = %spec.uid))]
    pub async fn set_user_quota(&self, spec: QuotaSpec) -> Result<()> {
        self.set_quota(Operation::SetUserQuota, QuotaType::User, spec)
            .await
    }

    /// Read the default quota applied to each of a user's buckets
    #[instrument(skip(self, spec), fields(uid = %spec.uid))]
    pub async fn get_bucket_quota(&self, spec: QuotaSpec) -> Result<QuotaSpec> {
        self.get_quota(Operation::GetBucketQuota, QuotaType::Bucket, spec)
            .await
    }

    /// Write the default quota applied to each of a user's buckets
    #[instrument(skip(self, spec), fields(uid = %spec.uid))]
    pub async fn set_bucket_quota(&self, spec: QuotaSpec) -> Result<()> {
        self.set_quota(Operation::SetBucketQuota, QuotaType::Bucket, spec)
            .await
    }

    /// Write the quota of one bucket
    #[instrument(skip(self, spec), fields(uid = %spec.uid, bucket = %spec.bucket))]
    pub async fn set_individual_bucket_quota(&self, spec: QuotaSpec) -> Result<()> {
        if spec.uid.is_empty() {
            return Err(AdminError::MissingUserId);
        }
        if spec.bucket.is_empty() {
            return Err(AdminError::MissingBucket);
        }
        self.call(Operation::SetIndividualBucketQuota, &spec).await?;
        Ok(())
    }

    async fn get_quota(
        &self,
        op: Operation,
        quota_type: QuotaType,
        mut spec: QuotaSpec,
    ) -> Result<QuotaSpec> {
        if spec.uid.is_empty() {
            return Err(AdminError::MissingUserId);
        }
        spec.quota_type = Some(quota_type);
        let body = self.call(op, &spec).await?;
        decode(&body)
    }

    async fn set_quota(&self, op: Operation, quota_type: QuotaType, mut spec: QuotaSpec) -> Result<()> {
        if spec.uid.is_empty() {
            return Err(AdminError::MissingUserId);
        }
        spec.quota_type = Some(quota_type);
        self.call(op, &spec).await?;
        Ok(())
    }
}
