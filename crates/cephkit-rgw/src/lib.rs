//! # cephkit-rgw
//!
//! A client for the Ceph object gateway admin API.
//!
//! ## Features
//!
//! - **Rate limits**: per user, per bucket and global (user, bucket, anonymous)
//! - **Quotas**: per user, per-user bucket default and individual buckets
//! - **Signing**: AWS Signature V4 with an admin user's key pair
//! - **Validation**: requests missing their target never reach the network
//!
//! ## Example
//!
//! ```rust,ignore
//! use cephkit_rgw::{AdminClient, Config, RateLimitSpec};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = AdminClient::new(
//!         Config::new("http://rgw.local:8080").with_credentials("admin", "secret"),
//!     )?;
//!
//!     client
//!         .set_user_rate_limit(
//!             RateLimitSpec::for_user("alice")
//!                 .with_enabled(true)
//!                 .with_max_read_ops(100),
//!         )
//!         .await?;
//!
//!     let limits = client.get_user_rate_limit(RateLimitSpec::for_user("alice")).await?;
//!     println!("{:?}", limits.user_ratelimit);
//!
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
pub mod params;
mod quota;
mod ratelimit;
pub mod signer;

pub use client::AdminClient;
pub use config::{Config, ParamPlacement};
pub use error::{AdminError, Result, UNMARSHAL_ERROR};
pub use quota::{QuotaSpec, QuotaType};
pub use ratelimit::{
    BucketRateLimit, GlobalRateLimit, RateLimit, RateLimitScope, RateLimitSpec, UserRateLimit,
};
