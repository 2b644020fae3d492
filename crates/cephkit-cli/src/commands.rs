//! Subcommands

use cephkit_rgw::{AdminClient, QuotaSpec, RateLimitSpec};
use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;

/// Limit values shared by every `set` command
#[derive(Args, Clone, Debug, Default)]
pub struct LimitArgs {
    /// Enable or disable the limit
    #[arg(long)]
    pub enabled: Option<bool>,
    /// Maximum read operations per minute
    #[arg(long)]
    pub max_read_ops: Option<i64>,
    /// Maximum write operations per minute
    #[arg(long)]
    pub max_write_ops: Option<i64>,
    /// Maximum bytes read per minute
    #[arg(long)]
    pub max_read_bytes: Option<i64>,
    /// Maximum bytes written per minute
    #[arg(long)]
    pub max_write_bytes: Option<i64>,
}

impl LimitArgs {
    fn apply(self, spec: RateLimitSpec) -> RateLimitSpec {
        RateLimitSpec {
            enabled: self.enabled,
            max_read_ops: self.max_read_ops,
            max_write_ops: self.max_write_ops,
            max_read_bytes: self.max_read_bytes,
            max_write_bytes: self.max_write_bytes,
            ..spec
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlobalScope {
    User,
    Bucket,
    Anon,
}

#[derive(Subcommand, Debug)]
pub enum RateLimitCommand {
    /// Show a user's rate limit
    GetUser { uid: String },
    /// Set a user's rate limit
    SetUser {
        uid: String,
        #[command(flatten)]
        limits: LimitArgs,
    },
    /// Show a bucket's rate limit
    GetBucket { bucket: String },
    /// Set a bucket's rate limit
    SetBucket {
        bucket: String,
        #[command(flatten)]
        limits: LimitArgs,
    },
    /// Show the global rate limits
    GetGlobal,
    /// Set a global rate limit
    SetGlobal {
        #[arg(long, value_enum)]
        scope: GlobalScope,
        #[command(flatten)]
        limits: LimitArgs,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuotaKind {
    /// The user's own quota
    User,
    /// The default quota of each of the user's buckets
    Bucket,
}

#[derive(Args, Clone, Debug, Default)]
pub struct QuotaArgs {
    #[arg(long)]
    pub enabled: Option<bool>,
    /// Maximum size in bytes, negative for unlimited
    #[arg(long, allow_hyphen_values = true)]
    pub max_size: Option<i64>,
    /// Maximum number of objects, negative for unlimited
    #[arg(long, allow_hyphen_values = true)]
    pub max_objects: Option<i64>,
}

impl QuotaArgs {
    fn apply(self, spec: QuotaSpec) -> QuotaSpec {
        QuotaSpec {
            enabled: self.enabled,
            max_size: self.max_size,
            max_objects: self.max_objects,
            ..spec
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum QuotaCommand {
    /// Show a user or per-user bucket quota
    Get {
        uid: String,
        #[arg(long = "type", value_enum, default_value = "user")]
        kind: QuotaKind,
    },
    /// Set a user or per-user bucket quota
    Set {
        uid: String,
        #[arg(long = "type", value_enum, default_value = "user")]
        kind: QuotaKind,
        #[command(flatten)]
        quota: QuotaArgs,
    },
    /// Set the quota of a single bucket
    SetBucket {
        uid: String,
        bucket: String,
        #[command(flatten)]
        quota: QuotaArgs,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn run_ratelimit(client: &AdminClient, command: RateLimitCommand) -> anyhow::Result<()> {
    match command {
        RateLimitCommand::GetUser { uid } => {
            print_json(&client.get_user_rate_limit(RateLimitSpec::for_user(uid)).await?)?
        }
        RateLimitCommand::SetUser { uid, limits } => {
            client
                .set_user_rate_limit(limits.apply(RateLimitSpec::for_user(uid)))
                .await?
        }
        RateLimitCommand::GetBucket { bucket } => print_json(
            &client
                .get_bucket_rate_limit(RateLimitSpec::for_bucket(bucket))
                .await?,
        )?,
        RateLimitCommand::SetBucket { bucket, limits } => {
            client
                .set_bucket_rate_limit(limits.apply(RateLimitSpec::for_bucket(bucket)))
                .await?
        }
        RateLimitCommand::GetGlobal => print_json(&client.get_global_rate_limit().await?)?,
        RateLimitCommand::SetGlobal { scope, limits } => {
            let spec = limits.apply(RateLimitSpec::global());
            match scope {
                GlobalScope::User => client.set_global_user_rate_limit(spec).await?,
                GlobalScope::Bucket => client.set_global_bucket_rate_limit(spec).await?,
                GlobalScope::Anon => client.set_global_anonymous_rate_limit(spec).await?,
            }
        }
    }
    Ok(())
}

pub async fn run_quota(client: &AdminClient, command: QuotaCommand) -> anyhow::Result<()> {
    match command {
        QuotaCommand::Get { uid, kind } => {
            let spec = QuotaSpec::for_user(uid);
            let quota = match kind {
                QuotaKind::User => client.get_user_quota(spec).await?,
                QuotaKind::Bucket => client.get_bucket_quota(spec).await?,
            };
            print_json(&quota)?
        }
        QuotaCommand::Set { uid, kind, quota } => {
            let spec = quota.apply(QuotaSpec::for_user(uid));
            match kind {
                QuotaKind::User => client.set_user_quota(spec).await?,
                QuotaKind::Bucket => client.set_bucket_quota(spec).await?,
            }
        }
        QuotaCommand::SetBucket { uid, bucket, quota } => {
            client
                .set_individual_bucket_quota(quota.apply(QuotaSpec::for_bucket(uid, bucket)))
                .await?
        }
    }
    Ok(())
}

#[cfg(feature = "librbd")]
pub mod group {
    //! Group commands against a live cluster

    use crate::settings::RadosSettings;
    use cephkit_rbd::{group, Rados, RadosConfig};
    use clap::Subcommand;

    #[derive(Subcommand, Debug)]
    pub enum GroupCommand {
        /// Create a group
        Create { name: String },
        /// Remove a group; succeeds if it does not exist
        Remove { name: String },
        /// Rename a group
        Rename { src: String, dst: String },
        /// List groups in the pool
        List,
        /// Add an image to a group
        ImageAdd {
            group: String,
            image: String,
            /// Pool holding the image, defaults to the group's pool
            #[arg(long)]
            image_pool: Option<String>,
        },
        /// Remove an image from a group
        ImageRemove {
            group: String,
            image: String,
            #[arg(long)]
            image_pool: Option<String>,
        },
        /// List the images of a group
        ImageList { group: String },
        /// Snapshot a group
        SnapCreate { group: String, snap: String },
        /// Remove a group snapshot
        SnapRemove { group: String, snap: String },
        /// List group snapshots
        SnapList { group: String },
    }

    pub fn run(settings: &RadosSettings, pool: &str, command: GroupCommand) -> anyhow::Result<()> {
        let mut config = RadosConfig::new(&settings.client_id);
        if let Some(conf_file) = &settings.conf_file {
            config = config.with_conf_file(conf_file);
        }
        let rados = Rados::connect(&config)?;
        let io = rados.open_ioctx(pool)?;

        match command {
            GroupCommand::Create { name } => group::create(&io, &name)?,
            GroupCommand::Remove { name } => group::remove(&io, &name)?,
            GroupCommand::Rename { src, dst } => group::rename(&io, &src, &dst)?,
            GroupCommand::List => {
                for name in group::list(&io)? {
                    println!("{}", name);
                }
            }
            GroupCommand::ImageAdd {
                group: name,
                image,
                image_pool,
            } => match image_pool {
                Some(image_pool) => {
                    let image_io = rados.open_ioctx(&image_pool)?;
                    group::image_add(&io, &name, &image_io, &image)?
                }
                None => group::image_add(&io, &name, &io, &image)?,
            },
            GroupCommand::ImageRemove {
                group: name,
                image,
                image_pool,
            } => match image_pool {
                Some(image_pool) => {
                    let image_io = rados.open_ioctx(&image_pool)?;
                    group::image_remove(&io, &name, &image_io, &image)?
                }
                None => group::image_remove(&io, &name, &io, &image)?,
            },
            GroupCommand::ImageList { group: name } => {
                for info in group::image_list(&io, &name)? {
                    println!("{}\t{}\t{:?}", info.pool_id, info.name, info.state);
                }
            }
            GroupCommand::SnapCreate { group: name, snap } => {
                group::snap_create(&io, &name, &snap)?
            }
            GroupCommand::SnapRemove { group: name, snap } => {
                group::snap_remove(&io, &name, &snap)?
            }
            GroupCommand::SnapList { group: name } => {
                for snap in group::snap_list(&io, &name)? {
                    println!("{}\t{:?}", snap.name, snap.state);
                }
            }
        }
        Ok(())
    }
}
