//! cephkit - Ceph group and gateway administration

use cephkit_cli::commands::{self, QuotaCommand, RateLimitCommand};
use cephkit_cli::{Overrides, Settings};
use cephkit_rgw::AdminClient;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "cephkit")]
#[command(about = "Manage Ceph block device groups and object gateway limits")]
#[command(version)]
struct Args {
    /// TOML profile to load
    #[arg(short, long, global = true, env = "CEPHKIT_CONFIG")]
    config: Option<PathBuf>,

    /// Gateway endpoint URL
    #[arg(long, global = true, env = "CEPHKIT_ENDPOINT")]
    endpoint: Option<String>,

    /// Admin access key
    #[arg(long, global = true, env = "CEPHKIT_ACCESS_KEY")]
    access_key: Option<String>,

    /// Admin secret key
    #[arg(long, global = true, env = "CEPHKIT_SECRET_KEY", hide_env_values = true)]
    secret_key: Option<String>,

    /// Signing region
    #[arg(long, global = true, env = "CEPHKIT_REGION")]
    region: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true, env = "CEPHKIT_DEBUG")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Gateway rate limits
    #[command(subcommand)]
    Ratelimit(RateLimitCommand),

    /// Gateway quotas
    #[command(subcommand)]
    Quota(QuotaCommand),

    /// Block device groups
    #[cfg(feature = "librbd")]
    Group {
        /// Pool holding the groups
        #[arg(short, long, default_value = "rbd")]
        pool: String,
        #[command(subcommand)]
        command: commands::group::GroupCommand,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!(
                "cephkit={0},cephkit_cli={0},cephkit_rgw={0},cephkit_rbd={0}",
                log_level
            )
            .into()
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut settings = Settings::load(args.config.as_deref())?;
    settings.apply(Overrides {
        endpoint: args.endpoint,
        access_key: args.access_key,
        secret_key: args.secret_key,
        region: args.region,
    });

    match args.command {
        Command::Ratelimit(command) => {
            let client = AdminClient::new(settings.rgw_config()?)?;
            tracing::debug!(endpoint = %client.config().endpoint, "Using admin endpoint");
            commands::run_ratelimit(&client, command).await
        }
        Command::Quota(command) => {
            let client = AdminClient::new(settings.rgw_config()?)?;
            commands::run_quota(&client, command).await
        }
        #[cfg(feature = "librbd")]
        Command::Group { pool, command } => commands::group::run(&settings.rados, &pool, command),
    }
}
