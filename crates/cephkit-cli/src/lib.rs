//! # cephkit
//!
//! Command-line front end for the cephkit libraries.
//!
//! - **ratelimit**: user, bucket and global limits via the gateway admin API
//! - **quota**: user, per-user bucket and individual bucket quotas
//! - **group**: block device groups (built with the `librbd` feature)

pub mod commands;
pub mod settings;

pub use settings::{Overrides, Settings};
