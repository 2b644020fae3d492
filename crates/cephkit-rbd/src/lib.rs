//! # cephkit-rbd
//!
//! Group management bindings for the Ceph block device library.
//!
//! This crate provides:
//! - **Groups**: create, remove, rename and list named collections of images
//! - **Membership**: add and remove images, possibly across pools
//! - **Group snapshots**: create, rename, list and remove
//! - **Backends**: the system `librbd` (feature `librbd`) or an in-memory
//!   cluster for tests
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │      group / image functions (&IoCtx)   │
//! ├─────────────────────────────────────────┤
//! │            NativeRbd trait              │
//! ├────────────────────┬────────────────────┤
//! │       LibRbd       │   MemoryCluster    │
//! ├────────────────────┼────────────────────┤
//! │  librados / librbd │      in-process    │
//! └────────────────────┴────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use cephkit_rbd::{group, MemoryCluster};
//!
//! # fn main() -> cephkit_rbd::Result<()> {
//! let cluster = MemoryCluster::new();
//! cluster.create_pool("rbd")?;
//! let io = cluster.open_ioctx("rbd")?;
//!
//! group::create(&io, "web")?;
//! assert_eq!(group::list(&io)?, vec!["web".to_string()]);
//! group::remove(&io, "web")?;
//! # Ok(())
//! # }
//! ```

mod buffer;
pub mod error;
pub mod group;
pub mod image;
pub mod ioctx;
#[cfg(feature = "librbd")]
pub mod librbd;
pub mod memory;
pub mod native;

pub use error::{RbdError, Result};
pub use ioctx::IoCtx;
#[cfg(feature = "librbd")]
pub use librbd::{LibRbd, Rados, RadosConfig};
pub use memory::MemoryCluster;
pub use native::{
    GroupImageInfo, GroupImageState, GroupSnapInfo, GroupSnapState, NativeRbd, RawIoCtx,
};
