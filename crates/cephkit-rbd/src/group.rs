//! Group management
//!
//! A group is a named collection of images that can be snapshotted as a
//! unit. Groups and their member images may live in different pools, so the
//! membership calls take one pool context for the group and one for the
//! image.
//!
//! Every function panics when handed a destroyed [`IoCtx`]. The membership
//! calls also panic when the two contexts come from different cluster
//! connections. Both are caller misuse, not cluster errors. Errors reported
//! by the cluster come back as [`RbdError`](crate::RbdError).

use crate::buffer::{fill_buffer, split_nul_terminated, to_cstring};
use crate::error::{check, Result};
use crate::ioctx::IoCtx;
use crate::native::{GroupImageInfo, GroupSnapInfo};
use tracing::{debug, instrument};

/// Create a group
#[instrument(skip(io), fields(pool = io.pool_name()))]
pub fn create(io: &IoCtx, name: &str) -> Result<()> {
    let raw = io.validate();
    let name = to_cstring(name)?;
    check(io.native().group_create(raw, &name))?;
    Ok(())
}

/// Remove a group.
///
/// Removing a group that does not exist succeeds.
#[instrument(skip(io), fields(pool = io.pool_name()))]
pub fn remove(io: &IoCtx, name: &str) -> Result<()> {
    let raw = io.validate();
    let cname = to_cstring(name)?;
    match check(io.native().group_remove(raw, &cname)) {
        Ok(_) => Ok(()),
        Err(e) if e.is_not_found() => {
            debug!(group = name, "group already absent");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Rename a group.
///
/// Unlike [`remove`], a missing source group is an error.
#[instrument(skip(io), fields(pool = io.pool_name()))]
pub fn rename(io: &IoCtx, src: &str, dst: &str) -> Result<()> {
    let raw = io.validate();
    let src = to_cstring(src)?;
    let dst = to_cstring(dst)?;
    check(io.native().group_rename(raw, &src, &dst))?;
    Ok(())
}

/// List the names of all groups in a pool.
///
/// Order is unspecified. An empty pool yields an empty vector.
#[instrument(skip(io), fields(pool = io.pool_name()))]
pub fn list(io: &IoCtx) -> Result<Vec<String>> {
    let raw = io.validate();
    let native = io.native();
    let (buf, ret) = fill_buffer(|buf, size| native.group_list(raw, buf, size))?;
    // On success the status is the number of bytes used, the size is not
    // updated.
    let used = (ret as usize).min(buf.len());
    let names = split_nul_terminated(&buf[..used]);
    debug!(count = names.len(), "listed groups");
    Ok(names)
}

/// Add an image to a group
#[instrument(skip(group_io, image_io), fields(group_pool = group_io.pool_name(), image_pool = image_io.pool_name()))]
pub fn image_add(group_io: &IoCtx, group: &str, image_io: &IoCtx, image: &str) -> Result<()> {
    let (group_raw, image_raw) = IoCtx::validate_pair(group_io, image_io);
    let group = to_cstring(group)?;
    let image = to_cstring(image)?;
    check(
        group_io
            .native()
            .group_image_add(group_raw, &group, image_raw, &image),
    )?;
    Ok(())
}

/// Remove an image from a group
#[instrument(skip(group_io, image_io), fields(group_pool = group_io.pool_name(), image_pool = image_io.pool_name()))]
pub fn image_remove(group_io: &IoCtx, group: &str, image_io: &IoCtx, image: &str) -> Result<()> {
    let (group_raw, image_raw) = IoCtx::validate_pair(group_io, image_io);
    let group = to_cstring(group)?;
    let image = to_cstring(image)?;
    check(
        group_io
            .native()
            .group_image_remove(group_raw, &group, image_raw, &image),
    )?;
    Ok(())
}

/// Remove an image from a group, identifying the image by id.
///
/// Useful when the image has already been renamed or trashed.
#[instrument(skip(group_io, image_io), fields(group_pool = group_io.pool_name(), image_pool = image_io.pool_name()))]
pub fn image_remove_by_id(
    group_io: &IoCtx,
    group: &str,
    image_io: &IoCtx,
    image_id: &str,
) -> Result<()> {
    let (group_raw, image_raw) = IoCtx::validate_pair(group_io, image_io);
    let group = to_cstring(group)?;
    let image_id = to_cstring(image_id)?;
    check(
        group_io
            .native()
            .group_image_remove_by_id(group_raw, &group, image_raw, &image_id),
    )?;
    Ok(())
}

/// List the images that belong to a group
#[instrument(skip(io), fields(pool = io.pool_name()))]
pub fn image_list(io: &IoCtx, group: &str) -> Result<Vec<GroupImageInfo>> {
    let raw = io.validate();
    let group = to_cstring(group)?;
    let mut images = Vec::new();
    check(io.native().group_image_list(raw, &group, &mut images))?;
    Ok(images)
}

/// Take a snapshot of every image in a group
#[instrument(skip(io), fields(pool = io.pool_name()))]
pub fn snap_create(io: &IoCtx, group: &str, snap: &str) -> Result<()> {
    let raw = io.validate();
    let group = to_cstring(group)?;
    let snap = to_cstring(snap)?;
    check(io.native().group_snap_create(raw, &group, &snap))?;
    Ok(())
}

/// Remove a group snapshot
#[instrument(skip(io), fields(pool = io.pool_name()))]
pub fn snap_remove(io: &IoCtx, group: &str, snap: &str) -> Result<()> {
    let raw = io.validate();
    let group = to_cstring(group)?;
    let snap = to_cstring(snap)?;
    check(io.native().group_snap_remove(raw, &group, &snap))?;
    Ok(())
}

/// Rename a group snapshot
#[instrument(skip(io), fields(pool = io.pool_name()))]
pub fn snap_rename(io: &IoCtx, group: &str, old_name: &str, new_name: &str) -> Result<()> {
    let raw = io.validate();
    let group = to_cstring(group)?;
    let old_name = to_cstring(old_name)?;
    let new_name = to_cstring(new_name)?;
    check(
        io.native()
            .group_snap_rename(raw, &group, &old_name, &new_name),
    )?;
    Ok(())
}

/// List the snapshots of a group
#[instrument(skip(io), fields(pool = io.pool_name()))]
pub fn snap_list(io: &IoCtx, group: &str) -> Result<Vec<GroupSnapInfo>> {
    let raw = io.validate();
    let group = to_cstring(group)?;
    let mut snaps = Vec::new();
    check(io.native().group_snap_list(raw, &group, &mut snaps))?;
    Ok(snaps)
}
