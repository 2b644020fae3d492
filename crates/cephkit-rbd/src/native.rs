//! The native library seam
//!
//! Every group and image operation bottoms out in one of these calls. They
//! keep the C calling convention of `librbd`: the return value is a status
//! code, negative errno on failure, and list results are written into
//! caller-provided storage.

use std::ffi::{c_void, CStr};
use std::os::raw::c_int;
use std::ptr;

/// Raw pool context handle (`rados_ioctx_t`).
///
/// The handle is only an address; it is never dereferenced on the Rust
/// side, only handed back to the backend that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawIoCtx(*mut c_void);

// The backends synchronize access to the pool behind the handle.
unsafe impl Send for RawIoCtx {}
unsafe impl Sync for RawIoCtx {}

impl RawIoCtx {
    /// The null handle
    pub const fn null() -> Self {
        Self(ptr::null_mut())
    }

    /// Wrap a handle returned by the native library
    pub const fn from_ptr(ptr: *mut c_void) -> Self {
        Self(ptr)
    }

    /// The pointer to hand back to the native library
    pub fn as_ptr(self) -> *mut c_void {
        self.0
    }

    /// Check if this is the null handle
    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

/// State of an image inside a group
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupImageState {
    /// The image is a member of the group
    Attached,
    /// Membership change was interrupted
    Incomplete,
}

/// An image that belongs to a group
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupImageInfo {
    /// Image name
    pub name: String,
    /// Id of the pool holding the image
    pub pool_id: i64,
    /// Membership state
    pub state: GroupImageState,
}

/// State of a group snapshot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupSnapState {
    /// Snapshot creation was interrupted
    Incomplete,
    /// Every member image has been snapshotted
    Complete,
}

/// A group snapshot
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupSnapInfo {
    /// Snapshot name
    pub name: String,
    /// Snapshot state
    pub state: GroupSnapState,
}

/// Status-code level interface to the block device library
pub trait NativeRbd: Send + Sync {
    /// Identity of the cluster connection that issued the handles.
    ///
    /// Handles are only meaningful to the connection that opened them.
    fn cluster_id(&self) -> usize;

    /// Release a pool context handle
    fn ioctx_destroy(&self, io: RawIoCtx);

    /// Create a group
    fn group_create(&self, io: RawIoCtx, name: &CStr) -> c_int;

    /// Remove a group
    fn group_remove(&self, io: RawIoCtx, name: &CStr) -> c_int;

    /// Rename a group
    fn group_rename(&self, io: RawIoCtx, src: &CStr, dst: &CStr) -> c_int;

    /// Write NUL-terminated group names into `names`.
    ///
    /// Returns the number of bytes written. When `names` is too small,
    /// returns `-ERANGE` and stores the required length in `size`.
    fn group_list(&self, io: RawIoCtx, names: &mut [u8], size: &mut usize) -> c_int;

    /// Add an image to a group
    fn group_image_add(
        &self,
        group_io: RawIoCtx,
        group: &CStr,
        image_io: RawIoCtx,
        image: &CStr,
    ) -> c_int;

    /// Remove an image from a group
    fn group_image_remove(
        &self,
        group_io: RawIoCtx,
        group: &CStr,
        image_io: RawIoCtx,
        image: &CStr,
    ) -> c_int;

    /// Remove an image from a group by image id
    fn group_image_remove_by_id(
        &self,
        group_io: RawIoCtx,
        group: &CStr,
        image_io: RawIoCtx,
        image_id: &CStr,
    ) -> c_int;

    /// Replace the contents of `images` with the members of a group
    fn group_image_list(
        &self,
        io: RawIoCtx,
        group: &CStr,
        images: &mut Vec<GroupImageInfo>,
    ) -> c_int;

    /// Snapshot every image in a group
    fn group_snap_create(&self, io: RawIoCtx, group: &CStr, snap: &CStr) -> c_int;

    /// Remove a group snapshot
    fn group_snap_remove(&self, io: RawIoCtx, group: &CStr, snap: &CStr) -> c_int;

    /// Rename a group snapshot
    fn group_snap_rename(
        &self,
        io: RawIoCtx,
        group: &CStr,
        old_name: &CStr,
        new_name: &CStr,
    ) -> c_int;

    /// Replace the contents of `snaps` with the snapshots of a group
    fn group_snap_list(
        &self,
        io: RawIoCtx,
        group: &CStr,
        snaps: &mut Vec<GroupSnapInfo>,
    ) -> c_int;

    /// Create an image of `size` bytes with `2^order` byte objects
    fn image_create(&self, io: RawIoCtx, name: &CStr, size: u64, order: c_int) -> c_int;

    /// Remove an image
    fn image_remove(&self, io: RawIoCtx, name: &CStr) -> c_int;

    /// Write the NUL-terminated id of an image into `id`.
    ///
    /// Same `-ERANGE` contract as [`NativeRbd::group_list`].
    fn image_get_id(&self, io: RawIoCtx, name: &CStr, id: &mut [u8], size: &mut usize) -> c_int;
}
