//! Bindings to the system `librados` and `librbd`
//!
//! Only built with the `librbd` feature. Linking needs the Ceph client
//! development libraries (`librados-dev`/`librbd-dev` or
//! `librados-devel`/`librbd-devel`).

#![allow(non_camel_case_types)]

use crate::buffer::to_cstring;
use crate::error::{check, Result};
use crate::ioctx::IoCtx;
use crate::native::{
    GroupImageInfo, GroupImageState, GroupSnapInfo, GroupSnapState, NativeRbd, RawIoCtx,
};
use std::ffi::{c_void, CStr};
use std::os::raw::{c_char, c_int};
use std::path::PathBuf;
use std::ptr;
use std::sync::Arc;
use tracing::{debug, info};

type rados_t = *mut c_void;
type rados_ioctx_t = *mut c_void;
type rbd_image_t = *mut c_void;

#[repr(C)]
struct rbd_group_image_info_t {
    name: *mut c_char,
    pool: i64,
    state: c_int,
}

#[repr(C)]
struct rbd_group_snap_info_t {
    name: *mut c_char,
    state: c_int,
}

const RBD_GROUP_IMAGE_STATE_ATTACHED: c_int = 0;
const RBD_GROUP_SNAP_STATE_COMPLETE: c_int = 1;

/// Initial number of entries for struct list calls
const INITIAL_ENTRIES: usize = 16;

#[link(name = "rados")]
extern "C" {
    fn rados_create(cluster: *mut rados_t, id: *const c_char) -> c_int;
    fn rados_conf_read_file(cluster: rados_t, path: *const c_char) -> c_int;
    fn rados_conf_set(cluster: rados_t, option: *const c_char, value: *const c_char) -> c_int;
    fn rados_connect(cluster: rados_t) -> c_int;
    fn rados_shutdown(cluster: rados_t);
    fn rados_pool_create(cluster: rados_t, pool_name: *const c_char) -> c_int;
    fn rados_pool_delete(cluster: rados_t, pool_name: *const c_char) -> c_int;
    fn rados_ioctx_create(
        cluster: rados_t,
        pool_name: *const c_char,
        ioctx: *mut rados_ioctx_t,
    ) -> c_int;
    fn rados_ioctx_destroy(io: rados_ioctx_t);
}

#[link(name = "rbd")]
extern "C" {
    fn rbd_group_create(p: rados_ioctx_t, name: *const c_char) -> c_int;
    fn rbd_group_remove(p: rados_ioctx_t, name: *const c_char) -> c_int;
    fn rbd_group_rename(p: rados_ioctx_t, src_name: *const c_char, dest_name: *const c_char)
        -> c_int;
    fn rbd_group_list(p: rados_ioctx_t, names: *mut c_char, size: *mut usize) -> c_int;
    fn rbd_group_image_add(
        group_p: rados_ioctx_t,
        group_name: *const c_char,
        image_p: rados_ioctx_t,
        image_name: *const c_char,
    ) -> c_int;
    fn rbd_group_image_remove(
        group_p: rados_ioctx_t,
        group_name: *const c_char,
        image_p: rados_ioctx_t,
        image_name: *const c_char,
    ) -> c_int;
    fn rbd_group_image_remove_by_id(
        group_p: rados_ioctx_t,
        group_name: *const c_char,
        image_p: rados_ioctx_t,
        image_id: *const c_char,
    ) -> c_int;
    fn rbd_group_image_list(
        group_p: rados_ioctx_t,
        group_name: *const c_char,
        images: *mut rbd_group_image_info_t,
        group_image_info_size: usize,
        num_entries: *mut usize,
    ) -> c_int;
    fn rbd_group_image_list_cleanup(
        images: *mut rbd_group_image_info_t,
        group_image_info_size: usize,
        num_entries: usize,
    ) -> c_int;
    fn rbd_group_snap_create(
        group_p: rados_ioctx_t,
        group_name: *const c_char,
        snap_name: *const c_char,
    ) -> c_int;
    fn rbd_group_snap_remove(
        group_p: rados_ioctx_t,
        group_name: *const c_char,
        snap_name: *const c_char,
    ) -> c_int;
    fn rbd_group_snap_rename(
        group_p: rados_ioctx_t,
        group_name: *const c_char,
        old_snap_name: *const c_char,
        new_snap_name: *const c_char,
    ) -> c_int;
    fn rbd_group_snap_list(
        group_p: rados_ioctx_t,
        group_name: *const c_char,
        snaps: *mut rbd_group_snap_info_t,
        group_snap_info_size: usize,
        num_entries: *mut usize,
    ) -> c_int;
    fn rbd_group_snap_list_cleanup(
        snaps: *mut rbd_group_snap_info_t,
        group_snap_info_size: usize,
        num_entries: usize,
    ) -> c_int;
    fn rbd_create(io: rados_ioctx_t, name: *const c_char, size: u64, order: *mut c_int) -> c_int;
    fn rbd_remove(io: rados_ioctx_t, name: *const c_char) -> c_int;
    fn rbd_open(
        io: rados_ioctx_t,
        name: *const c_char,
        image: *mut rbd_image_t,
        snap_name: *const c_char,
    ) -> c_int;
    fn rbd_close(image: rbd_image_t) -> c_int;
    fn rbd_get_id(image: rbd_image_t, id: *mut c_char, id_len: usize) -> c_int;
}

/// Connection settings for a cluster
#[derive(Clone, Debug, Default)]
pub struct RadosConfig {
    /// Client id without the `client.` prefix; the library default is `admin`
    pub client_id: Option<String>,
    /// Configuration file; the library search path when unset
    pub conf_file: Option<PathBuf>,
    /// Extra configuration options applied after the file
    pub options: Vec<(String, String)>,
}

impl RadosConfig {
    /// Create a config for the given client id
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            ..Default::default()
        }
    }

    /// Read this configuration file
    pub fn with_conf_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.conf_file = Some(path.into());
        self
    }

    /// Set a configuration option
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((key.into(), value.into()));
        self
    }
}

struct ClusterHandle(rados_t);

// librados cluster handles may be shared between threads.
unsafe impl Send for ClusterHandle {}
unsafe impl Sync for ClusterHandle {}

impl Drop for ClusterHandle {
    fn drop(&mut self) {
        debug!("shutting down cluster connection");
        unsafe { rados_shutdown(self.0) };
    }
}

/// [`NativeRbd`] backed by the system libraries.
///
/// Keeps the cluster connection alive for as long as any pool context
/// opened through it.
pub struct LibRbd {
    cluster: ClusterHandle,
}

/// A connected cluster
#[derive(Clone)]
pub struct Rados {
    native: Arc<LibRbd>,
}

impl Rados {
    /// Connect to a cluster
    pub fn connect(config: &RadosConfig) -> Result<Self> {
        let id = config.client_id.as_deref().map(to_cstring).transpose()?;
        let mut cluster: rados_t = ptr::null_mut();
        check(unsafe {
            rados_create(
                &mut cluster,
                id.as_ref().map_or(ptr::null(), |id| id.as_ptr()),
            )
        })?;
        // From here on the handle is shut down on every exit path.
        let handle = ClusterHandle(cluster);

        let conf = config
            .conf_file
            .as_ref()
            .map(|p| to_cstring(&p.to_string_lossy()))
            .transpose()?;
        check(unsafe {
            rados_conf_read_file(
                handle.0,
                conf.as_ref().map_or(ptr::null(), |c| c.as_ptr()),
            )
        })?;
        for (key, value) in &config.options {
            let key = to_cstring(key)?;
            let value = to_cstring(value)?;
            check(unsafe { rados_conf_set(handle.0, key.as_ptr(), value.as_ptr()) })?;
        }
        check(unsafe { rados_connect(handle.0) })?;
        info!(client = ?config.client_id, "connected to cluster");

        Ok(Self {
            native: Arc::new(LibRbd { cluster: handle }),
        })
    }

    /// Open a pool context
    pub fn open_ioctx(&self, pool: &str) -> Result<IoCtx> {
        let name = to_cstring(pool)?;
        let mut io: rados_ioctx_t = ptr::null_mut();
        check(unsafe { rados_ioctx_create(self.native.cluster.0, name.as_ptr(), &mut io) })?;
        let native: Arc<dyn NativeRbd> = self.native.clone();
        Ok(IoCtx::new(RawIoCtx::from_ptr(io), pool, native))
    }

    /// Create a pool
    pub fn create_pool(&self, pool: &str) -> Result<()> {
        let name = to_cstring(pool)?;
        check(unsafe { rados_pool_create(self.native.cluster.0, name.as_ptr()) })?;
        Ok(())
    }

    /// Delete a pool
    pub fn delete_pool(&self, pool: &str) -> Result<()> {
        let name = to_cstring(pool)?;
        check(unsafe { rados_pool_delete(self.native.cluster.0, name.as_ptr()) })?;
        Ok(())
    }
}

/// Copy a C string owned by the library
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn owned_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

impl NativeRbd for LibRbd {
    fn cluster_id(&self) -> usize {
        self.cluster.0 as usize
    }

    fn ioctx_destroy(&self, io: RawIoCtx) {
        unsafe { rados_ioctx_destroy(io.as_ptr()) }
    }

    fn group_create(&self, io: RawIoCtx, name: &CStr) -> c_int {
        unsafe { rbd_group_create(io.as_ptr(), name.as_ptr()) }
    }

    fn group_remove(&self, io: RawIoCtx, name: &CStr) -> c_int {
        unsafe { rbd_group_remove(io.as_ptr(), name.as_ptr()) }
    }

    fn group_rename(&self, io: RawIoCtx, src: &CStr, dst: &CStr) -> c_int {
        unsafe { rbd_group_rename(io.as_ptr(), src.as_ptr(), dst.as_ptr()) }
    }

    fn group_list(&self, io: RawIoCtx, names: &mut [u8], size: &mut usize) -> c_int {
        *size = names.len();
        unsafe { rbd_group_list(io.as_ptr(), names.as_mut_ptr().cast(), size) }
    }

    fn group_image_add(
        &self,
        group_io: RawIoCtx,
        group: &CStr,
        image_io: RawIoCtx,
        image: &CStr,
    ) -> c_int {
        unsafe {
            rbd_group_image_add(
                group_io.as_ptr(),
                group.as_ptr(),
                image_io.as_ptr(),
                image.as_ptr(),
            )
        }
    }

    fn group_image_remove(
        &self,
        group_io: RawIoCtx,
        group: &CStr,
        image_io: RawIoCtx,
        image: &CStr,
    ) -> c_int {
        unsafe {
            rbd_group_image_remove(
                group_io.as_ptr(),
                group.as_ptr(),
                image_io.as_ptr(),
                image.as_ptr(),
            )
        }
    }

    fn group_image_remove_by_id(
        &self,
        group_io: RawIoCtx,
        group: &CStr,
        image_io: RawIoCtx,
        image_id: &CStr,
    ) -> c_int {
        unsafe {
            rbd_group_image_remove_by_id(
                group_io.as_ptr(),
                group.as_ptr(),
                image_io.as_ptr(),
                image_id.as_ptr(),
            )
        }
    }

    fn group_image_list(
        &self,
        io: RawIoCtx,
        group: &CStr,
        images: &mut Vec<GroupImageInfo>,
    ) -> c_int {
        let entry_size = std::mem::size_of::<rbd_group_image_info_t>();
        let mut count = INITIAL_ENTRIES;
        loop {
            let mut raw: Vec<rbd_group_image_info_t> = (0..count)
                .map(|_| rbd_group_image_info_t {
                    name: ptr::null_mut(),
                    pool: 0,
                    state: 0,
                })
                .collect();
            let mut entries = count;
            let ret = unsafe {
                rbd_group_image_list(
                    io.as_ptr(),
                    group.as_ptr(),
                    raw.as_mut_ptr(),
                    entry_size,
                    &mut entries,
                )
            };
            if ret == -libc::ERANGE && entries > count {
                count = entries;
                continue;
            }
            if ret < 0 {
                return ret;
            }
            images.clear();
            images.extend(raw[..entries].iter().map(|info| GroupImageInfo {
                name: unsafe { owned_string(info.name) },
                pool_id: info.pool,
                state: if info.state == RBD_GROUP_IMAGE_STATE_ATTACHED {
                    GroupImageState::Attached
                } else {
                    GroupImageState::Incomplete
                },
            }));
            unsafe { rbd_group_image_list_cleanup(raw.as_mut_ptr(), entry_size, entries) };
            return 0;
        }
    }

    fn group_snap_create(&self, io: RawIoCtx, group: &CStr, snap: &CStr) -> c_int {
        unsafe { rbd_group_snap_create(io.as_ptr(), group.as_ptr(), snap.as_ptr()) }
    }

    fn group_snap_remove(&self, io: RawIoCtx, group: &CStr, snap: &CStr) -> c_int {
        unsafe { rbd_group_snap_remove(io.as_ptr(), group.as_ptr(), snap.as_ptr()) }
    }

    fn group_snap_rename(
        &self,
        io: RawIoCtx,
        group: &CStr,
        old_name: &CStr,
        new_name: &CStr,
    ) -> c_int {
        unsafe {
            rbd_group_snap_rename(
                io.as_ptr(),
                group.as_ptr(),
                old_name.as_ptr(),
                new_name.as_ptr(),
            )
        }
    }

    fn group_snap_list(
        &self,
        io: RawIoCtx,
        group: &CStr,
        snaps: &mut Vec<GroupSnapInfo>,
    ) -> c_int {
        let entry_size = std::mem::size_of::<rbd_group_snap_info_t>();
        let mut count = INITIAL_ENTRIES;
        loop {
            let mut raw: Vec<rbd_group_snap_info_t> = (0..count)
                .map(|_| rbd_group_snap_info_t {
                    name: ptr::null_mut(),
                    state: 0,
                })
                .collect();
            let mut entries = count;
            let ret = unsafe {
                rbd_group_snap_list(
                    io.as_ptr(),
                    group.as_ptr(),
                    raw.as_mut_ptr(),
                    entry_size,
                    &mut entries,
                )
            };
            if ret == -libc::ERANGE && entries > count {
                count = entries;
                continue;
            }
            if ret < 0 {
                return ret;
            }
            snaps.clear();
            snaps.extend(raw[..entries].iter().map(|info| GroupSnapInfo {
                name: unsafe { owned_string(info.name) },
                state: if info.state == RBD_GROUP_SNAP_STATE_COMPLETE {
                    GroupSnapState::Complete
                } else {
                    GroupSnapState::Incomplete
                },
            }));
            unsafe { rbd_group_snap_list_cleanup(raw.as_mut_ptr(), entry_size, entries) };
            return 0;
        }
    }

    fn image_create(&self, io: RawIoCtx, name: &CStr, size: u64, order: c_int) -> c_int {
        let mut order = order;
        unsafe { rbd_create(io.as_ptr(), name.as_ptr(), size, &mut order) }
    }

    fn image_remove(&self, io: RawIoCtx, name: &CStr) -> c_int {
        unsafe { rbd_remove(io.as_ptr(), name.as_ptr()) }
    }

    fn image_get_id(&self, io: RawIoCtx, name: &CStr, id: &mut [u8], size: &mut usize) -> c_int {
        let mut image: rbd_image_t = ptr::null_mut();
        let ret = unsafe { rbd_open(io.as_ptr(), name.as_ptr(), &mut image, ptr::null()) };
        if ret < 0 {
            return ret;
        }
        let ret = unsafe { rbd_get_id(image, id.as_mut_ptr().cast(), id.len()) };
        if ret == -libc::ERANGE {
            // rbd_get_id does not report the size it needs
            *size = id.len() * 2;
        }
        unsafe { rbd_close(image) };
        ret
    }
}
