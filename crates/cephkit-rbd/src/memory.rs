//! In-memory cluster for testing and development
//!
//! Implements [`NativeRbd`] with the status codes the native library
//! returns, so code written against it behaves the same against a real
//! cluster.

use crate::error::{RbdError, Result};
use crate::ioctx::IoCtx;
use crate::native::{
    GroupImageInfo, GroupImageState, GroupSnapInfo, GroupSnapState, NativeRbd, RawIoCtx,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::ffi::{c_void, CStr};
use std::os::raw::c_int;
use std::sync::Arc;

const MIN_ORDER: c_int = 12;
const MAX_ORDER: c_int = 25;

#[derive(Default)]
struct State {
    next_pool_id: i64,
    next_handle: usize,
    pools: HashMap<String, Pool>,
    /// Open handles and the id of the pool each was opened on
    handles: HashMap<usize, i64>,
}

struct Pool {
    id: i64,
    images: HashMap<String, Image>,
    groups: HashMap<String, Group>,
}

struct Image {
    id: String,
    /// Pool id and name of the owning group
    group: Option<(i64, String)>,
}

#[derive(Default)]
struct Group {
    /// Pool id and image id of each member
    members: Vec<(i64, String)>,
    snaps: Vec<GroupSnapInfo>,
}

impl Pool {
    fn image_name_by_id(&self, id: &str) -> Option<String> {
        self.images
            .iter()
            .find(|(_, image)| image.id == id)
            .map(|(name, _)| name.clone())
    }
}

#[derive(Clone, Copy)]
enum ImageRef<'a> {
    Name(&'a CStr),
    Id(&'a CStr),
}

fn handle_key(io: RawIoCtx) -> usize {
    io.as_ptr() as usize
}

fn to_str(s: &CStr) -> std::result::Result<String, c_int> {
    s.to_str().map(str::to_owned).map_err(|_| -libc::EINVAL)
}

/// Success value or negative errno
type Outcome = std::result::Result<c_int, c_int>;

fn status(result: Outcome) -> c_int {
    result.unwrap_or_else(|code| code)
}

/// Write NUL-terminated strings into `buf`, following the `-ERANGE` contract
fn write_nul_terminated<'a>(
    items: impl Iterator<Item = &'a str> + Clone,
    buf: &mut [u8],
    size: &mut usize,
) -> c_int {
    let needed: usize = items.clone().map(|s| s.len() + 1).sum();
    if buf.len() < needed {
        *size = needed;
        return -libc::ERANGE;
    }
    let mut pos = 0;
    for item in items {
        buf[pos..pos + item.len()].copy_from_slice(item.as_bytes());
        buf[pos + item.len()] = 0;
        pos += item.len() + 1;
    }
    c_int::try_from(needed).unwrap_or(c_int::MAX)
}

impl State {
    /// Pool behind a handle. A handle stays bound to the pool id it was
    /// opened on, so it does not follow a pool recreated under the same name.
    fn pool(&self, io: RawIoCtx) -> std::result::Result<&Pool, c_int> {
        let id = *self.handles.get(&handle_key(io)).ok_or(-libc::EBADF)?;
        self.pool_by_id(id).ok_or(-libc::ENOENT)
    }

    fn pool_mut(&mut self, io: RawIoCtx) -> std::result::Result<&mut Pool, c_int> {
        let id = *self.handles.get(&handle_key(io)).ok_or(-libc::EBADF)?;
        self.pool_by_id_mut(id).ok_or(-libc::ENOENT)
    }

    fn pool_by_id(&self, id: i64) -> Option<&Pool> {
        self.pools.values().find(|p| p.id == id)
    }

    fn pool_by_id_mut(&mut self, id: i64) -> Option<&mut Pool> {
        self.pools.values_mut().find(|p| p.id == id)
    }

    /// Clear the group link of every member of `group`
    fn detach_members(&mut self, group_pool_id: i64, name: &str, group: &Group) {
        let owner = Some((group_pool_id, name.to_string()));
        for (member_pool, image_id) in &group.members {
            if let Some(p) = self.pool_by_id_mut(*member_pool) {
                for image in p.images.values_mut() {
                    if image.id == *image_id && image.group == owner {
                        image.group = None;
                    }
                }
            }
        }
    }

    fn delete_pool(&mut self, name: &str) -> Option<()> {
        let pool = self.pools.remove(name)?;
        for (group_name, group) in &pool.groups {
            self.detach_members(pool.id, group_name, group);
        }
        Some(())
    }

    fn group_create(&mut self, io: RawIoCtx, name: &CStr) -> Outcome {
        let name = to_str(name)?;
        if name.is_empty() {
            return Err(-libc::EINVAL);
        }
        let pool = self.pool_mut(io)?;
        if pool.groups.contains_key(&name) {
            return Err(-libc::EEXIST);
        }
        pool.groups.insert(name, Group::default());
        Ok(0)
    }

    fn group_remove(&mut self, io: RawIoCtx, name: &CStr) -> Outcome {
        let name = to_str(name)?;
        let pool = self.pool_mut(io)?;
        let pool_id = pool.id;
        let group = pool.groups.remove(&name).ok_or(-libc::ENOENT)?;
        self.detach_members(pool_id, &name, &group);
        Ok(0)
    }

    fn group_rename(&mut self, io: RawIoCtx, src: &CStr, dst: &CStr) -> Outcome {
        let src = to_str(src)?;
        let dst = to_str(dst)?;
        if dst.is_empty() {
            return Err(-libc::EINVAL);
        }
        let pool = self.pool_mut(io)?;
        let pool_id = pool.id;
        if pool.groups.contains_key(&dst) {
            return Err(-libc::EEXIST);
        }
        let group = pool.groups.remove(&src).ok_or(-libc::ENOENT)?;
        let members = group.members.clone();
        pool.groups.insert(dst.clone(), group);
        for (member_pool, image_id) in members {
            if let Some(p) = self.pool_by_id_mut(member_pool) {
                for image in p.images.values_mut() {
                    if image.id == image_id {
                        image.group = Some((pool_id, dst.clone()));
                    }
                }
            }
        }
        Ok(0)
    }

    fn membership_change(
        &mut self,
        group_io: RawIoCtx,
        group: &CStr,
        image_io: RawIoCtx,
        image: ImageRef<'_>,
        add: bool,
    ) -> Outcome {
        let group = to_str(group)?;
        let group_pool_id = {
            let pool = self.pool(group_io)?;
            if !pool.groups.contains_key(&group) {
                return Err(-libc::ENOENT);
            }
            pool.id
        };
        let image_pool = self.pool_mut(image_io)?;
        let image_pool_id = image_pool.id;
        let image_name = match image {
            ImageRef::Name(name) => to_str(name)?,
            ImageRef::Id(id) => image_pool
                .image_name_by_id(&to_str(id)?)
                .ok_or(-libc::ENOENT)?,
        };
        let entry = image_pool
            .images
            .get_mut(&image_name)
            .ok_or(-libc::ENOENT)?;
        let image_id = entry.id.clone();
        let owner = (group_pool_id, group.clone());

        if add {
            if entry.group.is_some() {
                return Err(-libc::EEXIST);
            }
            entry.group = Some(owner);
        } else {
            if entry.group.as_ref() != Some(&owner) {
                return Err(-libc::ENOENT);
            }
            entry.group = None;
        }

        let members = &mut self
            .pool_by_id_mut(group_pool_id)
            .and_then(|p| p.groups.get_mut(&group))
            .ok_or(-libc::ENOENT)?
            .members;
        if add {
            members.push((image_pool_id, image_id));
        } else {
            members.retain(|m| !(m.0 == image_pool_id && m.1 == image_id));
        }
        Ok(0)
    }

    fn group_image_list(
        &self,
        io: RawIoCtx,
        group: &CStr,
        images: &mut Vec<GroupImageInfo>,
    ) -> Outcome {
        let group = to_str(group)?;
        let pool = self.pool(io)?;
        let members = &pool.groups.get(&group).ok_or(-libc::ENOENT)?.members;
        images.clear();
        for (pool_id, image_id) in members {
            let name = self
                .pool_by_id(*pool_id)
                .and_then(|p| p.image_name_by_id(image_id));
            images.push(match name {
                Some(name) => GroupImageInfo {
                    name,
                    pool_id: *pool_id,
                    state: GroupImageState::Attached,
                },
                None => GroupImageInfo {
                    name: image_id.clone(),
                    pool_id: *pool_id,
                    state: GroupImageState::Incomplete,
                },
            });
        }
        Ok(0)
    }

    fn group_snap_create(&mut self, io: RawIoCtx, group: &CStr, snap: &CStr) -> Outcome {
        let group = to_str(group)?;
        let snap = to_str(snap)?;
        if snap.is_empty() {
            return Err(-libc::EINVAL);
        }
        let pool = self.pool_mut(io)?;
        let group = pool.groups.get_mut(&group).ok_or(-libc::ENOENT)?;
        if group.snaps.iter().any(|s| s.name == snap) {
            return Err(-libc::EEXIST);
        }
        group.snaps.push(GroupSnapInfo {
            name: snap,
            state: GroupSnapState::Complete,
        });
        Ok(0)
    }

    fn group_snap_remove(&mut self, io: RawIoCtx, group: &CStr, snap: &CStr) -> Outcome {
        let group = to_str(group)?;
        let snap = to_str(snap)?;
        let pool = self.pool_mut(io)?;
        let group = pool.groups.get_mut(&group).ok_or(-libc::ENOENT)?;
        let before = group.snaps.len();
        group.snaps.retain(|s| s.name != snap);
        if group.snaps.len() == before {
            return Err(-libc::ENOENT);
        }
        Ok(0)
    }

    fn group_snap_rename(
        &mut self,
        io: RawIoCtx,
        group: &CStr,
        old_name: &CStr,
        new_name: &CStr,
    ) -> Outcome {
        let group = to_str(group)?;
        let old_name = to_str(old_name)?;
        let new_name = to_str(new_name)?;
        let pool = self.pool_mut(io)?;
        let group = pool.groups.get_mut(&group).ok_or(-libc::ENOENT)?;
        if group.snaps.iter().any(|s| s.name == new_name) {
            return Err(-libc::EEXIST);
        }
        let snap = group
            .snaps
            .iter_mut()
            .find(|s| s.name == old_name)
            .ok_or(-libc::ENOENT)?;
        snap.name = new_name;
        Ok(0)
    }

    fn group_snap_list(
        &self,
        io: RawIoCtx,
        group: &CStr,
        snaps: &mut Vec<GroupSnapInfo>,
    ) -> Outcome {
        let group = to_str(group)?;
        let pool = self.pool(io)?;
        let group = pool.groups.get(&group).ok_or(-libc::ENOENT)?;
        snaps.clone_from(&group.snaps);
        Ok(0)
    }

    fn image_create(&mut self, io: RawIoCtx, name: &CStr, order: c_int) -> Outcome {
        let name = to_str(name)?;
        if name.is_empty() {
            return Err(-libc::EINVAL);
        }
        if !(MIN_ORDER..=MAX_ORDER).contains(&order) {
            return Err(-libc::EDOM);
        }
        let pool = self.pool_mut(io)?;
        if pool.images.contains_key(&name) {
            return Err(-libc::EEXIST);
        }
        let id = uuid::Uuid::new_v4().simple().to_string()[..12].to_string();
        pool.images.insert(name, Image { id, group: None });
        Ok(0)
    }

    fn image_remove(&mut self, io: RawIoCtx, name: &CStr) -> Outcome {
        let name = to_str(name)?;
        let pool = self.pool_mut(io)?;
        let image = pool.images.get(&name).ok_or(-libc::ENOENT)?;
        if image.group.is_some() {
            return Err(-libc::EMLINK);
        }
        pool.images.remove(&name);
        Ok(0)
    }

    fn image_get_id(&self, io: RawIoCtx, name: &CStr, id: &mut [u8], size: &mut usize) -> Outcome {
        let name = to_str(name)?;
        let pool = self.pool(io)?;
        let image = pool.images.get(&name).ok_or(-libc::ENOENT)?;
        let ret = write_nul_terminated(std::iter::once(image.id.as_str()), id, size);
        if ret < 0 {
            return Err(ret);
        }
        Ok(0)
    }
}

/// An in-memory cluster of pools, images and groups
#[derive(Clone, Default)]
pub struct MemoryCluster {
    state: Arc<RwLock<State>>,
}

impl MemoryCluster {
    /// Create a new empty cluster
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pool and return its id
    pub fn create_pool(&self, name: &str) -> Result<i64> {
        let mut state = self.state.write();
        if state.pools.contains_key(name) {
            return Err(RbdError::AlreadyExists);
        }
        state.next_pool_id += 1;
        let id = state.next_pool_id;
        state.pools.insert(
            name.to_string(),
            Pool {
                id,
                images: HashMap::new(),
                groups: HashMap::new(),
            },
        );
        tracing::debug!(pool = name, id, "created pool");
        Ok(id)
    }

    /// Delete a pool with everything in it.
    ///
    /// Images in other pools that belonged to a group of this pool are
    /// detached. Handles opened on the pool keep failing with not-found.
    pub fn delete_pool(&self, name: &str) -> Result<()> {
        self.state
            .write()
            .delete_pool(name)
            .ok_or(RbdError::NotFound)
    }

    /// Names of all pools
    pub fn pool_names(&self) -> Vec<String> {
        self.state.read().pools.keys().cloned().collect()
    }

    /// Id of a pool
    pub fn pool_id(&self, name: &str) -> Result<i64> {
        self.state
            .read()
            .pools
            .get(name)
            .map(|p| p.id)
            .ok_or(RbdError::NotFound)
    }

    /// Open a pool context
    pub fn open_ioctx(&self, pool: &str) -> Result<IoCtx> {
        let mut state = self.state.write();
        let pool_id = state.pools.get(pool).map(|p| p.id).ok_or(RbdError::NotFound)?;
        state.next_handle += 1;
        let key = state.next_handle;
        state.handles.insert(key, pool_id);
        let raw = RawIoCtx::from_ptr(key as *mut c_void);
        let native: Arc<dyn NativeRbd> = Arc::new(self.clone());
        Ok(IoCtx::new(raw, pool, native))
    }

    /// Number of pool contexts that have not been destroyed
    pub fn open_handles(&self) -> usize {
        self.state.read().handles.len()
    }
}

impl NativeRbd for MemoryCluster {
    // Every clone shares one state, so its address names the cluster.
    fn cluster_id(&self) -> usize {
        Arc::as_ptr(&self.state) as *const () as usize
    }

    fn ioctx_destroy(&self, io: RawIoCtx) {
        self.state.write().handles.remove(&handle_key(io));
    }

    fn group_create(&self, io: RawIoCtx, name: &CStr) -> c_int {
        status(self.state.write().group_create(io, name))
    }

    fn group_remove(&self, io: RawIoCtx, name: &CStr) -> c_int {
        status(self.state.write().group_remove(io, name))
    }

    fn group_rename(&self, io: RawIoCtx, src: &CStr, dst: &CStr) -> c_int {
        status(self.state.write().group_rename(io, src, dst))
    }

    fn group_list(&self, io: RawIoCtx, names: &mut [u8], size: &mut usize) -> c_int {
        let state = self.state.read();
        match state.pool(io) {
            Ok(pool) => write_nul_terminated(pool.groups.keys().map(String::as_str), names, size),
            Err(code) => code,
        }
    }

    fn group_image_add(
        &self,
        group_io: RawIoCtx,
        group: &CStr,
        image_io: RawIoCtx,
        image: &CStr,
    ) -> c_int {
        status(self.state.write().membership_change(
            group_io,
            group,
            image_io,
            ImageRef::Name(image),
            true,
        ))
    }

    fn group_image_remove(
        &self,
        group_io: RawIoCtx,
        group: &CStr,
        image_io: RawIoCtx,
        image: &CStr,
    ) -> c_int {
        status(self.state.write().membership_change(
            group_io,
            group,
            image_io,
            ImageRef::Name(image),
            false,
        ))
    }

    fn group_image_remove_by_id(
        &self,
        group_io: RawIoCtx,
        group: &CStr,
        image_io: RawIoCtx,
        image_id: &CStr,
    ) -> c_int {
        status(self.state.write().membership_change(
            group_io,
            group,
            image_io,
            ImageRef::Id(image_id),
            false,
        ))
    }

    fn group_image_list(
        &self,
        io: RawIoCtx,
        group: &CStr,
        images: &mut Vec<GroupImageInfo>,
    ) -> c_int {
        status(self.state.read().group_image_list(io, group, images))
    }

    fn group_snap_create(&self, io: RawIoCtx, group: &CStr, snap: &CStr) -> c_int {
        status(self.state.write().group_snap_create(io, group, snap))
    }

    fn group_snap_remove(&self, io: RawIoCtx, group: &CStr, snap: &CStr) -> c_int {
        status(self.state.write().group_snap_remove(io, group, snap))
    }

    fn group_snap_rename(
        &self,
        io: RawIoCtx,
        group: &CStr,
        old_name: &CStr,
        new_name: &CStr,
    ) -> c_int {
        status(
            self.state
                .write()
                .group_snap_rename(io, group, old_name, new_name),
        )
    }

    fn group_snap_list(
        &self,
        io: RawIoCtx,
        group: &CStr,
        snaps: &mut Vec<GroupSnapInfo>,
    ) -> c_int {
        status(self.state.read().group_snap_list(io, group, snaps))
    }

    fn image_create(&self, io: RawIoCtx, name: &CStr, _size: u64, order: c_int) -> c_int {
        status(self.state.write().image_create(io, name, order))
    }

    fn image_remove(&self, io: RawIoCtx, name: &CStr) -> c_int {
        status(self.state.write().image_remove(io, name))
    }

    fn image_get_id(&self, io: RawIoCtx, name: &CStr, id: &mut [u8], size: &mut usize) -> c_int {
        status(self.state.read().image_get_id(io, name, id, size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    #[test]
    fn test_group_list_reports_required_size() {
        let cluster = MemoryCluster::new();
        cluster.create_pool("p").unwrap();
        let io = cluster.open_ioctx("p").unwrap();
        let raw = io.validate();
        assert_eq!(cluster.group_create(raw, &c("abc")), 0);
        assert_eq!(cluster.group_create(raw, &c("de")), 0);

        let mut small = [0u8; 2];
        let mut size = small.len();
        assert_eq!(cluster.group_list(raw, &mut small, &mut size), -libc::ERANGE);
        assert_eq!(size, 7);

        let mut buf = [0u8; 16];
        let mut size = buf.len();
        assert_eq!(cluster.group_list(raw, &mut buf, &mut size), 7);
        // size is left untouched on success
        assert_eq!(size, 16);
    }

    #[test]
    fn test_group_remove_of_missing_group_is_enoent() {
        let cluster = MemoryCluster::new();
        cluster.create_pool("p").unwrap();
        let io = cluster.open_ioctx("p").unwrap();
        assert_eq!(cluster.group_remove(io.validate(), &c("nope")), -libc::ENOENT);
    }

    #[test]
    fn test_image_order_is_bounded() {
        let cluster = MemoryCluster::new();
        cluster.create_pool("p").unwrap();
        let io = cluster.open_ioctx("p").unwrap();
        assert_eq!(
            cluster.image_create(io.validate(), &c("img"), 1 << 20, 40),
            -libc::EDOM
        );
    }

    #[test]
    fn test_destroy_releases_handle() {
        let cluster = MemoryCluster::new();
        cluster.create_pool("p").unwrap();
        let mut io = cluster.open_ioctx("p").unwrap();
        assert_eq!(cluster.open_handles(), 1);
        io.destroy();
        assert!(!io.is_valid());
        assert_eq!(cluster.open_handles(), 0);
        drop(io);
        assert_eq!(cluster.open_handles(), 0);
    }

    #[test]
    fn test_open_ioctx_on_missing_pool() {
        let cluster = MemoryCluster::new();
        assert!(cluster.open_ioctx("missing").unwrap_err().is_not_found());
    }

    #[test]
    fn test_clones_share_cluster_identity() {
        let cluster = MemoryCluster::new();
        assert_eq!(cluster.cluster_id(), cluster.clone().cluster_id());
        assert_ne!(cluster.cluster_id(), MemoryCluster::new().cluster_id());
    }

    #[test]
    fn test_handle_does_not_follow_recreated_pool() {
        let cluster = MemoryCluster::new();
        cluster.create_pool("p").unwrap();
        let io = cluster.open_ioctx("p").unwrap();
        let raw = io.validate();
        let mut buf = [0u8; 16];
        let mut size = buf.len();

        cluster.delete_pool("p").unwrap();
        assert_eq!(cluster.group_list(raw, &mut buf, &mut size), -libc::ENOENT);

        cluster.create_pool("p").unwrap();
        assert_eq!(cluster.group_list(raw, &mut buf, &mut size), -libc::ENOENT);
        assert_eq!(cluster.group_create(raw, &c("g")), -libc::ENOENT);
    }

    #[test]
    fn test_delete_pool_detaches_members_in_other_pools() {
        let cluster = MemoryCluster::new();
        cluster.create_pool("groups").unwrap();
        cluster.create_pool("images").unwrap();
        let groups = cluster.open_ioctx("groups").unwrap();
        let images = cluster.open_ioctx("images").unwrap();
        let (g, i) = (groups.validate(), images.validate());

        assert_eq!(cluster.group_create(g, &c("g")), 0);
        assert_eq!(cluster.image_create(i, &c("img"), 1 << 20, 22), 0);
        assert_eq!(cluster.group_image_add(g, &c("g"), i, &c("img")), 0);
        assert_eq!(cluster.image_remove(i, &c("img")), -libc::EMLINK);

        cluster.delete_pool("groups").unwrap();

        cluster.create_pool("other").unwrap();
        let other = cluster.open_ioctx("other").unwrap();
        let o = other.validate();
        assert_eq!(cluster.group_create(o, &c("h")), 0);
        assert_eq!(cluster.group_image_add(o, &c("h"), i, &c("img")), 0);
        assert_eq!(cluster.group_image_remove(o, &c("h"), i, &c("img")), 0);
        assert_eq!(cluster.image_remove(i, &c("img")), 0);
    }
}
