//! Image helpers needed to populate groups

use crate::buffer::{fill_buffer, first_nul_terminated, to_cstring};
use crate::error::{check, Result};
use crate::ioctx::IoCtx;
use std::os::raw::c_int;
use tracing::instrument;

/// Default object size order (4 MiB objects)
pub const DEFAULT_ORDER: u8 = 22;

/// Create an image of `size` bytes backed by `2^order` byte objects
#[instrument(skip(io), fields(pool = io.pool_name()))]
pub fn create(io: &IoCtx, name: &str, size: u64, order: u8) -> Result<()> {
    let raw = io.validate();
    let name = to_cstring(name)?;
    check(io.native().image_create(raw, &name, size, c_int::from(order)))?;
    Ok(())
}

/// Remove an image
#[instrument(skip(io), fields(pool = io.pool_name()))]
pub fn remove(io: &IoCtx, name: &str) -> Result<()> {
    let raw = io.validate();
    let name = to_cstring(name)?;
    check(io.native().image_remove(raw, &name))?;
    Ok(())
}

/// Look up the immutable id of an image
#[instrument(skip(io), fields(pool = io.pool_name()))]
pub fn id(io: &IoCtx, name: &str) -> Result<String> {
    let raw = io.validate();
    let name = to_cstring(name)?;
    let native = io.native();
    let (buf, _) = fill_buffer(|buf, size| native.image_get_id(raw, &name, buf, size))?;
    Ok(first_nul_terminated(&buf))
}
