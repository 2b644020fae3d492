//! Pool context handles

use crate::native::{NativeRbd, RawIoCtx};
use std::fmt;
use std::sync::Arc;

/// An open pool context.
///
/// The caller owns the context and lends it to each operation for the
/// duration of one call. Once destroyed, the context is invalid and passing
/// it to any operation is a programming error that panics.
pub struct IoCtx {
    raw: RawIoCtx,
    pool: String,
    native: Arc<dyn NativeRbd>,
}

impl IoCtx {
    pub(crate) fn new(raw: RawIoCtx, pool: impl Into<String>, native: Arc<dyn NativeRbd>) -> Self {
        Self {
            raw,
            pool: pool.into(),
            native,
        }
    }

    /// Name of the pool this context was opened on
    pub fn pool_name(&self) -> &str {
        &self.pool
    }

    /// Check if the context still holds a native handle
    pub fn is_valid(&self) -> bool {
        !self.raw.is_null()
    }

    /// Release the native handle. Later calls are no-ops.
    pub fn destroy(&mut self) {
        if self.is_valid() {
            tracing::debug!(pool = %self.pool, "destroying pool context");
            self.native.ioctx_destroy(self.raw);
            self.raw = RawIoCtx::null();
        }
    }

    /// The live handle.
    ///
    /// # Panics
    ///
    /// Panics if the context has been destroyed.
    pub(crate) fn validate(&self) -> RawIoCtx {
        assert!(
            self.is_valid(),
            "invalid IoCtx for pool {:?}: context has been destroyed",
            self.pool
        );
        self.raw
    }

    /// Live handles of a group context and an image context.
    ///
    /// # Panics
    ///
    /// Panics if either context has been destroyed, or if the two were
    /// opened on different cluster connections.
    pub(crate) fn validate_pair(group_io: &IoCtx, image_io: &IoCtx) -> (RawIoCtx, RawIoCtx) {
        let group_raw = group_io.validate();
        let image_raw = image_io.validate();
        assert!(
            group_io.native.cluster_id() == image_io.native.cluster_id(),
            "invalid IoCtx for pool {:?}: opened on a different cluster than pool {:?}",
            image_io.pool,
            group_io.pool
        );
        (group_raw, image_raw)
    }

    pub(crate) fn native(&self) -> &dyn NativeRbd {
        self.native.as_ref()
    }
}

impl fmt::Debug for IoCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoCtx")
            .field("pool", &self.pool)
            .field("valid", &self.is_valid())
            .finish()
    }
}

impl Drop for IoCtx {
    fn drop(&mut self) {
        self.destroy();
    }
}
