//! Error types for the cephkit-rbd crate

use std::ffi::NulError;
use std::os::raw::c_int;
use thiserror::Error;

/// Result type alias using `RbdError`
pub type Result<T> = std::result::Result<T, RbdError>;

/// Errors returned by the native block device library.
///
/// Native calls report failure as a negative errno. The common codes get
/// their own variants; everything else is kept verbatim in `Errno`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RbdError {
    /// The named group, image, snapshot or pool does not exist
    #[error("not found")]
    NotFound,

    /// An object with the same name already exists
    #[error("already exists")]
    AlreadyExists,

    /// The library rejected an argument
    #[error("invalid argument")]
    InvalidArgument,

    /// The target is in use
    #[error("resource busy")]
    Busy,

    /// A name could not be passed across the C boundary
    #[error("invalid name {name:?}: contains an interior NUL byte")]
    InvalidName { name: String },

    /// Any other negative status code
    #[error("rbd: ret={code}")]
    Errno { code: i32 },
}

impl RbdError {
    /// Map a negative native status code to an error.
    pub fn from_status(ret: c_int) -> Self {
        match -ret {
            libc::ENOENT => Self::NotFound,
            libc::EEXIST => Self::AlreadyExists,
            libc::EINVAL => Self::InvalidArgument,
            libc::EBUSY => Self::Busy,
            _ => Self::Errno { code: ret },
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Negative errno equivalent of this error, if it has one.
    pub fn status(&self) -> Option<c_int> {
        match self {
            Self::NotFound => Some(-libc::ENOENT),
            Self::AlreadyExists => Some(-libc::EEXIST),
            Self::InvalidArgument => Some(-libc::EINVAL),
            Self::Busy => Some(-libc::EBUSY),
            Self::Errno { code } => Some(*code),
            Self::InvalidName { .. } => None,
        }
    }

    pub(crate) fn invalid_name(err: NulError) -> Self {
        let bytes = err.into_vec();
        Self::InvalidName {
            name: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}

/// Convert a native status into a `Result`, keeping non-negative values.
pub(crate) fn check(ret: c_int) -> Result<c_int> {
    if ret < 0 {
        Err(RbdError::from_status(ret))
    } else {
        Ok(ret)
    }
}
