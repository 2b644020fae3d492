//! Marshalling helpers for the C boundary

use crate::error::{RbdError, Result};
use std::ffi::CString;
use std::os::raw::c_int;

/// Initial size of list buffers
pub(crate) const MIN_BUFFER_SIZE: usize = 1024;

/// Largest buffer a list call may grow to
pub(crate) const MAX_BUFFER_SIZE: usize = 256 * 1024;

/// Convert a name for the C boundary
pub(crate) fn to_cstring(name: &str) -> Result<CString> {
    CString::new(name).map_err(RbdError::invalid_name)
}

/// Call `fill` with growing buffers until it stops reporting `-ERANGE`.
///
/// `fill` receives the buffer and its length, and may overwrite the length
/// with the size it actually needs. Returns the last buffer together with the
/// non-negative status of the successful call.
pub(crate) fn fill_buffer<F>(mut fill: F) -> Result<(Vec<u8>, c_int)>
where
    F: FnMut(&mut [u8], &mut usize) -> c_int,
{
    let mut size = MIN_BUFFER_SIZE;
    loop {
        let mut buf = vec![0u8; size];
        let mut wanted = size;
        let ret = fill(&mut buf, &mut wanted);
        if ret != -libc::ERANGE {
            let ret = crate::error::check(ret)?;
            return Ok((buf, ret));
        }
        let next = if wanted > size { wanted } else { size * 2 };
        if next > MAX_BUFFER_SIZE {
            return Err(RbdError::from_status(ret));
        }
        tracing::trace!(size, next, "growing native buffer");
        size = next;
    }
}

/// Split a buffer of NUL-terminated strings
pub(crate) fn split_nul_terminated(buf: &[u8]) -> Vec<String> {
    buf.split(|b| *b == 0)
        .filter(|s| !s.is_empty())
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect()
}

/// The first NUL-terminated string in a buffer
pub(crate) fn first_nul_terminated(buf: &[u8]) -> String {
    let end = buf.iter().position(|b| *b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_nul_terminated() {
        assert_eq!(
            split_nul_terminated(b"uno\0dos\0tres\0"),
            vec!["uno", "dos", "tres"]
        );
        assert!(split_nul_terminated(b"").is_empty());
        assert!(split_nul_terminated(b"\0\0").is_empty());
    }

    #[test]
    fn test_first_nul_terminated() {
        assert_eq!(first_nul_terminated(b"10ab32\0\0\0"), "10ab32");
        assert_eq!(first_nul_terminated(b"abc"), "abc");
    }

    #[test]
    fn test_to_cstring_rejects_interior_nul() {
        let err = to_cstring("bad\0name").unwrap_err();
        assert!(matches!(err, RbdError::InvalidName { .. }));
    }

    #[test]
    fn test_fill_buffer_grows_to_reported_size() {
        let mut calls = Vec::new();
        let (buf, ret) = fill_buffer(|buf, size| {
            calls.push(buf.len());
            if buf.len() < 5000 {
                *size = 5000;
                return -libc::ERANGE;
            }
            buf[..3].copy_from_slice(b"ok\0");
            3
        })
        .unwrap();
        assert_eq!(calls, vec![MIN_BUFFER_SIZE, 5000]);
        assert_eq!(ret, 3);
        assert_eq!(&buf[..3], b"ok\0");
    }

    #[test]
    fn test_fill_buffer_doubles_without_hint() {
        let mut calls = Vec::new();
        let _ = fill_buffer(|buf, _size| {
            calls.push(buf.len());
            if buf.len() < 4096 {
                -libc::ERANGE
            } else {
                0
            }
        })
        .unwrap();
        assert_eq!(calls, vec![1024, 2048, 4096]);
    }

    #[test]
    fn test_fill_buffer_gives_up_past_limit() {
        let err = fill_buffer(|_buf, size| {
            *size = MAX_BUFFER_SIZE + 1;
            -libc::ERANGE
        })
        .unwrap_err();
        assert_eq!(err, RbdError::Errno { code: -libc::ERANGE });
    }

    #[test]
    fn test_fill_buffer_propagates_errors() {
        let err = fill_buffer(|_buf, _size| -libc::ENOENT).unwrap_err();
        assert!(err.is_not_found());
    }
}
