//! The statvfs-equivalent kernel call used for every filesystem type
//! other than zfs/devicemapper (spec.md §4.2.12): `total = frsize *
//! blocks`, `available = frsize * bavail`, `inodes_free = ffree`.

use std::ffi::CString;
use std::path::Path;

use crate::errors::{CollectorError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VolumeUsage {
    pub total: u64,
    pub available: u64,
    pub inodes_free: u64,
}

#[cfg(target_os = "linux")]
pub fn statvfs(path: &Path) -> Result<VolumeUsage> {
    let c_path = CString::new(path.to_string_lossy().as_bytes()).map_err(|e| CollectorError::Other(e.into()))?;
    // SAFETY: `buf` is zero-initialized and only read after a successful
    // call, which libc guarantees fully populates it.
    let mut buf: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut buf) };
    if rc != 0 {
        return Err(CollectorError::Io(std::io::Error::last_os_error()));
    }
    Ok(VolumeUsage {
        total: buf.f_frsize as u64 * buf.f_blocks as u64,
        available: buf.f_frsize as u64 * buf.f_bavail as u64,
        inodes_free: buf.f_ffree as u64,
    })
}

#[cfg(not(target_os = "linux"))]
pub fn statvfs(_path: &Path) -> Result<VolumeUsage> { Ok(VolumeUsage::default()) }
