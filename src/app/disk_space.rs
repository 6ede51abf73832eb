//! Free-space checks before downloads
//!
//! A download is only started when the target volume can hold the file plus a
//! configurable buffer (20 GiB by default). The buffer absorbs concurrent growth
//! of other cache entries and filesystem metadata overhead.
//!
//! The platform query sits behind [`SpaceSource`]; [`SystemSpaceSource`] uses
//! `statvfs(3)` on unix targets.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::constants::disk;
use crate::errors::{DiskSpaceError, DiskSpaceResult};

/// Platform free-space query
pub trait SpaceSource: Send + Sync + fmt::Debug {
    /// Bytes available to unprivileged users on the filesystem holding `dir`
    fn available_bytes(&self, dir: &Path) -> io::Result<u64>;
}

/// Free-space query using the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSpaceSource;

#[cfg(unix)]
impl SpaceSource for SystemSpaceSource {
    fn available_bytes(&self, dir: &Path) -> io::Result<u64> {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let c_path = CString::new(dir.as_os_str().as_bytes())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
        // SAFETY: c_path is a valid NUL-terminated string and stat is a valid out pointer.
        let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }

        #[allow(clippy::unnecessary_cast)]
        Ok(stat.f_bavail as u64 * stat.f_frsize as u64)
    }
}

#[cfg(not(unix))]
impl SpaceSource for SystemSpaceSource {
    fn available_bytes(&self, _dir: &Path) -> io::Result<u64> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "free-space query is only implemented for unix targets",
        ))
    }
}

/// Source reporting a fixed amount of free space
#[derive(Debug, Clone, Copy)]
pub struct FixedSpaceSource {
    pub available: u64,
}

impl SpaceSource for FixedSpaceSource {
    fn available_bytes(&self, _dir: &Path) -> io::Result<u64> {
        Ok(self.available)
    }
}

/// Applies the required-space policy to a space source
#[derive(Debug)]
pub struct DiskSpaceManager {
    min_free_space_gb: u64,
    source: Box<dyn SpaceSource>,
}

impl DiskSpaceManager {
    /// Create a manager using the system source
    pub fn new(min_free_space_gb: u64) -> Self {
        Self::with_source(min_free_space_gb, Box::new(SystemSpaceSource))
    }

    /// Create a manager with an explicit source
    pub fn with_source(min_free_space_gb: u64, source: Box<dyn SpaceSource>) -> Self {
        Self {
            min_free_space_gb,
            source,
        }
    }

    /// Configured buffer in GiB
    pub fn min_free_space_gb(&self) -> u64 {
        self.min_free_space_gb
    }

    /// Total bytes needed for a file: its size plus the free-space buffer
    pub fn required_space(&self, file_size: u64) -> u64 {
        file_size.saturating_add(self.min_free_space_gb.saturating_mul(disk::BYTES_PER_GIB))
    }

    /// Whether the volume holding `path` can take `file_size` bytes plus the buffer
    ///
    /// # Errors
    ///
    /// Returns `DiskSpaceError` if no ancestor of `path` exists or the query fails
    pub fn has_enough_space(&self, path: &Path, file_size: u64) -> DiskSpaceResult<bool> {
        let available = self.available_space(path)?;
        let required = self.required_space(file_size);

        debug!(
            "Disk space for {}: available {} bytes, required {} bytes",
            path.display(),
            available,
            required
        );
        Ok(available >= required)
    }

    /// Raw free bytes on the volume holding `path`
    pub fn available_space(&self, path: &Path) -> DiskSpaceResult<u64> {
        let dir = nearest_existing_dir(path)?;
        self.source
            .available_bytes(&dir)
            .map_err(|source| DiskSpaceError::Query { path: dir, source })
    }
}

/// Walk up from `path` to the first directory that exists
fn nearest_existing_dir(path: &Path) -> DiskSpaceResult<PathBuf> {
    let mut candidate = Some(path);
    while let Some(current) = candidate {
        // A relative path's last parent is empty; that means the working directory
        let current = if current.as_os_str().is_empty() {
            Path::new(".")
        } else {
            current
        };
        if current.exists() {
            return Ok(current.to_path_buf());
        }
        if current == Path::new(".") {
            break;
        }
        candidate = current.parent();
    }

    Err(DiskSpaceError::NoExistingAncestor {
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::BYTES_PER_GIB;
    use tempfile::TempDir;

    fn manager_with(available: u64, buffer_gb: u64) -> DiskSpaceManager {
        DiskSpaceManager::with_source(buffer_gb, Box::new(FixedSpaceSource { available }))
    }

    #[test]
    fn test_required_space_adds_buffer() {
        let manager = manager_with(0, 20);
        assert_eq!(manager.required_space(BYTES_PER_GIB), 21 * BYTES_PER_GIB);
        assert_eq!(manager.required_space(0), 20 * BYTES_PER_GIB);
    }

    #[test]
    fn test_space_between_file_size_and_requirement_is_not_enough() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager_with(5 * BYTES_PER_GIB, 20);

        assert!(!manager
            .has_enough_space(temp_dir.path(), BYTES_PER_GIB)
            .unwrap());
    }

    #[test]
    fn test_exact_requirement_is_enough() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager_with(21 * BYTES_PER_GIB, 20);

        assert!(manager
            .has_enough_space(temp_dir.path(), BYTES_PER_GIB)
            .unwrap());
    }

    #[test]
    fn test_missing_path_uses_existing_ancestor() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("not").join("yet").join("created");

        assert_eq!(nearest_existing_dir(&missing).unwrap(), temp_dir.path());
        let manager = manager_with(1234, 0);
        assert_eq!(manager.available_space(&missing).unwrap(), 1234);
    }

    #[test]
    fn test_relative_path_falls_back_to_working_directory() {
        let manager = manager_with(42, 0);

        assert_eq!(
            nearest_existing_dir(Path::new("tiles-not-created-yet")).unwrap(),
            Path::new(".")
        );
        assert_eq!(
            manager
                .available_space(Path::new("tiles-not-created-yet"))
                .unwrap(),
            42
        );
        assert_eq!(
            manager
                .available_space(Path::new("tiles-not-created-yet/child"))
                .unwrap(),
            42
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_system_source_reports_space() {
        let temp_dir = TempDir::new().unwrap();
        let manager = DiskSpaceManager::new(0);
        assert!(manager.available_space(temp_dir.path()).unwrap() > 0);
    }
}
