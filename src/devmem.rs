//! Physical memory access.
//!
//! This module maps physical address ranges into the process through a
//! memory device such as `/dev/mem`.

use anyhow::{Context, Result};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Default memory device.
pub const DEFAULT_DEVICE: &str = "/dev/mem";

/// Physical memory device.
///
/// This struct represents an open memory device from which physical address
/// ranges can be mapped.
#[derive(Debug)]
pub struct DevMem {
    path: PathBuf,
    file: fs::File,
}

/// Physical memory mapping.
///
/// This struct corresponds to one mapped page of physical memory and gives
/// access to it. Dropping this struct unmaps the page.
#[derive(Debug)]
pub struct Mapping {
    base: *mut libc::c_void,
    effective: *mut libc::c_void,
    map_size: usize,
    phys_addr: u64,
}

impl DevMem {
    /// Opens a memory device.
    ///
    /// The device is opened for reading and writing with `O_SYNC`, so that
    /// accesses to the mapping are not cached. Opening `/dev/mem` requires
    /// root privileges.
    pub async fn open(path: impl AsRef<Path>) -> Result<DevMem> {
        let path = path.as_ref().to_path_buf();
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(&path)
            .await
            .with_context(|| {
                format!(
                    "failed to open {} (are you running as root?)",
                    path.display()
                )
            })?;
        Ok(DevMem { path, file })
    }

    /// Path of the memory device.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Maps the page that contains a physical address.
    ///
    /// The returned [`Mapping`] points to `phys_addr` itself, which need not
    /// be page aligned. The function fails if `len` bytes starting at
    /// `phys_addr` do not fit in that page.
    pub fn map_page(&self, phys_addr: u64, len: usize) -> Result<Mapping> {
        let map_size = page_size::get();
        let page_mask = map_size as u64 - 1;
        let page_offset = (phys_addr & page_mask) as usize;
        if page_offset + len > map_size {
            anyhow::bail!(
                "{len} bytes at physical address {phys_addr:#010x} cross a page boundary"
            );
        }
        let page_addr = libc::off_t::try_from(phys_addr & !page_mask)
            .context("physical address does not fit in off_t")?;
        let fd = self.file.as_raw_fd();

        let base = unsafe {
            match libc::mmap(
                std::ptr::null_mut::<libc::c_void>(),
                map_size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                page_addr,
            ) {
                libc::MAP_FAILED => anyhow::bail!(
                    "mmap of {} at {:#010x} failed: {}",
                    self.path.display(),
                    page_addr,
                    std::io::Error::last_os_error()
                ),
                x => x,
            }
        };
        let effective = unsafe { base.add(page_offset) };
        Ok(Mapping {
            base,
            effective,
            map_size,
            phys_addr,
        })
    }
}

impl Mapping {
    /// Gives the virtual address of the mapping.
    ///
    /// This function returns a pointer to the physical address that was
    /// requested in [`DevMem::map_page`], translated to the virtual address
    /// space of the process.
    pub fn addr(&self) -> *mut libc::c_void {
        self.effective
    }

    /// Gives the physical address of the mapping.
    pub fn phys_addr(&self) -> u64 {
        self.phys_addr
    }
}

/// Unmaps the page.
impl Drop for Mapping {
    fn drop(&mut self) {
        let ret = unsafe { libc::munmap(self.base, self.map_size) };
        if ret != 0 {
            tracing::error!(
                "munmap of physical address {:#010x} failed: {}",
                self.phys_addr,
                std::io::Error::last_os_error()
            );
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn open_missing_device_fails() {
        let err = DevMem::open("/nonexistent/convctl-mem").await.unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/convctl-mem"));
    }

    #[tokio::test]
    async fn page_crossing_is_rejected() {
        // any readable file is enough, since the check happens before mmap
        let mem = DevMem {
            path: PathBuf::from("/dev/null"),
            file: fs::File::open("/dev/null").await.unwrap(),
        };
        let page = page_size::get() as u64;
        assert!(mem.map_page(0x8003_0000 + page - 8, 12).is_err());
    }
}
