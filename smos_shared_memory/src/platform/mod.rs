//! Platform-specific segment creation glue.

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::*;

#[cfg(not(target_os = "linux"))]
mod fallback {
    use crate::error::{ShmError, ShmResult};
    use memmap2::MmapMut;

    pub fn create_segment_mmap(_path: &str, _size: usize) -> ShmResult<MmapMut> {
        Err(ShmError::Io(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "shared memory segments are only implemented for Linux",
        )))
    }

    pub fn attach_segment_mmap(_path: &str) -> ShmResult<MmapMut> {
        Err(ShmError::Io(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "shared memory segments are only implemented for Linux",
        )))
    }

    pub fn segment_size(_path: &str) -> ShmResult<usize> {
        Err(ShmError::Io(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "shared memory segments are only implemented for Linux",
        )))
    }

    pub fn is_process_alive(_pid: i32) -> bool {
        false
    }
}
#[cfg(not(target_os = "linux"))]
pub use fallback::*;
