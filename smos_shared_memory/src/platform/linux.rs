//! Linux mmap plumbing: `/dev/shm`-backed file creation, open, and size
//! queries.

use crate::error::{ShmError, ShmResult};
use memmap2::{MmapMut, MmapOptions};
use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;

/// Creates a new file-backed segment of exactly `size` bytes and maps it.
/// Fails with [`ShmError::AlreadyExists`] if `path` is already present,
/// letting the caller retry with a freshly randomized name.
pub fn create_segment_mmap(path: &str, size: usize) -> ShmResult<MmapMut> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                ShmError::AlreadyExists {
                    name: path.to_string(),
                }
            } else {
                ShmError::Io(e)
            }
        })?;
    file.set_len(size as u64)?;

    let mmap = unsafe { MmapOptions::new().len(size).map_mut(&file)? };
    Ok(mmap)
}

/// Attaches to an existing segment file, mapping its full current length.
pub fn attach_segment_mmap(path: &str) -> ShmResult<MmapMut> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ShmError::NotFound {
                    name: path.to_string(),
                }
            } else {
                ShmError::Io(e)
            }
        })?;

    let mmap = unsafe { MmapOptions::new().map_mut(&file)? };
    Ok(mmap)
}

/// Current on-disk size of a segment file.
pub fn segment_size(path: &str) -> ShmResult<usize> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ShmError::NotFound {
                name: path.to_string(),
            }
        } else {
            ShmError::Io(e)
        }
    })?;
    Ok(metadata.len() as usize)
}

/// Checks whether a process is still alive, used by operator tooling to spot
/// segments orphaned by a crashed writer or reader. Cleanup of orphaned
/// segments is left to the operator; this only helps diagnose them.
pub fn is_process_alive(pid: i32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(nix::errno::Errno::ESRCH) => false,
        Err(nix::errno::Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_process_is_alive() {
        assert!(is_process_alive(std::process::id() as i32));
    }

    #[test]
    fn pid_zero_is_not_a_real_process() {
        // pid 1 billion almost certainly does not exist
        assert!(!is_process_alive(1_000_000_000));
    }
}
