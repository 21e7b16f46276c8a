//! Raw mmap-backed shared memory segments.
//!
//! These segments carry no embedded header, version counter, or reader
//! count: the coordinator process never touches segment bytes, so there is
//! nothing for a header to coordinate. A segment is exactly
//! `block_size * max_capacity` bytes of raw storage; all bookkeeping (free
//! pool, live-entry map, reader counts) lives in `smos_store`'s `Track`, not
//! in shared memory.

use crate::error::{ShmError, ShmResult};
use crate::platform;
use memmap2::MmapMut;
use rand::Rng;

/// Directory POSIX shared memory segments live under on Linux.
pub const SHM_DIR: &str = "/dev/shm";

/// A named, mmap-backed region of shared memory.
pub struct Segment {
    name: String,
    size: usize,
    mmap: MmapMut,
}

impl Segment {
    /// Creates a new segment named `{base_name}_{random_u64}`, retrying with
    /// a freshly randomized suffix on a name collision. Mirrors the source
    /// system's `get_data_track`, which appends a random tail to the shared
    /// memory name so that two objects with the same base name can coexist
    /// briefly during destructive replacement.
    pub fn create_unique(base_name: &str, size: usize) -> ShmResult<Self> {
        if size == 0 {
            return Err(ShmError::InvalidSize { size });
        }
        loop {
            let suffix: u64 = rand::thread_rng().r#gen();
            let name = format!("{base_name}_{suffix}");
            match platform::create_segment_mmap(&segment_path(&name), size) {
                Ok(mmap) => {
                    return Ok(Self { name, size, mmap });
                }
                Err(ShmError::AlreadyExists { .. }) => continue,
                Err(other) => return Err(other),
            }
        }
    }

    /// Attaches to an existing segment by its exact full name.
    pub fn open(name: &str) -> ShmResult<Self> {
        let path = segment_path(name);
        let size = platform::segment_size(&path)?;
        let mmap = platform::attach_segment_mmap(&path)?;
        Ok(Self {
            name: name.to_string(),
            size,
            mmap,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn data(&self) -> &[u8] {
        &self.mmap[..self.size]
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.mmap[..self.size]
    }

    /// Bounds-checked read of `len` bytes at `offset`.
    pub fn read_at(&self, offset: usize, len: usize) -> ShmResult<&[u8]> {
        self.check_bounds(offset, len)?;
        Ok(&self.mmap[offset..offset + len])
    }

    /// Bounds-checked write of `bytes` at `offset`.
    pub fn write_at(&mut self, offset: usize, bytes: &[u8]) -> ShmResult<()> {
        self.check_bounds(offset, bytes.len())?;
        self.mmap[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn check_bounds(&self, offset: usize, len: usize) -> ShmResult<()> {
        if offset + len > self.size {
            return Err(ShmError::OutOfBounds {
                offset,
                len,
                size: self.size,
            });
        }
        Ok(())
    }

    /// Unlinks the underlying shared memory file. Irreversible; only the
    /// owning `Track` should call this, on `stop()`.
    pub fn unlink(&self) -> ShmResult<()> {
        std::fs::remove_file(segment_path(&self.name))?;
        Ok(())
    }
}

fn segment_path(name: &str) -> String {
    format!("{SHM_DIR}/smos_{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_reopen() {
        let seg = Segment::create_unique("test_obj:track0", 4096).unwrap();
        let name = seg.name().to_string();
        assert_eq!(seg.size(), 4096);

        let reopened = Segment::open(&name).unwrap();
        assert_eq!(reopened.size(), 4096);

        seg.unlink().unwrap();
    }

    #[test]
    fn write_and_read_roundtrip() {
        let mut seg = Segment::create_unique("rw_test", 1024).unwrap();
        seg.write_at(128, b"hello world").unwrap();
        assert_eq!(seg.read_at(128, 11).unwrap(), b"hello world");
        seg.unlink().unwrap();
    }

    #[test]
    fn out_of_bounds_rejected() {
        let mut seg = Segment::create_unique("bounds_test", 16).unwrap();
        assert!(matches!(
            seg.write_at(10, b"0123456789"),
            Err(ShmError::OutOfBounds { .. })
        ));
        seg.unlink().unwrap();
    }

    #[test]
    fn zero_size_rejected() {
        assert!(matches!(
            Segment::create_unique("zero", 0),
            Err(ShmError::InvalidSize { size: 0 })
        ));
    }

    #[test]
    fn two_segments_same_base_name_coexist() {
        let a = Segment::create_unique("dup_base", 64).unwrap();
        let b = Segment::create_unique("dup_base", 64).unwrap();
        assert_ne!(a.name(), b.name());
        a.unlink().unwrap();
        b.unlink().unwrap();
    }
}
