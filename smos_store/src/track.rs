//! A single fixed-block-size data track backing one dimension of an object.

use smos_common::descriptor::{ElementKind, EntryDescriptor};
use smos_common::error::{InvariantViolation, SmosError};
use smos_shared_memory::Segment;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};

/// The live, in-memory record for one committed entry. `pending_readers` is
/// atomic because a track's reader-side methods (`read_entry_config`,
/// `release_read_reference`) only ever hold a shared reference to the
/// track: the object-level lock lets many readers run concurrently, and
/// this is the one field they all touch.
struct LiveEntry {
    kind: ElementKind,
    mapped_block_idx: usize,
    track_name: String,
    pending_readers: AtomicU32,
}

impl LiveEntry {
    fn snapshot(&self) -> EntryDescriptor {
        EntryDescriptor {
            kind: self.kind.clone(),
            mapped_block_idx: Some(self.mapped_block_idx),
            track_name: Some(self.track_name.clone()),
            pending_readers: self.pending_readers.load(Ordering::Acquire),
        }
    }
}

/// One dimension of an object: a single shared memory segment cut into
/// `max_capacity` fixed-size blocks, plus the bookkeeping needed to hand
/// blocks out and reclaim them.
pub struct Track {
    name: String,
    segment: Segment,
    block_size: usize,
    max_capacity: usize,
    free_blocks: VecDeque<usize>,
    entries: BTreeMap<u64, LiveEntry>,
    next_key: u64,
}

impl Track {
    pub fn new(name: &str, block_size: usize, max_capacity: usize) -> Result<Self, SmosError> {
        let segment = Segment::create_unique(name, block_size * max_capacity)
            .map_err(|e| SmosError::Segment(e.to_string()))?;
        Ok(Self {
            name: name.to_string(),
            segment,
            block_size,
            max_capacity,
            free_blocks: (0..max_capacity).collect(),
            entries: BTreeMap::new(),
            next_key: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shm_name(&self) -> &str {
        self.segment.name()
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn entry_keys(&self) -> Vec<u64> {
        self.entries.keys().copied().collect()
    }

    pub fn free_block_count(&self) -> usize {
        self.free_blocks.len()
    }

    /// Claims one free block and marks `desc` as mapped to it. Does not
    /// record the entry in the live map; the caller commits it later with
    /// [`Track::append_entry_config`].
    pub fn allocate_block(&mut self, desc: &mut EntryDescriptor) -> Result<(), SmosError> {
        let idx = self.free_blocks.pop_front().ok_or(SmosError::NoFreeBlock)?;
        desc.mapped_block_idx = Some(idx);
        desc.track_name = Some(self.name.clone());
        Ok(())
    }

    /// Commits a previously allocated descriptor under a fresh key.
    ///
    /// Panics (as an invariant violation, not a returned error) if `desc`
    /// was never allocated on this track: that can only happen from a bug
    /// in the fan-out caller, never from caller-supplied data.
    pub fn append_entry_config(&mut self, desc: EntryDescriptor) -> Result<u64, SmosError> {
        let Some(mapped_block_idx) = desc.mapped_block_idx else {
            InvariantViolation::UnallocatedEntry.raise();
        };
        if desc.track_name.as_deref() != Some(self.name.as_str()) {
            InvariantViolation::TrackMismatch {
                expected: self.name.clone(),
                actual: desc.track_name.clone().unwrap_or_default(),
            }
            .raise();
        }
        let key = self.next_key;
        self.next_key = self
            .next_key
            .checked_add(1)
            .ok_or(SmosError::KeySpaceExhausted)?;
        self.entries.insert(
            key,
            LiveEntry {
                kind: desc.kind,
                mapped_block_idx,
                track_name: desc.track_name.unwrap(),
                pending_readers: AtomicU32::new(0),
            },
        );
        Ok(key)
    }

    pub fn read_entry_config(&self, key: u64) -> Result<EntryDescriptor, SmosError> {
        let entry = self.entries.get(&key).ok_or(SmosError::NoSuchEntry { key })?;
        entry.pending_readers.fetch_add(1, Ordering::AcqRel);
        Ok(entry.snapshot())
    }

    pub fn read_latest_entry_config(&self) -> Result<(u64, EntryDescriptor), SmosError> {
        let (&key, entry) = self.entries.iter().next_back().ok_or(SmosError::Empty)?;
        entry.pending_readers.fetch_add(1, Ordering::AcqRel);
        Ok((key, entry.snapshot()))
    }

    pub fn release_read_reference(&self, key: u64) -> Result<(), SmosError> {
        let entry = self.entries.get(&key).ok_or(SmosError::NoSuchEntry { key })?;
        let result = entry.pending_readers.fetch_update(
            Ordering::AcqRel,
            Ordering::Acquire,
            |v| v.checked_sub(1),
        );
        if result.is_err() {
            InvariantViolation::ReadRefDoubleRelease { key }.raise();
        }
        Ok(())
    }

    fn release_block(&mut self, block_idx: usize) {
        if self.free_blocks.contains(&block_idx) {
            InvariantViolation::BlockDoubleRelease { block_idx }.raise();
        }
        self.free_blocks.push_back(block_idx);
    }

    pub fn delete_entry_config(&mut self, key: u64, force: bool) -> Result<(), SmosError> {
        let pending = self
            .entries
            .get(&key)
            .ok_or(SmosError::NoSuchEntry { key })?
            .pending_readers
            .load(Ordering::Acquire);
        if pending > 0 && !force {
            return Err(SmosError::PermissionDenied);
        }
        let entry = self.entries.remove(&key).unwrap();
        self.release_block(entry.mapped_block_idx);
        Ok(())
    }

    /// Removes and returns the oldest live entry (smallest key).
    pub fn pop_entry_config(&mut self, force: bool) -> Result<EntryDescriptor, SmosError> {
        let key = *self.entries.keys().next().ok_or(SmosError::Empty)?;
        let pending = self.entries[&key].pending_readers.load(Ordering::Acquire);
        if pending > 0 && !force {
            return Err(SmosError::PermissionDenied);
        }
        let entry = self.entries.remove(&key).unwrap();
        Ok(entry.snapshot())
    }

    /// Releases the block mapped by a popped descriptor back to the free
    /// pool. Split from `pop_entry_config` so a caller can inspect or copy
    /// the payload out of shared memory before the block is recycled.
    pub fn free_block_mapping(&mut self, desc: &EntryDescriptor) -> Result<(), SmosError> {
        if desc.track_name.as_deref() != Some(self.name.as_str()) {
            InvariantViolation::TrackMismatch {
                expected: self.name.clone(),
                actual: desc.track_name.clone().unwrap_or_default(),
            }
            .raise();
        }
        let Some(block_idx) = desc.mapped_block_idx else {
            InvariantViolation::UnallocatedEntry.raise();
        };
        self.release_block(block_idx);
        Ok(())
    }

    pub fn get_entry_offset(&self, desc: &EntryDescriptor) -> Result<usize, SmosError> {
        let Some(block_idx) = desc.mapped_block_idx else {
            InvariantViolation::UnallocatedEntry.raise();
        };
        if block_idx >= self.max_capacity {
            InvariantViolation::MappingError {
                block_idx,
                capacity: self.max_capacity,
            }
            .raise();
        }
        Ok(block_idx * self.block_size)
    }

    pub fn stop(&mut self) -> Result<(), SmosError> {
        self.segment
            .unlink()
            .map_err(|e| SmosError::Segment(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smos_common::descriptor::Dtype;

    fn numeric_desc() -> EntryDescriptor {
        EntryDescriptor::new(ElementKind::Numeric {
            dtype: Dtype::F64,
            shape: vec![4],
        })
    }

    #[test]
    fn allocate_commit_read_release_roundtrip() {
        let mut track = Track::new("t:roundtrip", 64, 4).unwrap();
        let mut desc = numeric_desc();
        track.allocate_block(&mut desc).unwrap();
        let key = track.append_entry_config(desc).unwrap();

        let read_back = track.read_entry_config(key).unwrap();
        assert_eq!(read_back.pending_readers, 1);
        track.release_read_reference(key).unwrap();

        let read_back = track.read_entry_config(key).unwrap();
        assert_eq!(read_back.pending_readers, 1);
        track.release_read_reference(key).unwrap();
    }

    #[test]
    fn block_count_is_conserved_across_allocate_and_delete() {
        let mut track = Track::new("t:conserve", 32, 3).unwrap();
        assert_eq!(track.free_block_count(), 3);
        let mut desc = numeric_desc();
        track.allocate_block(&mut desc).unwrap();
        let key = track.append_entry_config(desc).unwrap();
        assert_eq!(track.free_block_count(), 2);
        track.delete_entry_config(key, false).unwrap();
        assert_eq!(track.free_block_count(), 3);
    }

    #[test]
    fn exhausted_track_reports_no_free_block() {
        let mut track = Track::new("t:exhaust", 8, 1).unwrap();
        let mut desc = numeric_desc();
        track.allocate_block(&mut desc).unwrap();
        let mut second = numeric_desc();
        assert!(matches!(
            track.allocate_block(&mut second),
            Err(SmosError::NoFreeBlock)
        ));
    }

    #[test]
    fn pop_returns_oldest_entry_first() {
        let mut track = Track::new("t:fifo", 8, 4).unwrap();
        let mut keys = Vec::new();
        for _ in 0..3 {
            let mut desc = numeric_desc();
            track.allocate_block(&mut desc).unwrap();
            keys.push(track.append_entry_config(desc).unwrap());
        }
        let popped = track.pop_entry_config(false).unwrap();
        track.free_block_mapping(&popped).unwrap();
        assert_eq!(popped.mapped_block_idx, Some(0));
        assert_eq!(track.entry_count(), 2);
    }

    #[test]
    fn pop_blocked_by_pending_reader_unless_forced() {
        let mut track = Track::new("t:pending", 8, 2).unwrap();
        let mut desc = numeric_desc();
        track.allocate_block(&mut desc).unwrap();
        let key = track.append_entry_config(desc).unwrap();
        track.read_entry_config(key).unwrap();

        assert!(matches!(
            track.pop_entry_config(false),
            Err(SmosError::PermissionDenied)
        ));
        let popped = track.pop_entry_config(true).unwrap();
        track.free_block_mapping(&popped).unwrap();
    }

    #[test]
    fn double_release_is_an_invariant_violation() {
        let mut track = Track::new("t:double-release", 8, 1).unwrap();
        let mut desc = numeric_desc();
        track.allocate_block(&mut desc).unwrap();
        let key = track.append_entry_config(desc).unwrap();
        track.read_entry_config(key).unwrap();
        track.release_read_reference(key).unwrap();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            track.release_read_reference(key).unwrap();
        }));
        assert!(result.is_err());
    }

    #[test]
    fn empty_track_pop_reports_empty() {
        let mut track = Track::new("t:empty", 8, 1).unwrap();
        assert!(matches!(track.pop_entry_config(false), Err(SmosError::Empty)));
    }
}
