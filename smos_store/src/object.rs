//! An object: a fixed number of tracks that are always mutated in lockstep,
//! fanned out across under a single fair reader/writer lock.

use crate::lock::FairRwLock;
use crate::track::Track;
use smos_common::descriptor::EntryDescriptor;
use smos_common::error::{InvariantViolation, SmosError};

/// A coarse classification of a `Result` used only to check that every
/// track in an object agreed on the outcome of a fanned-out call. Payload
/// values are deliberately ignored; only the which-branch matters.
fn outcome_kind<T>(result: &Result<T, SmosError>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(SmosError::NoFreeBlock) => 1,
        Err(SmosError::NoSuchEntry { .. }) => 2,
        Err(SmosError::Empty) => 3,
        Err(SmosError::PermissionDenied) => 4,
        Err(SmosError::KeySpaceExhausted) => 5,
        Err(_) => 255,
    }
}

pub struct Object {
    name: String,
    track_count: usize,
    max_capacity: usize,
    state: FairRwLock<Vec<Track>>,
}

impl Object {
    pub fn create(
        name: &str,
        max_capacity: usize,
        block_size_list: &[usize],
        track_name_list: Option<&[String]>,
    ) -> Result<Self, SmosError> {
        let track_count = block_size_list.len();
        if let Some(names) = track_name_list {
            if names.len() != track_count {
                return Err(SmosError::DimensionMismatch(format!(
                    "object '{name}' given {} track names for {track_count} tracks",
                    names.len()
                )));
            }
        }
        let mut tracks = Vec::with_capacity(track_count);
        for (idx, &block_size) in block_size_list.iter().enumerate() {
            let track_name = match track_name_list {
                Some(names) => names[idx].clone(),
                None => idx.to_string(),
            };
            let full_name = format!("{name}:{track_name}");
            match Track::new(&full_name, block_size, max_capacity) {
                Ok(track) => tracks.push(track),
                Err(e) => {
                    for mut track in tracks {
                        let _ = track.stop();
                    }
                    return Err(e);
                }
            }
        }
        Ok(Self {
            name: name.to_string(),
            track_count,
            max_capacity,
            state: FairRwLock::new(tracks),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn track_count(&self) -> usize {
        self.track_count
    }

    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    fn assert_aligned<T>(&self, results: &[Result<T, SmosError>]) {
        let first = outcome_kind(&results[0]);
        if !results.iter().all(|r| outcome_kind(r) == first) {
            InvariantViolation::TrackUnaligned {
                object: self.name.clone(),
            }
            .raise();
        }
    }

    fn check_fan_out_width<T>(&self, items: &[T]) -> Result<(), SmosError> {
        if items.len() != self.track_count {
            return Err(SmosError::DimensionMismatch(format!(
                "object '{}' has {} tracks but {} values were supplied",
                self.name,
                self.track_count,
                items.len()
            )));
        }
        Ok(())
    }

    pub fn allocate_block(&self, descs: &mut [EntryDescriptor]) -> Result<(), SmosError> {
        self.check_fan_out_width(descs)?;
        let mut tracks = self.state.write();
        let results: Vec<Result<(), SmosError>> = tracks
            .iter_mut()
            .zip(descs.iter_mut())
            .map(|(t, d)| t.allocate_block(d))
            .collect();
        self.assert_aligned(&results);
        results.into_iter().collect::<Result<Vec<_>, _>>()?;
        Ok(())
    }

    pub fn append_entry_config(&self, descs: Vec<EntryDescriptor>) -> Result<u64, SmosError> {
        self.check_fan_out_width(&descs)?;
        let mut tracks = self.state.write();
        let results: Vec<Result<u64, SmosError>> = tracks
            .iter_mut()
            .zip(descs)
            .map(|(t, d)| t.append_entry_config(d))
            .collect();
        self.assert_aligned(&results);
        let keys = results.into_iter().collect::<Result<Vec<_>, _>>()?;
        let key = keys[0];
        if !keys.iter().all(|k| *k == key) {
            InvariantViolation::TrackUnaligned {
                object: self.name.clone(),
            }
            .raise();
        }
        Ok(key)
    }

    pub fn read_entry_config(&self, key: u64) -> Result<Vec<EntryDescriptor>, SmosError> {
        let tracks = self.state.read();
        let results: Vec<Result<EntryDescriptor, SmosError>> =
            tracks.iter().map(|t| t.read_entry_config(key)).collect();
        self.assert_aligned(&results);
        results.into_iter().collect()
    }

    pub fn read_latest_entry_config(&self) -> Result<(u64, Vec<EntryDescriptor>), SmosError> {
        let tracks = self.state.read();
        let results: Vec<Result<(u64, EntryDescriptor), SmosError>> = tracks
            .iter()
            .map(|t| t.read_latest_entry_config())
            .collect();
        self.assert_aligned(&results);
        let pairs = results.into_iter().collect::<Result<Vec<_>, _>>()?;
        let key = pairs[0].0;
        if !pairs.iter().all(|(k, _)| *k == key) {
            InvariantViolation::TrackUnaligned {
                object: self.name.clone(),
            }
            .raise();
        }
        Ok((key, pairs.into_iter().map(|(_, d)| d).collect()))
    }

    pub fn release_read_reference(&self, key: u64) -> Result<(), SmosError> {
        let tracks = self.state.read();
        let results: Vec<Result<(), SmosError>> = tracks
            .iter()
            .map(|t| t.release_read_reference(key))
            .collect();
        self.assert_aligned(&results);
        results.into_iter().collect::<Result<Vec<_>, _>>()?;
        Ok(())
    }

    pub fn delete_entry_config(&self, key: u64, force: bool) -> Result<(), SmosError> {
        let mut tracks = self.state.write();
        let results: Vec<Result<(), SmosError>> = tracks
            .iter_mut()
            .map(|t| t.delete_entry_config(key, force))
            .collect();
        self.assert_aligned(&results);
        results.into_iter().collect::<Result<Vec<_>, _>>()?;
        Ok(())
    }

    pub fn pop_entry_config(&self, force: bool) -> Result<Vec<EntryDescriptor>, SmosError> {
        let mut tracks = self.state.write();
        let results: Vec<Result<EntryDescriptor, SmosError>> =
            tracks.iter_mut().map(|t| t.pop_entry_config(force)).collect();
        self.assert_aligned(&results);
        results.into_iter().collect()
    }

    pub fn free_block_mapping(&self, descs: &[EntryDescriptor]) -> Result<(), SmosError> {
        self.check_fan_out_width(descs)?;
        let mut tracks = self.state.write();
        let results: Vec<Result<(), SmosError>> = tracks
            .iter_mut()
            .zip(descs.iter())
            .map(|(t, d)| t.free_block_mapping(d))
            .collect();
        self.assert_aligned(&results);
        results.into_iter().collect::<Result<Vec<_>, _>>()?;
        Ok(())
    }

    pub fn get_entry_offset(&self, descs: &[EntryDescriptor]) -> Result<Vec<usize>, SmosError> {
        self.check_fan_out_width(descs)?;
        let tracks = self.state.read();
        tracks
            .iter()
            .zip(descs.iter())
            .map(|(t, d)| t.get_entry_offset(d))
            .collect()
    }

    pub fn get_block_size_list(&self) -> Vec<usize> {
        self.state.read().iter().map(|t| t.block_size()).collect()
    }

    pub fn get_shm_name_list(&self) -> Vec<String> {
        self.state
            .read()
            .iter()
            .map(|t| t.shm_name().to_string())
            .collect()
    }

    pub fn get_entry_count(&self) -> usize {
        let tracks = self.state.read();
        let counts: Vec<usize> = tracks.iter().map(|t| t.entry_count()).collect();
        let first = counts[0];
        if !counts.iter().all(|c| *c == first) {
            InvariantViolation::TrackUnaligned {
                object: self.name.clone(),
            }
            .raise();
        }
        first
    }

    pub fn get_entry_idx_list(&self) -> Vec<u64> {
        self.state.read()[0].entry_keys()
    }

    pub fn stop(&self) -> Result<(), SmosError> {
        let mut tracks = self.state.write();
        for track in tracks.iter_mut() {
            track.stop()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smos_common::descriptor::{Dtype, ElementKind};

    fn numeric_desc() -> EntryDescriptor {
        EntryDescriptor::new(ElementKind::Numeric {
            dtype: Dtype::F32,
            shape: vec![8],
        })
    }

    #[test]
    fn create_then_append_then_read_across_tracks() {
        let object = Object::create("obj", 4, &[32, 64], None).unwrap();
        let mut descs = vec![numeric_desc(), numeric_desc()];
        object.allocate_block(&mut descs).unwrap();
        let key = object.append_entry_config(descs).unwrap();

        let read_back = object.read_entry_config(key).unwrap();
        assert_eq!(read_back.len(), 2);
        assert_eq!(read_back[0].mapped_block_idx, Some(0));
        assert_eq!(read_back[1].mapped_block_idx, Some(0));

        object.release_read_reference(key).unwrap();
        assert_eq!(object.get_entry_count(), 1);
    }

    #[test]
    fn cross_track_dimension_mismatch_is_rejected() {
        let object = Object::create("obj", 4, &[32, 64], None).unwrap();
        let mut descs = vec![numeric_desc()];
        assert!(matches!(
            object.allocate_block(&mut descs),
            Err(SmosError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn pop_and_free_releases_blocks_on_every_track() {
        let object = Object::create("obj", 2, &[16, 16], None).unwrap();
        let mut descs = vec![numeric_desc(), numeric_desc()];
        object.allocate_block(&mut descs).unwrap();
        object.append_entry_config(descs).unwrap();

        let popped = object.pop_entry_config(false).unwrap();
        object.free_block_mapping(&popped).unwrap();
        assert_eq!(object.get_entry_count(), 0);

        let offsets = object.get_entry_offset(&popped).unwrap();
        assert_eq!(offsets, vec![0, 0]);
    }

    #[test]
    fn shm_name_list_has_one_entry_per_track() {
        let object = Object::create("obj", 2, &[16, 16, 16], None).unwrap();
        assert_eq!(object.get_shm_name_list().len(), 3);
        assert_eq!(object.get_block_size_list(), vec![16, 16, 16]);
    }
}
