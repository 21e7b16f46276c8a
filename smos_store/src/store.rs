//! The top-level catalog: a name-indexed map of objects guarded by its own
//! fair reader/writer lock, one level above each object's own lock.

use crate::lock::FairRwLock;
use crate::object::Object;
use smos_common::descriptor::EntryDescriptor;
use smos_common::error::SmosError;
use std::collections::HashMap;

pub struct Store {
    objects: FairRwLock<HashMap<String, Object>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            objects: FairRwLock::new(HashMap::new()),
        }
    }

    pub fn create_object(
        &self,
        name: &str,
        max_capacity: usize,
        block_size_list: &[usize],
        track_name_list: Option<&[String]>,
    ) -> Result<(), SmosError> {
        let mut objects = self.objects.write();
        if objects.contains_key(name) {
            return Err(SmosError::ObjectAlreadyExists {
                name: name.to_string(),
            });
        }
        let object = Object::create(name, max_capacity, block_size_list, track_name_list)?;
        objects.insert(name.to_string(), object);
        Ok(())
    }

    pub fn remove_object(&self, name: &str) -> Result<(), SmosError> {
        let mut objects = self.objects.write();
        let object = objects
            .remove(name)
            .ok_or_else(|| SmosError::ObjectNotFound {
                name: name.to_string(),
            })?;
        object.stop()
    }

    fn with_object<R>(
        &self,
        name: &str,
        f: impl FnOnce(&Object) -> Result<R, SmosError>,
    ) -> Result<R, SmosError> {
        let objects = self.objects.read();
        let object = objects.get(name).ok_or_else(|| SmosError::ObjectNotFound {
            name: name.to_string(),
        })?;
        f(object)
    }

    pub fn allocate_block(
        &self,
        name: &str,
        descs: &mut [EntryDescriptor],
    ) -> Result<(), SmosError> {
        self.with_object(name, |o| o.allocate_block(descs))
    }

    pub fn append_entry_config(
        &self,
        name: &str,
        descs: Vec<EntryDescriptor>,
    ) -> Result<u64, SmosError> {
        self.with_object(name, |o| o.append_entry_config(descs))
    }

    pub fn read_entry_config(
        &self,
        name: &str,
        key: u64,
    ) -> Result<Vec<EntryDescriptor>, SmosError> {
        self.with_object(name, |o| o.read_entry_config(key))
    }

    pub fn read_latest_entry_config(
        &self,
        name: &str,
    ) -> Result<(u64, Vec<EntryDescriptor>), SmosError> {
        self.with_object(name, |o| o.read_latest_entry_config())
    }

    /// Reads several keys from one object under a single store-reader
    /// acquisition. Fails overall on the first missing key; pending-reader
    /// counts already bumped for keys read before that failure are not
    /// rolled back.
    pub fn batch_read_entry_config(
        &self,
        name: &str,
        keys: &[u64],
    ) -> Result<Vec<Vec<EntryDescriptor>>, SmosError> {
        self.with_object(name, |o| keys.iter().map(|&key| o.read_entry_config(key)).collect())
    }

    pub fn release_read_reference(&self, name: &str, key: u64) -> Result<(), SmosError> {
        self.with_object(name, |o| o.release_read_reference(key))
    }

    pub fn delete_entry_config(&self, name: &str, key: u64, force: bool) -> Result<(), SmosError> {
        self.with_object(name, |o| o.delete_entry_config(key, force))
    }

    pub fn pop_entry_config(
        &self,
        name: &str,
        force: bool,
    ) -> Result<Vec<EntryDescriptor>, SmosError> {
        self.with_object(name, |o| o.pop_entry_config(force))
    }

    pub fn free_block_mapping(
        &self,
        name: &str,
        descs: &[EntryDescriptor],
    ) -> Result<(), SmosError> {
        self.with_object(name, |o| o.free_block_mapping(descs))
    }

    pub fn get_entry_offset(
        &self,
        name: &str,
        descs: &[EntryDescriptor],
    ) -> Result<Vec<usize>, SmosError> {
        self.with_object(name, |o| o.get_entry_offset(descs))
    }

    pub fn batch_get_entry_offset(
        &self,
        requests: &[(String, Vec<EntryDescriptor>)],
    ) -> Vec<Result<Vec<usize>, SmosError>> {
        requests
            .iter()
            .map(|(name, descs)| self.get_entry_offset(name, descs))
            .collect()
    }

    pub fn get_block_size_list(&self, name: &str) -> Result<Vec<usize>, SmosError> {
        self.with_object(name, |o| Ok(o.get_block_size_list()))
    }

    pub fn get_shm_name_list(&self, name: &str) -> Result<Vec<String>, SmosError> {
        self.with_object(name, |o| Ok(o.get_shm_name_list()))
    }

    pub fn get_track_count(&self, name: &str) -> Result<usize, SmosError> {
        self.with_object(name, |o| Ok(o.track_count()))
    }

    pub fn get_entry_count(&self, name: &str) -> Result<usize, SmosError> {
        self.with_object(name, |o| Ok(o.get_entry_count()))
    }

    pub fn get_entry_idx_list(&self, name: &str) -> Result<Vec<u64>, SmosError> {
        self.with_object(name, |o| Ok(o.get_entry_idx_list()))
    }

    /// A snapshot of every object's name, track count and live entry count,
    /// for the diagnostic `profile` RPC.
    pub fn profile(&self) -> Vec<(String, usize, usize)> {
        let objects = self.objects.read();
        objects
            .values()
            .map(|o| (o.name().to_string(), o.track_count(), o.get_entry_count()))
            .collect()
    }

    pub fn object_names(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }

    /// Tears down every object's segments. Called on coordinator shutdown.
    pub fn stop_all(&self) -> Result<(), SmosError> {
        let mut objects = self.objects.write();
        for (_, object) in objects.drain() {
            object.stop()?;
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
            dtype: Dtype::I32,
            shape: vec![16],
        })
    }

    #[test]
    fn create_duplicate_object_is_rejected() {
        let store = Store::new();
        store.create_object("a", 4, &[16], None).unwrap();
        assert!(matches!(
            store.create_object("a", 4, &[16], None),
            Err(SmosError::ObjectAlreadyExists { .. })
        ));
    }

    #[test]
    fn operations_on_missing_object_report_not_found() {
        let store = Store::new();
        assert!(matches!(
            store.read_entry_config("missing", 0),
            Err(SmosError::ObjectNotFound { .. })
        ));
    }

    #[test]
    fn end_to_end_allocate_append_read_pop() {
        let store = Store::new();
        store.create_object("obj", 4, &[32, 32], None).unwrap();

        let mut descs = vec![numeric_desc(), numeric_desc()];
        store.allocate_block("obj", &mut descs).unwrap();
        let key = store.append_entry_config("obj", descs).unwrap();

        let read_back = store.read_entry_config("obj", key).unwrap();
        assert_eq!(read_back.len(), 2);
        store.release_read_reference("obj", key).unwrap();

        let popped = store.pop_entry_config("obj", false).unwrap();
        store.free_block_mapping("obj", &popped).unwrap();
        assert_eq!(store.get_entry_count("obj").unwrap(), 0);
    }

    #[test]
    fn profile_reports_every_object() {
        let store = Store::new();
        store.create_object("a", 2, &[8], None).unwrap();
        store.create_object("b", 2, &[8, 8], None).unwrap();
        let mut profile = store.profile();
        profile.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(profile, vec![("a".to_string(), 1, 0), ("b".to_string(), 2, 0)]);
    }

    #[test]
    fn remove_object_then_recreate_succeeds() {
        let store = Store::new();
        store.create_object("obj", 2, &[8], None).unwrap();
        store.remove_object("obj").unwrap();
        store.create_object("obj", 2, &[8], None).unwrap();
    }
}
