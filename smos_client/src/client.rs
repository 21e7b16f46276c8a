//! The client-facing entry point: connects to a coordinator and exposes
//! one method per store operation.

use crate::error::ClientError;
use crate::handle::{HandleKind, ObjectHandle, call};
use crate::transport::{read_frame, write_frame};
use smos_common::consts::CONNECT_RETRY_INTERVAL_SECS;
use smos_common::descriptor::{Dtype, ElementKind, EntryDescriptor};
use smos_common::wire::{Handshake, HandshakeAck, Request, Response};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

pub struct Client {
    conn: Arc<Mutex<TcpStream>>,
}

impl Client {
    /// Connects to a coordinator at `addr`, retrying once per second on
    /// `ConnectionRefused` until it comes up (the coordinator may not have
    /// started yet). Any other connection error propagates immediately.
    pub fn connect(addr: impl ToSocketAddrs + Clone, authkey: &str) -> Result<Self, ClientError> {
        let mut stream = loop {
            match TcpStream::connect(addr.clone()) {
                Ok(stream) => break stream,
                Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
                    warn!("coordinator not yet accepting connections, retrying");
                    std::thread::sleep(Duration::from_secs(CONNECT_RETRY_INTERVAL_SECS));
                }
                Err(e) => return Err(ClientError::Io(e)),
            }
        };

        write_frame(
            &mut stream,
            &Handshake {
                authkey: authkey.to_string(),
            },
        )?;
        let ack: HandshakeAck = read_frame(&mut stream)?;
        if !ack.accepted {
            return Err(ClientError::AuthenticationFailed);
        }
        info!("connected to coordinator");

        Ok(Self {
            conn: Arc::new(Mutex::new(stream)),
        })
    }

    pub fn create_object(
        &self,
        name: &str,
        max_capacity: usize,
        block_size_list: &[usize],
        track_name_list: Option<Vec<String>>,
    ) -> Result<(), ClientError> {
        call(
            &self.conn,
            Request::CreateObject {
                name: name.to_string(),
                max_capacity,
                block_size_list: block_size_list.to_vec(),
                track_name_list,
            },
        )?;
        Ok(())
    }

    pub fn remove_object(&self, name: &str) -> Result<(), ClientError> {
        call(&self.conn, Request::RemoveObject { name: name.to_string() })?;
        Ok(())
    }

    /// Builds a write handle for a new entry: one descriptor per track,
    /// each allocated (but not committed) on the store.
    ///
    /// `dtype_list[i]`/`shape_list[i]` describe track `i` when
    /// `is_numeric_list[i]` is `true`; otherwise track `i` is opaque and
    /// both are ignored. All three slices must have the object's track
    /// count as their length.
    pub fn create_entry(
        &self,
        name: &str,
        dtype_list: &[Dtype],
        shape_list: &[Vec<u64>],
        is_numeric_list: &[bool],
    ) -> Result<ObjectHandle, ClientError> {
        if dtype_list.len() != shape_list.len() || dtype_list.len() != is_numeric_list.len() {
            return Err(ClientError::DimensionMismatch(format!(
                "dtype_list ({}), shape_list ({}) and is_numeric_list ({}) must have equal length",
                dtype_list.len(),
                shape_list.len(),
                is_numeric_list.len()
            )));
        }

        let descs: Vec<EntryDescriptor> = dtype_list
            .iter()
            .zip(shape_list)
            .zip(is_numeric_list)
            .map(|((dtype, shape), is_numeric)| {
                let kind = if *is_numeric {
                    ElementKind::Numeric {
                        dtype: *dtype,
                        shape: shape.clone(),
                    }
                } else {
                    ElementKind::Opaque
                };
                EntryDescriptor::new(kind)
            })
            .collect();

        let Response::Entries(descs) = call(
            &self.conn,
            Request::AllocateBlock {
                name: name.to_string(),
                descs,
            },
        )?
        else {
            return Err(ClientError::UnexpectedResponse);
        };

        Ok(ObjectHandle {
            object_name: name.to_string(),
            kind: HandleKind::Write,
            descs,
            mappings: Vec::new(),
            offsets: Vec::new(),
            block_sizes: Vec::new(),
            conn: Arc::clone(&self.conn),
            released: false,
        })
    }

    pub fn open_entry(&self, name: &str, key: u64) -> Result<ObjectHandle, ClientError> {
        let Response::Entries(descs) = call(
            &self.conn,
            Request::ReadEntryConfig {
                name: name.to_string(),
                key,
            },
        )?
        else {
            return Err(ClientError::UnexpectedResponse);
        };
        Ok(ObjectHandle {
            object_name: name.to_string(),
            kind: HandleKind::Read { key },
            descs,
            mappings: Vec::new(),
            offsets: Vec::new(),
            block_sizes: Vec::new(),
            conn: Arc::clone(&self.conn),
            released: false,
        })
    }

    pub fn read_latest_from_object(&self, name: &str) -> Result<ObjectHandle, ClientError> {
        let Response::KeyedEntries(key, descs) = call(
            &self.conn,
            Request::ReadLatestEntryConfig {
                name: name.to_string(),
            },
        )?
        else {
            return Err(ClientError::UnexpectedResponse);
        };
        Ok(ObjectHandle {
            object_name: name.to_string(),
            kind: HandleKind::Read { key },
            descs,
            mappings: Vec::new(),
            offsets: Vec::new(),
            block_sizes: Vec::new(),
            conn: Arc::clone(&self.conn),
            released: false,
        })
    }

    /// Appends a write handle's descriptors, making the entry visible and
    /// returning its key. Tears down the handle's local mapping.
    pub fn commit_entry(&self, mut handle: ObjectHandle) -> Result<u64, ClientError> {
        let Response::Key(key) = call(
            &self.conn,
            Request::AppendEntryConfig {
                name: handle.object_name.clone(),
                descs: handle.descs.clone(),
            },
        )?
        else {
            return Err(ClientError::UnexpectedResponse);
        };
        handle.mappings.clear();
        handle.released = true;
        Ok(key)
    }

    /// Decrements a read handle's pending-reader count and tears down its
    /// local mapping. Not defined for write handles.
    pub fn release_entry(&self, mut handle: ObjectHandle) -> Result<(), ClientError> {
        if let HandleKind::Read { key } = handle.kind {
            call(
                &self.conn,
                Request::ReleaseReadReference {
                    name: handle.object_name.clone(),
                    key,
                },
            )?;
        }
        handle.mappings.clear();
        handle.released = true;
        Ok(())
    }

    pub fn delete_entry(&self, name: &str, key: u64, force_delete: bool) -> Result<(), ClientError> {
        call(
            &self.conn,
            Request::DeleteEntryConfig {
                name: name.to_string(),
                key,
                force: force_delete,
            },
        )?;
        Ok(())
    }

    /// Pops the oldest live entry off `name`, returning a handle the
    /// caller must eventually pass to `free_handle` to return its block.
    pub fn pop_from_object(&self, name: &str, force_pop: bool) -> Result<ObjectHandle, ClientError> {
        let Response::Entries(descs) = call(
            &self.conn,
            Request::PopEntryConfig {
                name: name.to_string(),
                force: force_pop,
            },
        )?
        else {
            return Err(ClientError::UnexpectedResponse);
        };
        Ok(ObjectHandle {
            object_name: name.to_string(),
            kind: HandleKind::Popped,
            descs,
            mappings: Vec::new(),
            offsets: Vec::new(),
            block_sizes: Vec::new(),
            conn: Arc::clone(&self.conn),
            released: false,
        })
    }

    /// Returns a popped handle's block to the free pool. Tears down its
    /// local mapping.
    pub fn free_handle(&self, mut handle: ObjectHandle) -> Result<(), ClientError> {
        if matches!(handle.kind, HandleKind::Popped) {
            call(
                &self.conn,
                Request::FreeBlockMapping {
                    name: handle.object_name.clone(),
                    descs: handle.descs.clone(),
                },
            )?;
        }
        handle.mappings.clear();
        handle.released = true;
        Ok(())
    }

    pub fn get_entry_count(&self, name: &str) -> Result<usize, ClientError> {
        let Response::Count(count) = call(
            &self.conn,
            Request::GetEntryCount {
                name: name.to_string(),
            },
        )?
        else {
            return Err(ClientError::UnexpectedResponse);
        };
        Ok(count)
    }

    pub fn get_entry_idx_list(&self, name: &str) -> Result<Vec<u64>, ClientError> {
        let Response::Keys(keys) = call(
            &self.conn,
            Request::GetEntryIdxList {
                name: name.to_string(),
            },
        )?
        else {
            return Err(ClientError::UnexpectedResponse);
        };
        Ok(keys)
    }

    pub fn profile(&self) -> Result<Vec<(String, usize, usize)>, ClientError> {
        let Response::Profile(profile) = call(&self.conn, Request::Profile)? else {
            return Err(ClientError::UnexpectedResponse);
        };
        Ok(profile)
    }
}
