//! Client-side object handles: the local mirror of a committed, popped, or
//! not-yet-committed entry, plus whatever segments it has mapped.

use crate::error::ClientError;
use crate::transport::{read_frame, write_frame};
use smos_common::consts::{TRANSIENT_RETRY_BACKOFF_MS, TRANSIENT_RETRY_COUNT};
use smos_common::descriptor::{Dtype, ElementKind, EntryDescriptor};
use smos_common::error::InvariantViolation;
use smos_common::wire::{Request, Response, WireError};
use smos_shared_memory::Segment;
use std::net::TcpStream;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

/// What a handle was acquired for, and therefore what `Drop` must release.
pub(crate) enum HandleKind {
    /// From `create_entry`: descriptors allocated but not yet committed.
    /// `release_entry` is not defined on this shape; `Drop` is a no-op, so
    /// an uncommitted handle's reservation just sits allocated until the
    /// object or store is torn down.
    Write,
    /// From `open_entry` / `read_from_object` / `read_latest_from_object`:
    /// a live entry with an incremented reader count.
    Read { key: u64 },
    /// From `pop_from_object`: the entry's descriptor but not its block;
    /// the block is still owed back to the store via `free_block_mapping`.
    Popped,
}

/// A bundle of per-track descriptors plus whatever segments have been
/// mapped locally via `open_shm`. Dropping a read or popped handle without
/// calling `release_entry`/`free_handle` first performs the release
/// automatically, so a reference or a block is never leaked on an early
/// return or a panic.
pub struct ObjectHandle {
    pub(crate) object_name: String,
    pub(crate) kind: HandleKind,
    pub(crate) descs: Vec<EntryDescriptor>,
    pub(crate) mappings: Vec<Option<Segment>>,
    pub(crate) offsets: Vec<usize>,
    pub(crate) block_sizes: Vec<usize>,
    pub(crate) conn: Arc<Mutex<TcpStream>>,
    pub(crate) released: bool,
}

impl ObjectHandle {
    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    pub fn key(&self) -> Option<u64> {
        match self.kind {
            HandleKind::Read { key } => Some(key),
            _ => None,
        }
    }

    pub fn track_count(&self) -> usize {
        self.descs.len()
    }

    pub fn descriptors(&self) -> &[EntryDescriptor] {
        &self.descs
    }

    /// Maps every track's segment locally and resolves each track's byte
    /// offset and block size. Must be called before any of the byte-view
    /// accessors below.
    pub fn open_shm(&mut self) -> Result<(), ClientError> {
        let Response::Names(shm_names) = call(
            &self.conn,
            Request::GetShmNameList {
                name: self.object_name.clone(),
            },
        )?
        else {
            return Err(ClientError::UnexpectedResponse);
        };
        let Response::Sizes(block_sizes) = call(
            &self.conn,
            Request::GetBlockSizeList {
                name: self.object_name.clone(),
            },
        )?
        else {
            return Err(ClientError::UnexpectedResponse);
        };
        let Response::Offsets(offsets) = call(
            &self.conn,
            Request::GetEntryOffset {
                name: self.object_name.clone(),
                descs: self.descs.clone(),
            },
        )?
        else {
            return Err(ClientError::UnexpectedResponse);
        };

        self.mappings = shm_names
            .iter()
            .map(|name| Segment::open(name).map(Some))
            .collect::<Result<_, _>>()
            .map_err(|e| ClientError::Io(std::io::Error::other(e.to_string())))?;
        self.block_sizes = block_sizes;
        self.offsets = offsets;
        Ok(())
    }

    fn entry_byte_len(&self, track_idx: usize) -> usize {
        self.descs[track_idx]
            .kind
            .numeric_byte_len()
            .unwrap_or(self.block_sizes[track_idx])
    }

    /// The mapped entry bytes for one track: the numeric byte length when
    /// the descriptor is numeric, or the whole block for an opaque entry.
    pub fn bytes(&self, track_idx: usize) -> Result<&[u8], ClientError> {
        let offset = self.offsets[track_idx];
        let len = self.entry_byte_len(track_idx);
        let segment = self.mappings[track_idx]
            .as_ref()
            .ok_or(ClientError::UnexpectedResponse)?;
        segment
            .read_at(offset, len)
            .map_err(|e| ClientError::Io(std::io::Error::other(e.to_string())))
    }

    pub fn bytes_mut(&mut self, track_idx: usize) -> Result<&mut [u8], ClientError> {
        let offset = self.offsets[track_idx];
        let len = self.entry_byte_len(track_idx);
        let segment = self.mappings[track_idx]
            .as_mut()
            .ok_or(ClientError::UnexpectedResponse)?;
        let data = segment.data_mut();
        if offset + len > data.len() {
            return Err(ClientError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "entry extends past the mapped segment",
            )));
        }
        Ok(&mut data[offset..offset + len])
    }

    /// Reinterprets this track's bytes as a slice of `f32`. Returns
    /// `UnexpectedResponse` if the descriptor's dtype is not `F32`.
    pub fn as_f32(&self, track_idx: usize) -> Result<&[f32], ClientError> {
        self.as_typed(track_idx, Dtype::F32)
    }

    pub fn as_f64(&self, track_idx: usize) -> Result<&[f64], ClientError> {
        self.as_typed(track_idx, Dtype::F64)
    }

    fn as_typed<T>(&self, track_idx: usize, expected: Dtype) -> Result<&[T], ClientError> {
        match &self.descs[track_idx].kind {
            ElementKind::Numeric { dtype, .. } if *dtype == expected => {
                let bytes = self.bytes(track_idx)?;
                let elems = bytes.len() / std::mem::size_of::<T>();
                // SAFETY: `bytes` is exactly `elems * size_of::<T>()` long and
                // comes from a mapping this handle owns for its lifetime.
                Ok(unsafe { std::slice::from_raw_parts(bytes.as_ptr() as *const T, elems) })
            }
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}

/// True for connection-level failures a retry can plausibly paper over
/// (the coordinator reset or closed the connection mid-call), as opposed
/// to a malformed frame or a store-level error the caller must see.
fn is_transient(e: &ClientError) -> bool {
    match e {
        ClientError::Closed => true,
        ClientError::Io(io) => matches!(
            io.kind(),
            std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
        ),
        _ => false,
    }
}

pub(crate) fn call(conn: &Arc<Mutex<TcpStream>>, request: Request) -> Result<Response, ClientError> {
    let mut stream = conn.lock().unwrap_or_else(|e| e.into_inner());
    let mut attempt = 0;
    loop {
        let outcome: Result<Response, ClientError> =
            write_frame(&mut stream, &request).and_then(|_| read_frame(&mut stream));
        match outcome {
            Ok(Response::Err(e)) => return Err(ClientError::Store(e)),
            Ok(response) => return Ok(response),
            Err(e) if is_transient(&e) && attempt < TRANSIENT_RETRY_COUNT => {
                attempt += 1;
                warn!(attempt, error = %e, "transient coordinator error, retrying");
                std::thread::sleep(Duration::from_millis(TRANSIENT_RETRY_BACKOFF_MS));
            }
            Err(e) if is_transient(&e) => {
                InvariantViolation::ServerDropOut.raise();
            }
            Err(e) => return Err(e),
        }
    }
}

impl Drop for ObjectHandle {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let result = match self.kind {
            HandleKind::Write => return,
            HandleKind::Read { key } => call(
                &self.conn,
                Request::ReleaseReadReference {
                    name: self.object_name.clone(),
                    key,
                },
            ),
            HandleKind::Popped => call(
                &self.conn,
                Request::FreeBlockMapping {
                    name: self.object_name.clone(),
                    descs: self.descs.clone(),
                },
            ),
        };
        if let Err(e) = result {
            warn!(object = %self.object_name, error = %e, "failed to release handle on drop");
        }
    }
}

impl From<WireError> for ClientError {
    fn from(e: WireError) -> Self {
        ClientError::Store(e)
    }
}
