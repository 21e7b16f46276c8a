//! The RPC request/response vocabulary shared by `smos_server` and
//! `smos_client`. Kept here, rather than duplicated on each side of the
//! channel, so a request built by the client and a response produced by
//! the store serialize to the same shapes.
//!
//! The wire encoding itself (length-prefixed `serde_json` frames) is not
//! part of this vocabulary; each side frames these values independently.

use crate::descriptor::EntryDescriptor;
use crate::error::SmosError;
use crate::status::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Handshake {
    pub authkey: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HandshakeAck {
    pub accepted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub enum Request {
    CreateObject {
        name: String,
        max_capacity: usize,
        block_size_list: Vec<usize>,
        track_name_list: Option<Vec<String>>,
    },
    RemoveObject {
        name: String,
    },
    AllocateBlock {
        name: String,
        descs: Vec<EntryDescriptor>,
    },
    AppendEntryConfig {
        name: String,
        descs: Vec<EntryDescriptor>,
    },
    ReadEntryConfig {
        name: String,
        key: u64,
    },
    ReadLatestEntryConfig {
        name: String,
    },
    BatchReadEntryConfig {
        name: String,
        keys: Vec<u64>,
    },
    ReleaseReadReference {
        name: String,
        key: u64,
    },
    DeleteEntryConfig {
        name: String,
        key: u64,
        force: bool,
    },
    PopEntryConfig {
        name: String,
        force: bool,
    },
    FreeBlockMapping {
        name: String,
        descs: Vec<EntryDescriptor>,
    },
    GetEntryOffset {
        name: String,
        descs: Vec<EntryDescriptor>,
    },
    BatchGetEntryOffset {
        requests: Vec<(String, Vec<EntryDescriptor>)>,
    },
    GetBlockSizeList {
        name: String,
    },
    GetShmNameList {
        name: String,
    },
    GetTrackCount {
        name: String,
    },
    GetEntryCount {
        name: String,
    },
    GetEntryIdxList {
        name: String,
    },
    Profile,
}

#[derive(Debug, Serialize, Deserialize)]
pub enum Response {
    Ok,
    Object,
    Key(u64),
    Entries(Vec<EntryDescriptor>),
    KeyedEntries(u64, Vec<EntryDescriptor>),
    /// One `Vec<EntryDescriptor>` per requested key, in request order.
    /// `batch_read_entry_config` fails overall (as a `Response::Err`) if
    /// any key is missing, rather than reporting per-key outcomes.
    BatchEntries(Vec<Vec<EntryDescriptor>>),
    Offsets(Vec<usize>),
    BatchOffsets(Vec<Result<Vec<usize>, WireError>>),
    Sizes(Vec<usize>),
    Names(Vec<String>),
    Count(usize),
    Keys(Vec<u64>),
    Profile(Vec<(String, usize, usize)>),
    Err(WireError),
}

/// A `SmosError` flattened to cross the wire: the status code plus a
/// human-readable message, since `SmosError` itself does not round-trip
/// through `serde` (it wraps `std::io::Error`/`serde_json::Error`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireError {
    pub status: StatusCode,
    pub message: String,
}

impl From<&SmosError> for WireError {
    fn from(e: &SmosError) -> Self {
        Self {
            status: e.status(),
            message: e.to_string(),
        }
    }
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for WireError {}
