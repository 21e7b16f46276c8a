//! Error tiers for the store core: `thiserror`-derived, struct-variant-with-
//! named-fields style throughout.

use thiserror::Error;

/// Everything a `Track` / `Object` / `Store` method can fail with.
///
/// The first group of variants are normal operational outcomes carrying a
/// wire status code; the second group are configuration errors that abort
/// the call. Invariant violations are a distinct type, [`InvariantViolation`],
/// deliberately excluded from the happy paths below: they are raised via
/// [`InvariantViolation::raise`] rather than returned, and must propagate
/// unmodified and never be caught.
#[derive(Debug, Error)]
pub enum SmosError {
    #[error("no free block available")]
    NoFreeBlock,

    #[error("no entry at key {key}")]
    NoSuchEntry { key: u64 },

    #[error("object is empty")]
    Empty,

    #[error("permission denied: entry has pending readers")]
    PermissionDenied,

    #[error("object '{name}' already exists")]
    ObjectAlreadyExists { name: String },

    #[error("object '{name}' not found")]
    ObjectNotFound { name: String },

    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("invalid input type: {0}")]
    InputType(String),

    #[error("no free port in configured range")]
    PortBusy,

    #[error("entry key space exhausted for this track")]
    KeySpaceExhausted,

    #[error("segment error: {0}")]
    Segment(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SmosError {
    /// The wire status code this error maps to (see [`crate::StatusCode`]).
    pub fn status(&self) -> crate::status::StatusCode {
        match self {
            SmosError::PermissionDenied => crate::status::StatusCode::PermissionDenied,
            _ => crate::status::StatusCode::Fail,
        }
    }
}

/// A detected invariant violation: a bug signal, not a recoverable condition.
///
/// Never returned through a `Result` that ordinary callers are expected to
/// match on — see [`InvariantViolation::raise`].
#[derive(Debug, Error)]
pub enum InvariantViolation {
    #[error("tracks of object '{object}' disagree on status")]
    TrackUnaligned { object: String },

    #[error("descriptor belongs to track '{expected}', not '{actual}'")]
    TrackMismatch { expected: String, actual: String },

    #[error("entry descriptor has not been allocated to a block")]
    UnallocatedEntry,

    #[error("read reference released more times than it was acquired for key {key}")]
    ReadRefDoubleRelease { key: u64 },

    #[error("block {block_idx} has already been returned to the free pool")]
    BlockDoubleRelease { block_idx: usize },

    #[error("block index {block_idx} out of range (capacity {capacity})")]
    MappingError { block_idx: usize, capacity: usize },

    #[error("coordinator connection dropped unexpectedly")]
    ServerDropOut,
}

impl InvariantViolation {
    /// Panics with this violation. Invariant violations indicate a prior bug
    /// in the store, not a condition a caller can recover from; propagating
    /// them through an ordinary `Result` would invite exactly the
    /// silent-swallow behavior they are meant to prevent.
    #[track_caller]
    pub fn raise(self) -> ! {
        panic!("invariant violation: {self}");
    }
}
