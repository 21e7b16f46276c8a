//! Entry descriptors: the tagged-sum placement and type metadata for one
//! entry in one track.

use serde::{Deserialize, Serialize};

/// Primitive element types a numeric entry's bytes may be reinterpreted as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dtype {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
}

impl Dtype {
    /// Size in bytes of one element of this dtype.
    pub const fn size_of(self) -> usize {
        match self {
            Dtype::U8 | Dtype::I8 => 1,
            Dtype::U16 | Dtype::I16 => 2,
            Dtype::U32 | Dtype::I32 | Dtype::F32 => 4,
            Dtype::U64 | Dtype::I64 | Dtype::F64 => 8,
        }
    }
}

/// The two shapes an entry's payload can take. Numeric entries carry enough
/// type information to reconstruct a typed-array view without copying;
/// opaque entries are handed to the caller's own framing as raw bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementKind {
    Numeric { dtype: Dtype, shape: Vec<u64> },
    Opaque,
}

impl ElementKind {
    /// Number of payload bytes a numeric entry occupies; `None` for opaque
    /// entries, whose length is implicit in the track's block size.
    pub fn numeric_byte_len(&self) -> Option<usize> {
        match self {
            ElementKind::Numeric { dtype, shape } => {
                let elems: u64 = shape.iter().product();
                Some(elems as usize * dtype.size_of())
            }
            ElementKind::Opaque => None,
        }
    }
}

/// Placement and type metadata for one entry in one track.
///
/// The descriptor is the single source of truth for where an entry's bytes
/// live and whether it is safe to reclaim its block. The bytes themselves
/// are opaque to this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryDescriptor {
    pub kind: ElementKind,
    /// `None` until `Track::allocate_block` assigns a block.
    pub mapped_block_idx: Option<usize>,
    /// `None` until allocated; set to the owning track's name.
    pub track_name: Option<String>,
    /// Count of outstanding read handles referencing this entry.
    pub pending_readers: u32,
}

impl EntryDescriptor {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            mapped_block_idx: None,
            track_name: None,
            pending_readers: 0,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, ElementKind::Numeric { .. })
    }

    pub fn is_allocated(&self) -> bool {
        self.mapped_block_idx.is_some()
    }
}
