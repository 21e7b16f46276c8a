//! Shared memory segment primitives for the shared memory object store.
//!
//! A [`Segment`] is a raw, mmap-backed region of POSIX shared memory,
//! created under `/dev/shm` with a name that carries a randomized suffix so
//! that two objects declared under the same base name can coexist briefly
//! during destructive replacement (`Segment::create_unique`). Segments carry
//! no embedded header or version protocol: the store process that owns a
//! `Track` never reads or writes segment bytes, so there is nothing for a
//! header to coordinate between store and client. All coordination happens
//! one layer up, in `smos_store`'s `Track`/`Object`/`Store` metadata, under
//! the fair reader/writer lock described there.

mod error;
mod platform;
mod segment;

pub use error::{ShmError, ShmResult};
pub use segment::{Segment, SHM_DIR};
