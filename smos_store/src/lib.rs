//! The core data model: tracks, objects, the store catalog, and the fair
//! reader/writer lock they are built on.

mod lock;
mod object;
mod store;
mod track;

pub use lock::{FairRwLock, ReadGuard, WriteGuard};
pub use object::Object;
pub use store::Store;
pub use track::Track;
