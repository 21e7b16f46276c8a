//! Client-side handle library: resolves an entry's placement, maps the
//! backing segments locally, and exposes a typed or raw view of its bytes.

mod client;
mod error;
mod handle;
mod transport;

pub use client::Client;
pub use error::ClientError;
pub use handle::ObjectHandle;
