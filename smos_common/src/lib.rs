//! Shared, wire-visible types for the shared memory object store.
//!
//! This crate has no I/O beyond TOML config loading: it is the vocabulary
//! that `smos_store`, `smos_server` and `smos_client` all speak, so that
//! a request built on the client side and a response produced on the store
//! side serialize to the same shapes without either side depending on the
//! other.

pub mod config;
pub mod consts;
pub mod descriptor;
pub mod error;
pub mod status;
pub mod wire;

pub use config::{ConfigError, ConfigLoader, StoreConfig};
pub use descriptor::{Dtype, ElementKind, EntryDescriptor};
pub use error::{InvariantViolation, SmosError};
pub use status::StatusCode;
