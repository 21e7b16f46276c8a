//! Coordinator process: binds a TCP listener over a configurable port
//! range, authenticates connecting clients with a shared key, and
//! dispatches length-prefixed RPC frames against a single in-process
//! `Store`.

pub mod codec;
pub mod connection;
pub mod rpc;
pub mod server;

pub use server::{CoordinatorHandle, run_coordinator};
