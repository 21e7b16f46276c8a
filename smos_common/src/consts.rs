//! Shared constants. Single source of truth for defaults all other crates
//! import from.

/// Default listening port range `[5000, 5050)`.
pub const DEFAULT_PORT_MIN: u16 = 5000;
pub const DEFAULT_PORT_MAX: u16 = 5050;

/// Default authentication key exchanged on connect.
pub const DEFAULT_AUTHKEY: &str = "smos-default-key";

/// Seconds between connection retries while dialing a coordinator that
/// refuses connections (not yet up).
pub const CONNECT_RETRY_INTERVAL_SECS: u64 = 1;

/// Bounded retry count for transient connection failures after the
/// connection is established (framing desync, peer reset mid-call).
pub const TRANSIENT_RETRY_COUNT: u32 = 10;

/// Fixed backoff between transient-failure retries, in milliseconds.
pub const TRANSIENT_RETRY_BACKOFF_MS: u64 = 50;
