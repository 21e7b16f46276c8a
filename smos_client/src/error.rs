//! Client-side error type: transport failures, framing failures, and
//! store-reported errors unified into one enum callers can match on.

use smos_common::wire::WireError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("the store closed the connection")]
    Closed,

    #[error("the store rejected the authentication key")]
    AuthenticationFailed,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("unexpected response shape for this call")]
    UnexpectedResponse,

    #[error(transparent)]
    Store(#[from] WireError),
}
