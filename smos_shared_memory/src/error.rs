//! Error type for segment creation and attachment.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShmError {
    #[error("segment '{name}' already exists")]
    AlreadyExists { name: String },

    #[error("segment '{name}' not found")]
    NotFound { name: String },

    #[error("invalid segment size: {size}")]
    InvalidSize { size: usize },

    #[error("offset {offset} + length {len} exceeds segment size {size}")]
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Nix(#[from] nix::Error),
}

pub type ShmResult<T> = Result<T, ShmError>;
