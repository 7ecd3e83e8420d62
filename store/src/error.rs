use thiserror::Error;

use crate::path::Path;

/// Errors raised by [`PathStore`](crate::PathStore) writes and path parsing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("cannot descend into `{path}`: value is not an object or array")]
    NotAContainer { path: Path },
    #[error("index {index} is out of range at `{path}` (length {len})")]
    IndexOutOfRange { path: Path, index: usize, len: usize },
    #[error("malformed path `{path}`")]
    MalformedPath { path: String },
    #[error("listener failed: {0}")]
    Listener(String),
}
