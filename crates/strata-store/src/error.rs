//! Error types for the entity store

use std::path::PathBuf;

/// Repository failure
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem access failed
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Entity could not be encoded or decoded
    #[error("cannot (de)serialize {kind} `{id}`: {source}")]
    Serialization {
        /// Entity kind
        kind: &'static str,
        /// Entity id
        id: String,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// Entity id cannot be used as a storage key
    #[error("invalid {kind} id `{id}`")]
    InvalidId {
        /// Entity kind
        kind: &'static str,
        /// Offending id
        id: String,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
