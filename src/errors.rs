// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Only startup failures are errors. Asynchronous failures reported by the
//! watch backend while a session runs are [`crate::types::WatchError`] values
//! and are logged instead of propagated.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FseventError {
    #[error("missing watch path")]
    MissingWatchPath,

    #[error("cannot resolve watch path {path:?}: {source}")]
    PathResolution {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot watch {path:?}: {source}")]
    Registration {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("cannot create watch backend: {source}")]
    Backend {
        #[source]
        source: notify::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, FseventError>;

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn backend_error_keeps_notify_source() {
        let err = FseventError::Backend {
            source: notify::Error::generic("inotify limit reached"),
        };
        assert!(err.to_string().contains("inotify limit reached"));
        let source = err.source().expect("source should be kept");
        assert!(source.downcast_ref::<notify::Error>().is_some());
    }
}
