// src/watch/target.rs

use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::{FseventError, Result};

/// Absolute path a session watches.
///
/// Resolution is lexical: relative paths are joined onto the current
/// directory and the result is not required to exist yet. A missing path is
/// reported when the watch is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    path: PathBuf,
}

impl WatchTarget {
    pub fn resolve(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let absolute =
            std::path::absolute(path).map_err(|source| FseventError::PathResolution {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self { path: absolute })
    }

    pub fn as_path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for WatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
