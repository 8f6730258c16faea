// src/types.rs

//! Values flowing from the watch backend into a session.

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Operation kind(s) of a change notification.
    ///
    /// A set rather than a single kind: some backends report combined
    /// operations for one notification.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Op: u8 {
        const CREATE = 1 << 0;
        const WRITE = 1 << 1;
        const REMOVE = 1 << 2;
        const RENAME = 1 << 3;
        const CHMOD = 1 << 4;
    }
}

/// Renders as `CREATE|WRITE`; the empty set renders as `[no events]`.
impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("[no events]");
        }
        for (i, (name, _)) in self.iter_names().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            f.write_str(name)?;
        }
        Ok(())
    }
}

/// One filesystem notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Path the event concerns.
    pub name: String,
    pub op: Op,
}

impl ChangeEvent {
    pub fn new(name: impl Into<String>, op: Op) -> Self {
        Self {
            name: name.into(),
            op,
        }
    }
}

/// Failure surfaced asynchronously by the watch backend.
///
/// Carried as an opaque message; no classification by cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchError {
    message: String,
}

impl WatchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for WatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WatchError {}

impl From<notify::Error> for WatchError {
    fn from(err: notify::Error) -> Self {
        Self::new(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_renders_single_kind() {
        assert_eq!(Op::CREATE.to_string(), "CREATE");
        assert_eq!(Op::CHMOD.to_string(), "CHMOD");
    }

    #[test]
    fn op_renders_combined_kinds_in_declaration_order() {
        assert_eq!((Op::WRITE | Op::CREATE).to_string(), "CREATE|WRITE");
        assert_eq!((Op::RENAME | Op::REMOVE).to_string(), "REMOVE|RENAME");
    }

    #[test]
    fn empty_op_has_placeholder() {
        assert_eq!(Op::empty().to_string(), "[no events]");
    }

    #[test]
    fn watch_error_displays_message_verbatim() {
        let err = WatchError::new("watched path removed");
        assert_eq!(err.to_string(), "watched path removed");
        assert_eq!(err.message(), "watched path removed");
    }
}
