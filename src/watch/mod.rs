// src/watch/mod.rs

//! Single-path filesystem watching.
//!
//! This module is responsible for:
//! - Resolving the watched path into a [`WatchTarget`].
//! - Wrapping the platform watcher (`notify`) behind [`WatchBackend`].
//! - Driving a [`WatchSession`] that multiplexes change notifications, watch
//!   errors and cancellation into a sequence of log records.
//!
//! There is no recursion, filtering, debouncing or retry: one path, one
//! watcher, fail fast on registration.

pub mod backend;
pub mod session;
pub mod target;

use tokio_util::sync::CancellationToken;

use crate::errors::Result;
use crate::logging::Logger;

pub use backend::{
    changes_from_event, NotifyBackend, WatchBackend, WatchStreams, NOTIFICATION_BUFFER,
};
pub use session::{
    run_watch_with, HandleGuard, Occurrence, SessionCore, SessionState, Step, Termination,
    WatchSession,
};
pub use target::WatchTarget;

/// Watch `target` with the platform backend until a stream closes or
/// `token` is cancelled.
///
/// Errors only when the backend cannot be created or the path cannot be
/// registered; every other outcome is logged and returns `Ok(())`.
pub async fn run_watch(
    token: CancellationToken,
    target: &WatchTarget,
    logger: &Logger,
) -> Result<()> {
    let (backend, streams) = NotifyBackend::open(NOTIFICATION_BUFFER)?;
    run_watch_with(backend, streams, token, target, logger).await?;
    Ok(())
}
