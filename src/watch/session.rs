// src/watch/session.rs

//! Watch session: one handle, one path, one consumer loop.
//!
//! The decision of what each occurrence means lives in [`SessionCore`], a
//! synchronous state machine with no channels or Tokio types. The async
//! shell ([`WatchSession`]) owns the handle and the receivers, waits on
//! whichever of the three sources is ready, and feeds the result into the
//! core until it reports a terminal step.
//!
//! ```text
//! Idle -> Registering -> Watching -> Draining -> Closed
//!              \------------------------------> Closed (registration error)
//! ```

use std::fmt;

use anyhow::anyhow;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::errors::{FseventError, Result};
use crate::logging::Logger;
use crate::types::{ChangeEvent, WatchError};

use super::backend::{WatchBackend, WatchStreams};
use super::target::WatchTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Registering,
    Watching,
    Draining,
    Closed,
}

/// One thing the consumer loop woke up for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Occurrence {
    Change(ChangeEvent),
    ChangeStreamClosed,
    /// Logged; does not end the session.
    Error(WatchError),
    ErrorStreamClosed,
    Cancelled,
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    ChangesClosed,
    ErrorsClosed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Terminate(Termination),
}

/// Synchronous core of a session.
///
/// Logs through whatever dispatcher is current; callers run it inside
/// [`Logger::scope`] or [`Logger::in_scope`].
#[derive(Debug)]
pub struct SessionCore {
    state: SessionState,
    termination: Option<Termination>,
}

impl Default for SessionCore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionCore {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            termination: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    fn begin_registration(&mut self) {
        debug_assert_eq!(self.state, SessionState::Idle);
        self.state = SessionState::Registering;
    }

    fn registered(&mut self) {
        debug_assert_eq!(self.state, SessionState::Registering);
        self.state = SessionState::Watching;
    }

    fn close(&mut self) {
        self.state = SessionState::Closed;
    }

    /// Handle a single occurrence.
    ///
    /// Once a terminal step has been returned, every later occurrence is
    /// ignored and the same termination is returned again.
    pub fn step(&mut self, occurrence: Occurrence) -> Step {
        if let Some(done) = self.termination {
            return Step::Terminate(done);
        }
        if self.state != SessionState::Watching {
            debug!(state = ?self.state, ?occurrence, "occurrence outside of watching state");
            return Step::Continue;
        }

        let termination = match occurrence {
            Occurrence::Change(event) => {
                info!(event.name = %event.name, event.op = %event.op, "change observed");
                return Step::Continue;
            }
            Occurrence::Error(err) => {
                info!(event = %err, "watch error");
                return Step::Continue;
            }
            Occurrence::ChangeStreamClosed => {
                debug!("change stream closed");
                Termination::ChangesClosed
            }
            Occurrence::ErrorStreamClosed => {
                debug!("error stream closed");
                Termination::ErrorsClosed
            }
            Occurrence::Cancelled => {
                info!("cancellation requested");
                Termination::Cancelled
            }
        };

        self.state = SessionState::Draining;
        self.termination = Some(termination);
        Step::Terminate(termination)
    }
}

/// Owns a backend and releases it exactly once: explicitly through
/// [`HandleGuard::release`] or on drop, whichever comes first.
pub struct HandleGuard<B: WatchBackend> {
    backend: Option<B>,
}

impl<B: WatchBackend> fmt::Debug for HandleGuard<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleGuard")
            .field("released", &self.backend.is_none())
            .finish()
    }
}

impl<B: WatchBackend> HandleGuard<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    pub fn backend_mut(&mut self) -> Option<&mut B> {
        self.backend.as_mut()
    }

    pub fn release(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            backend.close();
        }
    }
}

impl<B: WatchBackend> Drop for HandleGuard<B> {
    fn drop(&mut self) {
        self.release();
    }
}

/// A registered watch ready to run.
pub struct WatchSession<B: WatchBackend> {
    // Declared before `guard`: receivers drop first, so a blocked backend
    // send fails before the handle is released.
    streams: WatchStreams,
    guard: HandleGuard<B>,
    target: WatchTarget,
    logger: Logger,
    core: SessionCore,
}

impl<B: WatchBackend> fmt::Debug for WatchSession<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchSession")
            .field("target", &self.target)
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<B: WatchBackend> WatchSession<B> {
    /// Register `target` on `backend`.
    ///
    /// On failure the backend is released before the error is returned and
    /// no loop is started.
    pub fn start(
        backend: B,
        streams: WatchStreams,
        target: WatchTarget,
        logger: Logger,
    ) -> Result<Self> {
        let mut guard = HandleGuard::new(backend);
        let mut core = SessionCore::new();
        core.begin_registration();

        let registered = match guard.backend_mut() {
            Some(backend) => backend.watch(target.as_path()),
            None => Err(anyhow!("watch handle already released")),
        };
        if let Err(source) = registered {
            drop(streams);
            guard.release();
            core.close();
            return Err(FseventError::Registration {
                path: target.as_path().to_path_buf(),
                source,
            });
        }

        core.registered();
        logger.in_scope(|| info!(path = %target, "added watch"));

        Ok(Self {
            streams,
            guard,
            target,
            logger,
            core,
        })
    }

    pub fn target(&self) -> &WatchTarget {
        &self.target
    }

    pub fn state(&self) -> SessionState {
        self.core.state()
    }

    /// Run the consumer loop on a background task and wait for it to finish.
    pub async fn run(self, token: CancellationToken) -> Result<Termination> {
        let logger = self.logger.clone();
        let task = tokio::spawn(logger.scope(self.consume(token)));

        let termination = task
            .await
            .map_err(|e| FseventError::Other(anyhow!("watch loop failed: {e}")))?;

        logger.in_scope(|| info!(?termination, "watch session finished"));
        Ok(termination)
    }

    async fn consume(mut self, token: CancellationToken) -> Termination {
        let termination = loop {
            let occurrence = tokio::select! {
                event = self.streams.events.recv() => match event {
                    Some(event) => Occurrence::Change(event),
                    None => Occurrence::ChangeStreamClosed,
                },
                err = self.streams.errors.recv() => match err {
                    Some(err) => Occurrence::Error(err),
                    None => Occurrence::ErrorStreamClosed,
                },
                _ = token.cancelled() => Occurrence::Cancelled,
            };

            if let Step::Terminate(termination) = self.core.step(occurrence) {
                break termination;
            }
        };

        // The backend may be parked on a full queue; closing the receivers
        // fails its pending send so releasing the handle cannot block on it.
        self.streams.events.close();
        self.streams.errors.close();
        self.guard.release();
        self.core.close();
        termination
    }
}

/// Register `target` on `backend` and run the session to completion.
pub async fn run_watch_with<B: WatchBackend>(
    backend: B,
    streams: WatchStreams,
    token: CancellationToken,
    target: &WatchTarget,
    logger: &Logger,
) -> Result<Termination> {
    let session = WatchSession::start(backend, streams, target.clone(), logger.clone())?;
    session.run(token).await
}
