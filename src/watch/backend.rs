// src/watch/backend.rs

//! Watch backend abstraction.
//!
//! A session talks to a `WatchBackend` plus a pair of receivers instead of a
//! concrete `notify` watcher, so tests can script notifications through a
//! fake backend while production uses [`NotifyBackend`].

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::{FseventError, Result};
use crate::types::{ChangeEvent, Op, WatchError};

/// Capacity of each notification queue. At most one unread notification is
/// queued; beyond that the backend thread blocks.
pub const NOTIFICATION_BUFFER: usize = 1;

/// Receiving side of a watch handle.
///
/// Both streams close once the backend has shut down.
#[derive(Debug)]
pub struct WatchStreams {
    pub events: mpsc::Receiver<ChangeEvent>,
    pub errors: mpsc::Receiver<WatchError>,
}

/// Trait abstracting the OS notification mechanism.
pub trait WatchBackend: Send + 'static {
    /// Register a non-recursive watch on `path`.
    fn watch(&mut self, path: &Path) -> anyhow::Result<()>;

    /// Release every registered path and shut the backend down.
    fn close(&mut self);
}

/// Production backend built on `notify::RecommendedWatcher`.
pub struct NotifyBackend {
    watcher: Option<RecommendedWatcher>,
    watched: Option<PathBuf>,
}

impl std::fmt::Debug for NotifyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyBackend")
            .field("open", &self.watcher.is_some())
            .field("watched", &self.watched)
            .finish()
    }
}

impl NotifyBackend {
    /// Create the platform watcher with queues of `buffer` slots.
    pub fn open(buffer: usize) -> Result<(Self, WatchStreams)> {
        let (event_tx, events) = mpsc::channel::<ChangeEvent>(buffer);
        let (error_tx, errors) = mpsc::channel::<WatchError>(buffer);

        // Called on notify's own thread, never inside the runtime, so the
        // blocking sends are what applies backpressure to the OS watcher.
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for change in changes_from_event(event) {
                        if event_tx.blocking_send(change).is_err() {
                            // Session is gone; nothing left to deliver to.
                            return;
                        }
                    }
                }
                Err(err) => {
                    let _ = error_tx.blocking_send(WatchError::from(err));
                }
            },
            Config::default(),
        )
        .map_err(|source| FseventError::Backend { source })?;

        let backend = Self {
            watcher: Some(watcher),
            watched: None,
        };
        Ok((backend, WatchStreams { events, errors }))
    }
}

impl WatchBackend for NotifyBackend {
    fn watch(&mut self, path: &Path) -> anyhow::Result<()> {
        if let Some(existing) = &self.watched {
            return Err(anyhow!("already watching {:?}", existing));
        }
        let watcher = self
            .watcher
            .as_mut()
            .ok_or_else(|| anyhow!("watcher is closed"))?;
        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .with_context(|| format!("adding watch on {:?}", path))?;
        self.watched = Some(path.to_path_buf());
        Ok(())
    }

    fn close(&mut self) {
        let Some(mut watcher) = self.watcher.take() else {
            return;
        };
        if let Some(path) = self.watched.take() {
            if let Err(err) = watcher.unwatch(&path) {
                debug!(?path, %err, "unwatch failed during close");
            }
        }
        // Dropping the watcher drops the callback and with it both senders.
        drop(watcher);
    }
}

impl Drop for NotifyBackend {
    fn drop(&mut self) {
        self.close();
    }
}

/// Translate one `notify` event into change notifications, one per path.
///
/// Access events are not changes and yield nothing. A rename reported with
/// both ends yields `RENAME` for the old path and `CREATE` for the new one.
pub fn changes_from_event(event: Event) -> Vec<ChangeEvent> {
    let kind = event.kind;
    event
        .paths
        .into_iter()
        .enumerate()
        .filter_map(|(idx, path)| {
            let op = op_for(&kind, idx)?;
            Some(ChangeEvent::new(path.to_string_lossy().into_owned(), op))
        })
        .collect()
}

fn op_for(kind: &EventKind, path_index: usize) -> Option<Op> {
    match kind {
        EventKind::Create(_) => Some(Op::CREATE),
        EventKind::Remove(_) => Some(Op::REMOVE),
        EventKind::Modify(ModifyKind::Metadata(_)) => Some(Op::CHMOD),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(Op::CREATE),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if path_index > 0 => {
            Some(Op::CREATE)
        }
        EventKind::Modify(ModifyKind::Name(_)) => Some(Op::RENAME),
        EventKind::Modify(_) => Some(Op::WRITE),
        // Access, Any, Other
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use notify::event::{
        AccessKind, AccessMode, CreateKind, DataChange, MetadataKind, RemoveKind,
    };

    use super::*;

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |ev, p| ev.add_path(PathBuf::from(p)))
    }

    #[test]
    fn create_write_remove_map_directly() {
        let created = changes_from_event(event(EventKind::Create(CreateKind::File), &["/w/a"]));
        assert_eq!(created, vec![ChangeEvent::new("/w/a", Op::CREATE)]);

        let written = changes_from_event(event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/w/a"],
        ));
        assert_eq!(written, vec![ChangeEvent::new("/w/a", Op::WRITE)]);

        let removed = changes_from_event(event(EventKind::Remove(RemoveKind::File), &["/w/a"]));
        assert_eq!(removed, vec![ChangeEvent::new("/w/a", Op::REMOVE)]);
    }

    #[test]
    fn metadata_changes_are_chmod() {
        let changes = changes_from_event(event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
            &["/w/a"],
        ));
        assert_eq!(changes, vec![ChangeEvent::new("/w/a", Op::CHMOD)]);
    }

    #[test]
    fn rename_with_both_ends_splits_into_rename_and_create() {
        let changes = changes_from_event(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/w/old", "/w/new"],
        ));
        assert_eq!(
            changes,
            vec![
                ChangeEvent::new("/w/old", Op::RENAME),
                ChangeEvent::new("/w/new", Op::CREATE),
            ]
        );
    }

    #[test]
    fn rename_halves() {
        let from = changes_from_event(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/w/old"],
        ));
        assert_eq!(from, vec![ChangeEvent::new("/w/old", Op::RENAME)]);

        let to = changes_from_event(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &["/w/new"],
        ));
        assert_eq!(to, vec![ChangeEvent::new("/w/new", Op::CREATE)]);
    }

    #[test]
    fn access_events_are_not_changes() {
        let changes = changes_from_event(event(
            EventKind::Access(AccessKind::Close(AccessMode::Write)),
            &["/w/a"],
        ));
        assert!(changes.is_empty());
        assert!(changes_from_event(event(EventKind::Other, &["/w/a"])).is_empty());
    }

    #[test]
    fn watching_a_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (mut backend, _streams) = NotifyBackend::open(NOTIFICATION_BUFFER).unwrap();
        assert!(backend.watch(&dir.path().join("missing")).is_err());
        backend.close();
    }

    #[test]
    fn second_registration_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (mut backend, _streams) = NotifyBackend::open(NOTIFICATION_BUFFER).unwrap();
        backend.watch(dir.path()).unwrap();
        let err = backend.watch(dir.path()).unwrap_err();
        assert!(err.to_string().contains("already watching"));
    }

    #[test]
    fn close_shuts_both_streams_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (mut backend, mut streams) = NotifyBackend::open(NOTIFICATION_BUFFER).unwrap();
        backend.watch(dir.path()).unwrap();
        backend.close();
        backend.close();
        assert!(streams.events.blocking_recv().is_none());
        assert!(streams.errors.blocking_recv().is_none());
        assert!(backend.watch(dir.path()).is_err());
    }
}
