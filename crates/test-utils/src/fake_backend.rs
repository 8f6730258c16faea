use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use tokio::sync::mpsc;
use fsevent::types::{ChangeEvent, WatchError};
use fsevent::watch::{WatchBackend, WatchStreams, NOTIFICATION_BUFFER};

/// What the fake backend has been asked to do.
#[derive(Debug, Default)]
struct ProbeState {
    watched: Vec<PathBuf>,
    closes: usize,
    receivers_closed_at_close: Option<bool>,
}

/// Shared view into a `FakeBackend`, kept by the test after the backend
/// has been moved into a session.
#[derive(Debug, Clone, Default)]
pub struct BackendProbe {
    state: Arc<Mutex<ProbeState>>,
}

impl BackendProbe {
    pub fn watched(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().watched.clone()
    }

    pub fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }

    /// Whether both receivers were already closed when the backend was
    /// closed. `None` if a stream had been closed from the feed side or the
    /// backend was never closed.
    pub fn receivers_closed_at_close(&self) -> Option<bool> {
        self.state.lock().unwrap().receivers_closed_at_close
    }
}

/// A backend that:
/// - records registrations and closes in a `BackendProbe`
/// - delivers whatever the test pushes through `FakeFeed`
/// - optionally refuses registration with a fixed message.
pub struct FakeBackend {
    probe: BackendProbe,
    refuse_with: Option<String>,
    // Weak so the feed alone decides when a stream closes.
    event_tx: mpsc::WeakSender<ChangeEvent>,
    error_tx: mpsc::WeakSender<WatchError>,
}

impl WatchBackend for FakeBackend {
    fn watch(&mut self, path: &Path) -> anyhow::Result<()> {
        if let Some(msg) = &self.refuse_with {
            return Err(anyhow!("{msg}"));
        }
        self.probe.state.lock().unwrap().watched.push(path.to_path_buf());
        Ok(())
    }

    fn close(&mut self) {
        let events = self.event_tx.upgrade().map(|tx| tx.is_closed());
        let errors = self.error_tx.upgrade().map(|tx| tx.is_closed());
        let mut state = self.probe.state.lock().unwrap();
        state.closes += 1;
        state.receivers_closed_at_close = events.zip(errors).map(|(e, r)| e && r);
    }
}

/// Producer side of the fake handle. Dropping a sender closes that stream.
pub struct FakeFeed {
    pub events: Option<mpsc::Sender<ChangeEvent>>,
    pub errors: Option<mpsc::Sender<WatchError>>,
}

impl FakeFeed {
    pub async fn change(&self, event: ChangeEvent) {
        self.events
            .as_ref()
            .expect("change stream already closed")
            .send(event)
            .await
            .expect("session dropped the change stream");
    }

    pub async fn error(&self, err: WatchError) {
        self.errors
            .as_ref()
            .expect("error stream already closed")
            .send(err)
            .await
            .expect("session dropped the error stream");
    }

    pub fn close_changes(&mut self) {
        self.events = None;
    }

    pub fn close_errors(&mut self) {
        self.errors = None;
    }
}

/// Everything a test needs to drive one session through the fake backend.
pub struct FakeWatch {
    pub backend: FakeBackend,
    pub streams: WatchStreams,
    pub feed: FakeFeed,
    pub probe: BackendProbe,
}

impl FakeWatch {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// A backend whose registration always fails with `msg`.
    pub fn refusing(msg: &str) -> Self {
        Self::build(Some(msg.to_string()))
    }

    fn build(refuse_with: Option<String>) -> Self {
        let (event_tx, events) = mpsc::channel(NOTIFICATION_BUFFER);
        let (error_tx, errors) = mpsc::channel(NOTIFICATION_BUFFER);
        let probe = BackendProbe::default();
        Self {
            backend: FakeBackend {
                probe: probe.clone(),
                refuse_with,
                event_tx: event_tx.downgrade(),
                error_tx: error_tx.downgrade(),
            },
            streams: WatchStreams { events, errors },
            feed: FakeFeed {
                events: Some(event_tx),
                errors: Some(error_tx),
            },
            probe,
        }
    }
}

impl Default for FakeWatch {
    fn default() -> Self {
        Self::new()
    }
}
