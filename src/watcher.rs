//! Waiting for new sensor samples.
//!
//! The control loop only needs "block until the source was written again";
//! how that signal is produced is a backing detail behind [`SampleWatcher`].
//! [`InotifyWatcher`] is the production mechanism, [`PollWatcher`] covers
//! sources without change notification. Both coalesce writes that land
//! while a wake is being handled, so one `changed` return means "at least
//! one new record since last time".

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use nix::sys::inotify::{AddWatchFlags, InitFlags, Inotify};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The watch could not be established.
    #[error("failed to establish sensor watch")]
    Init(#[source] io::Error),
    /// The watch mechanism died; there is no way to re-arm it.
    #[error("sensor watch terminated")]
    Closed,
}

/// Edge-triggered wait for the next sensor sample.
#[async_trait]
pub trait SampleWatcher: Send {
    /// Blocks until at least one new-sample signal has occurred since the
    /// previous return. Re-arming is the implementation's concern.
    async fn changed(&mut self) -> Result<(), WatchError>;
}

/// Inotify-backed watcher for the sensor record file.
///
/// A dedicated thread performs the blocking event reads and forwards each
/// batch through a capacity-one channel; events that fire while the
/// control loop is busy collapse into a single pending wake.
pub struct InotifyWatcher {
    signals: mpsc::Receiver<()>,
}

impl InotifyWatcher {
    /// Starts watching `path` for writes. The file must already exist.
    pub fn new(path: &Path) -> Result<Self, WatchError> {
        let inotify = Inotify::init(InitFlags::empty()).map_err(errno_to_init)?;
        inotify
            .add_watch(
                path,
                AddWatchFlags::IN_MODIFY | AddWatchFlags::IN_CLOSE_WRITE,
            )
            .map_err(errno_to_init)?;

        let (tx, rx) = mpsc::channel(1);
        std::thread::Builder::new()
            .name("sensor-watch".into())
            .spawn(move || watch_thread(&inotify, &tx))
            .map_err(WatchError::Init)?;

        Ok(Self { signals: rx })
    }
}

fn watch_thread(inotify: &Inotify, signals: &mpsc::Sender<()>) {
    loop {
        match inotify.read_events() {
            // A full channel already carries a pending wake; dropping the
            // extra signal is what makes the watch edge-triggered.
            Ok(_events) => match signals.try_send(()) {
                Ok(()) | Err(TrySendError::Full(())) => {}
                Err(TrySendError::Closed(())) => break,
            },
            Err(errno) => {
                warn!(%errno, "inotify read failed, stopping sensor watch");
                break;
            }
        }
    }
}

fn errno_to_init(errno: nix::errno::Errno) -> WatchError {
    WatchError::Init(io::Error::from_raw_os_error(errno as i32))
}

#[async_trait]
impl SampleWatcher for InotifyWatcher {
    async fn changed(&mut self) -> Result<(), WatchError> {
        self.signals.recv().await.ok_or(WatchError::Closed)
    }
}

/// Polling fallback for sources without change notification.
///
/// Compares mtime and length against the last observation at a fixed
/// interval. The baseline is taken at construction, so a record already
/// present at startup does not count as a change; a missing file counts
/// as "no change yet".
pub struct PollWatcher {
    path: PathBuf,
    interval: Duration,
    last_seen: Option<Fingerprint>,
}

type Fingerprint = (Option<SystemTime>, u64);

impl PollWatcher {
    pub fn new(path: impl Into<PathBuf>, interval: Duration) -> Self {
        let path = path.into();
        let last_seen = std::fs::metadata(&path).ok().map(fingerprint);
        Self {
            path,
            interval,
            last_seen,
        }
    }
}

fn fingerprint(meta: std::fs::Metadata) -> Fingerprint {
    (meta.modified().ok(), meta.len())
}

#[async_trait]
impl SampleWatcher for PollWatcher {
    async fn changed(&mut self) -> Result<(), WatchError> {
        loop {
            tokio::time::sleep(self.interval).await;
            let Ok(meta) = tokio::fs::metadata(&self.path).await else {
                continue;
            };
            let current = fingerprint(meta);
            if self.last_seen.as_ref() != Some(&current) {
                self.last_seen = Some(current);
                return Ok(());
            }
        }
    }
}
