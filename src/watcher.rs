use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

use crate::error::WatchError;
use crate::logger::{log, LogLevel};

/// Kind of a directory change as seen by the watch loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Created,
    Deleted,
    Modified,
    /// The backend dropped events; carries no file identity
    Overflow,
}

/// A single change reported for the watched directory.
///
/// `subject` is either relative to the watched directory or already
/// absolute, depending on the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: EventKind,
    pub subject: PathBuf,
}

impl RawEvent {
    pub fn new(kind: EventKind, subject: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            subject: subject.into(),
        }
    }

    pub fn overflow() -> Self {
        Self::new(EventKind::Overflow, PathBuf::new())
    }
}

/// Source of directory change batches consumed by the watch engine.
pub trait Subscription {
    /// Starts delivering created, deleted and modified events
    fn register(&mut self) -> Result<(), WatchError>;

    /// Blocks until the next batch is available.
    ///
    /// Returns `None` once the subscription is closed. An empty batch means
    /// the wait ended without anything attributable to a file, e.g. a poll
    /// interval elapsed.
    fn next_batch(&mut self) -> Option<Vec<RawEvent>>;

    /// Re-arms after a batch. `false` means no further events can arrive.
    fn rearm(&mut self) -> bool;
}

enum Signal {
    Fs(notify::Result<Event>),
    Close,
}

/// Cancels a [`DirectorySubscription`] from any thread.
#[derive(Clone)]
pub struct CloseHandle {
    tx: Sender<Signal>,
    closed: Arc<AtomicBool>,
}

impl CloseHandle {
    /// Wakes a blocked `next_batch` and makes every later call return `None`
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let _ = self.tx.send(Signal::Close);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Non-recursive OS watch on a single directory
pub struct DirectorySubscription {
    directory: PathBuf,
    watcher: RecommendedWatcher,
    rx: Receiver<Signal>,
    close: CloseHandle,
    poll_interval: Option<Duration>,
}

impl DirectorySubscription {
    /// Creates the OS watcher for `directory` without registering interest yet
    ///
    /// # Arguments
    /// - `directory`: The absolute directory to watch, non-recursively
    /// - `poll_interval`: When set, `next_batch` returns an empty batch each
    ///   time the interval passes without events
    ///
    /// # Returns
    /// - `Result<Self, WatchError>`: The subscription, or `WatchError::Subscription`
    ///   if the directory is missing or the OS watcher cannot be created
    pub fn open(directory: &Path, poll_interval: Option<Duration>) -> Result<Self, WatchError> {
        if !directory.is_dir() {
            return Err(WatchError::subscription(
                directory,
                notify::Error::path_not_found().add_path(directory.to_path_buf()),
            ));
        }

        let (tx, rx) = channel();
        let events = tx.clone();
        let watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| {
                let _ = events.send(Signal::Fs(result));
            },
            Config::default(),
        )
        .map_err(|e| WatchError::subscription(directory, e))?;

        Ok(Self {
            directory: directory.to_path_buf(),
            watcher,
            rx,
            close: CloseHandle {
                tx,
                closed: Arc::new(AtomicBool::new(false)),
            },
            poll_interval,
        })
    }

    /// Returns a handle that can cancel this subscription from another thread
    ///
    /// # Returns
    /// - `CloseHandle`: A cloneable handle; `close()` makes a blocked
    ///   `next_batch` return `None`
    pub fn close_handle(&self) -> CloseHandle {
        self.close.clone()
    }

    fn wait(&self) -> Option<Option<Signal>> {
        match self.poll_interval {
            Some(interval) => match self.rx.recv_timeout(interval) {
                Ok(signal) => Some(Some(signal)),
                Err(RecvTimeoutError::Timeout) => Some(None),
                Err(RecvTimeoutError::Disconnected) => None,
            },
            None => self.rx.recv().ok().map(Some),
        }
    }
}

impl Subscription for DirectorySubscription {
    fn register(&mut self) -> Result<(), WatchError> {
        self.watcher
            .watch(&self.directory, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::subscription(&self.directory, e))
    }

    fn next_batch(&mut self) -> Option<Vec<RawEvent>> {
        if self.close.is_closed() {
            return None;
        }

        let mut batch = Vec::new();
        let mut pending = self.wait()?;
        while let Some(signal) = pending {
            match signal {
                Signal::Close => return None,
                Signal::Fs(Ok(event)) => batch.extend(translate(&event)),
                Signal::Fs(Err(e)) => log(LogLevel::Error, &format!("Watch error: {}", e)),
            }
            pending = self.rx.try_recv().ok();
        }
        Some(batch)
    }

    fn rearm(&mut self) -> bool {
        !self.close.is_closed() && self.directory.is_dir()
    }
}

/// Maps a notify event onto one [`RawEvent`] per reported path.
///
/// Access and backend-specific events are dropped; a rescan request becomes
/// a single `Overflow`.
pub fn translate(event: &Event) -> Vec<RawEvent> {
    if event.need_rescan() {
        return vec![RawEvent::overflow()];
    }

    let kind = match event.kind {
        notify::EventKind::Create(_) => EventKind::Created,
        notify::EventKind::Remove(_) => EventKind::Deleted,
        notify::EventKind::Modify(_) | notify::EventKind::Any => EventKind::Modified,
        notify::EventKind::Access(_) | notify::EventKind::Other => return Vec::new(),
    };

    event
        .paths
        .iter()
        .map(|path| RawEvent::new(kind, path.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, Flag, ModifyKind, RemoveKind, RenameMode};
    use std::{fs, thread, time::Instant};

    fn canonical_tempdir() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = fs::canonicalize(dir.path()).unwrap();
        (dir, path)
    }

    #[test]
    fn translates_event_kinds() {
        let create = Event::new(notify::EventKind::Create(CreateKind::File)).add_path("/w/a".into());
        assert_eq!(translate(&create), vec![RawEvent::new(EventKind::Created, "/w/a")]);

        let remove = Event::new(notify::EventKind::Remove(RemoveKind::File)).add_path("/w/a".into());
        assert_eq!(translate(&remove), vec![RawEvent::new(EventKind::Deleted, "/w/a")]);

        let access = Event::new(notify::EventKind::Access(AccessKind::Any)).add_path("/w/a".into());
        assert!(translate(&access).is_empty());
    }

    #[test]
    fn rename_yields_one_event_per_path() {
        let rename = Event::new(notify::EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path("/w/part".into())
            .add_path("/w/report.csv".into());

        let events = translate(&rename);

        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.kind == EventKind::Modified));
        assert_eq!(events[1].subject, PathBuf::from("/w/report.csv"));
    }

    #[test]
    fn rescan_becomes_overflow() {
        let rescan = Event::new(notify::EventKind::Other).set_flag(Flag::Rescan);

        assert_eq!(translate(&rescan), vec![RawEvent::overflow()]);
    }

    #[test]
    fn open_rejects_missing_directory() {
        let (_dir, path) = canonical_tempdir();

        let result = DirectorySubscription::open(&path.join("gone"), None);

        assert!(matches!(result, Err(WatchError::Subscription { .. })));
    }

    #[test]
    fn closed_subscription_yields_none() {
        let (_dir, path) = canonical_tempdir();
        let mut subscription = DirectorySubscription::open(&path, None).unwrap();
        subscription.register().unwrap();

        subscription.close_handle().close();

        assert!(subscription.next_batch().is_none());
        assert!(!subscription.rearm());
    }

    #[test]
    fn close_wakes_a_blocked_wait() {
        let (_dir, path) = canonical_tempdir();
        let mut subscription = DirectorySubscription::open(&path, None).unwrap();
        subscription.register().unwrap();
        let handle = subscription.close_handle();

        let closer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            handle.close();
        });

        let started = Instant::now();
        assert!(subscription.next_batch().is_none());
        assert!(started.elapsed() < Duration::from_secs(5));
        closer.join().unwrap();
    }

    #[test]
    fn poll_interval_yields_empty_batches() {
        let (_dir, path) = canonical_tempdir();
        let mut subscription =
            DirectorySubscription::open(&path, Some(Duration::from_millis(50))).unwrap();
        subscription.register().unwrap();

        assert_eq!(subscription.next_batch(), Some(Vec::new()));
    }

    #[test]
    fn reports_created_file() {
        let (_dir, path) = canonical_tempdir();
        let mut subscription =
            DirectorySubscription::open(&path, Some(Duration::from_millis(100))).unwrap();
        subscription.register().unwrap();

        let target = path.join("report.csv");
        fs::write(&target, "a,b,c").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut seen = false;
        while !seen && Instant::now() < deadline {
            let batch = subscription.next_batch().unwrap();
            seen = batch
                .iter()
                .any(|e| e.kind != EventKind::Overflow && e.subject == target);
        }
        assert!(seen, "no event reported for {}", target.display());
    }

    #[test]
    fn rearm_fails_once_directory_is_gone() {
        let (dir, path) = canonical_tempdir();
        let watched = path.join("inbox");
        fs::create_dir(&watched).unwrap();
        let mut subscription = DirectorySubscription::open(&watched, None).unwrap();
        subscription.register().unwrap();
        assert!(subscription.rearm());

        fs::remove_dir(&watched).unwrap();

        assert!(!subscription.rearm());
        drop(dir);
    }
}
