//! Recursive, debounced directory watching.
//!
//! Grounded on `examples/original_source/lib/core/LinuxFileWatcher.cpp`
//! (inotify-backed `FileWatcher`/`read_watch_event`), reworked onto
//! `notify`/`notify-debouncer-full` for portability. The debouncer's own
//! coalescing plays the role of the original's `event_report_timeout_ns`
//! "fuzzy" directory-change event.

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_full::{DebounceEventResult, Debouncer, FileIdMap};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to start file watcher: {0}")]
    Init(#[source] notify::Error),
}

/// The kind of change a [`FileWatchEvent`] reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileWatchEventType {
    Created,
    RenamedTo,
    Modified,
    Removed,
    RenamedFrom,
    Other,
    /// A debounced directory-level change that could not be attributed to
    /// one specific file (e.g. many files changed within one debounce
    /// window).
    Fuzzy,
    /// The OS notification queue overflowed; some changes may have been
    /// missed. Callers should treat this as "rescan everything".
    QueueOverflow,
}

/// One reported change. `parent` is the directory the change happened in,
/// relative to the watcher's root; `filename` is empty for [`Fuzzy`] and
/// [`QueueOverflow`] events.
///
/// [`Fuzzy`]: FileWatchEventType::Fuzzy
/// [`QueueOverflow`]: FileWatchEventType::QueueOverflow
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileWatchEvent {
    pub event_type: FileWatchEventType,
    pub parent: PathBuf,
    pub filename: PathBuf,
}

fn classify(kind: EventKind) -> FileWatchEventType {
    use notify::event::{ModifyKind, RenameMode};
    match kind {
        EventKind::Create(_) => FileWatchEventType::Created,
        EventKind::Remove(_) => FileWatchEventType::Removed,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => FileWatchEventType::RenamedTo,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => FileWatchEventType::RenamedFrom,
        EventKind::Modify(_) => FileWatchEventType::Modified,
        _ => FileWatchEventType::Other,
    }
}

/// Watches a directory tree rooted at `root` and delivers debounced change
/// events through [`FileWatcher::read_event`].
pub struct FileWatcher {
    root: PathBuf,
    debouncer: Debouncer<RecommendedWatcher, FileIdMap>,
    events_rx: mpsc::Receiver<FileWatchEvent>,
}

impl FileWatcher {
    /// Starts a watcher rooted at `root`. `event_report_timeout` is the
    /// debounce window: a burst of raw filesystem events within this
    /// window is coalesced into as few [`FileWatchEvent`]s as possible.
    pub fn start(root: impl Into<PathBuf>, event_report_timeout: Duration) -> Result<FileWatcher, WatchError> {
        let root = root.into();
        let (tx, events_rx) = mpsc::channel();
        let watch_root = root.clone();
        let handler = move |result: DebounceEventResult| {
            let events = match result {
                Ok(events) => events,
                Err(_errors) => {
                    let _ = tx.send(FileWatchEvent {
                        event_type: FileWatchEventType::QueueOverflow,
                        parent: watch_root.clone(),
                        filename: PathBuf::new(),
                    });
                    return;
                }
            };
            for debounced in events {
                let paths = &debounced.event.paths;
                if paths.len() > 1 {
                    let _ = tx.send(FileWatchEvent {
                        event_type: FileWatchEventType::Fuzzy,
                        parent: watch_root.clone(),
                        filename: PathBuf::new(),
                    });
                    continue;
                }
                let Some(path) = paths.first() else {
                    continue;
                };
                let relative = path.strip_prefix(&watch_root).unwrap_or(path);
                let parent = relative.parent().unwrap_or(Path::new("")).to_path_buf();
                let filename = relative
                    .file_name()
                    .map(PathBuf::from)
                    .unwrap_or_default();
                let _ = tx.send(FileWatchEvent {
                    event_type: classify(debounced.event.kind),
                    parent,
                    filename,
                });
            }
        };

        let debouncer = notify_debouncer_full::new_debouncer(event_report_timeout, None, handler)
            .map_err(WatchError::Init)?;

        Ok(FileWatcher {
            root,
            debouncer,
            events_rx,
        })
    }

    /// Adds `relative_path` (relative to the watcher's root) to the
    /// watch set, creating it first if it does not exist. Failures are
    /// logged and otherwise ignored, matching a best-effort watch request.
    pub fn watch_directory(&mut self, relative_path: impl AsRef<Path>) {
        let relative_path = relative_path.as_ref();
        assert!(relative_path.is_relative(), "ren-watch: watch path must be relative to the watcher root");
        let path = self.root.join(relative_path);
        if let Err(err) = std::fs::create_dir_all(&path) {
            log::warn!("ren-watch: failed to create directory {}: {err}", path.display());
            return;
        }
        if let Err(err) = self.debouncer.watcher().watch(&path, RecursiveMode::Recursive) {
            log::warn!("ren-watch: failed to watch {}: {err}", path.display());
        }
    }

    /// Returns the next pending event, if any, without blocking.
    pub fn read_event(&self) -> Option<FileWatchEvent> {
        self.events_rx.try_recv().ok()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn drain(watcher: &FileWatcher, deadline: Duration) -> Vec<FileWatchEvent> {
        let start = std::time::Instant::now();
        let mut out = Vec::new();
        while start.elapsed() < deadline {
            if let Some(event) = watcher.read_event() {
                out.push(event);
            } else {
                std::thread::sleep(Duration::from_millis(20));
            }
        }
        out
    }

    #[test]
    fn detects_file_creation() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = FileWatcher::start(dir.path(), Duration::from_millis(50)).unwrap();
        watcher.watch_directory("assets");
        std::fs::write(dir.path().join("assets/new_file.txt"), b"hello").unwrap();
        let events = drain(&watcher, Duration::from_secs(2));
        assert!(events.iter().any(|e| e.event_type == FileWatchEventType::Created
            && e.filename == Path::new("new_file.txt")));
    }

    #[test]
    fn detects_modification() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets/existing.txt"), b"v1").unwrap();
        let mut watcher = FileWatcher::start(dir.path(), Duration::from_millis(50)).unwrap();
        watcher.watch_directory("assets");
        std::fs::write(dir.path().join("assets/existing.txt"), b"v2").unwrap();
        let events = drain(&watcher, Duration::from_secs(2));
        assert!(events.iter().any(|e| {
            matches!(e.event_type, FileWatchEventType::Modified | FileWatchEventType::Created)
                && e.filename == Path::new("existing.txt")
        }));
    }
}
