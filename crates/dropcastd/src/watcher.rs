//! Directory watcher producing "New file added" events.
//!
//! Wraps a `notify` watcher on a single directory (non-recursive) and fans
//! each qualifying notification out to the registered listeners.
//!
//! # Detection
//!
//! Platform notification APIs report creation, deletion and renames of an
//! entry with overlapping event kinds. Every create/rename/remove
//! notification is therefore resolved by checking whether the entry exists
//! right now: present means it was added, absent means it went away and the
//! notification is dropped. A file created and deleted again before the
//! check runs produces no event at all.

use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use dropcast_core::Event;
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Receives events from a [`DirectoryWatcher`].
///
/// Called on the watcher's notification thread. Returning an error (or
/// panicking) is logged and does not affect other listeners.
pub trait FileAddedListener: Send + Sync {
    fn notify(&self, event: &Event) -> anyhow::Result<()>;
}

impl<F> FileAddedListener for F
where
    F: Fn(&Event) -> anyhow::Result<()> + Send + Sync,
{
    fn notify(&self, event: &Event) -> anyhow::Result<()> {
        self(event)
    }
}

/// Shared listener handle; identity is the allocation.
pub type Listener = Arc<dyn FileAddedListener>;

type ListenerList = Arc<RwLock<Vec<Listener>>>;

/// Errors that are fatal to a watcher.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to create watch folder {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start file watcher for {path}: {source}")]
    Start {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Watches one directory for new entries.
pub struct DirectoryWatcher {
    path: PathBuf,
    watcher: Option<RecommendedWatcher>,
    listeners: ListenerList,
}

impl DirectoryWatcher {
    /// Creates a watcher for `path`, creating the directory if needed.
    ///
    /// Does not start watching; call [`start`](Self::start).
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, WatchError> {
        let path = path.into();

        if !path.is_dir() {
            fs::create_dir_all(&path).map_err(|source| WatchError::CreateDir {
                path: path.clone(),
                source,
            })?;
            info!(path = %path.display(), "Created watch folder");
        }

        Ok(Self {
            path,
            watcher: None,
            listeners: Arc::new(RwLock::new(Vec::new())),
        })
    }

    /// Returns the watched directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true while a watch is active.
    pub fn is_running(&self) -> bool {
        self.watcher.is_some()
    }

    /// Starts watching. An active watch is stopped first.
    pub fn start(&mut self) -> Result<(), WatchError> {
        if self.watcher.is_some() {
            self.stop();
        }

        let dir = self.path.clone();
        let listeners = Arc::clone(&self.listeners);

        let mut watcher = notify::recommended_watcher(
            move |result: notify::Result<notify::Event>| match result {
                Ok(event) => {
                    for file_event in derive_events(&dir, &event) {
                        dispatch(&listeners, &file_event);
                    }
                }
                Err(e) => {
                    warn!(path = %dir.display(), error = %e, "File watcher error");
                }
            },
        )
        .map_err(|source| self.start_error(source))?;

        watcher
            .watch(&self.path, RecursiveMode::NonRecursive)
            .map_err(|source| self.start_error(source))?;

        self.watcher = Some(watcher);
        info!(path = %self.path.display(), "Watching for file changes");

        Ok(())
    }

    /// Stops watching. No-op if not started.
    pub fn stop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            drop(watcher);
            info!(path = %self.path.display(), "File watcher stopped");
        }
    }

    /// Registers a listener. Listeners run in registration order.
    pub fn on_file_added(&self, listener: Listener) {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        listeners.push(listener);
    }

    /// Removes a previously registered listener. Unknown listeners are ignored.
    pub fn remove_callback(&self, listener: &Listener) {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        listeners.retain(|registered| !same_listener(registered, listener));
    }

    /// Returns the number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    fn start_error(&self, source: notify::Error) -> WatchError {
        error!(path = %self.path.display(), error = %source, "Failed to start file watcher");
        WatchError::Start {
            path: self.path.clone(),
            source,
        }
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Compares allocations only; vtable pointers for the same type may differ
/// between codegen units.
fn same_listener(a: &Listener, b: &Listener) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Create, rename and remove notifications; content changes are not.
///
/// Backends that pair the two halves of a rename also send a combined
/// `Both` notification after `From` and `To`; the new name was already
/// reported by `To`, so the pair is skipped.
fn is_rename_class(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Name(mode)) => *mode != RenameMode::Both,
        _ => false,
    }
}

/// Turns one raw notification into zero or more file-added events.
fn derive_events(dir: &Path, event: &notify::Event) -> Vec<Event> {
    if !is_rename_class(&event.kind) {
        return Vec::new();
    }

    event
        .paths
        .iter()
        .filter(|path| path.as_path() != dir)
        .filter(|path| path.exists())
        .filter_map(|path| path.file_name())
        .map(|name| {
            let filename = name.to_string_lossy();
            debug!(filename = %filename, "New file detected");
            Event::file_added(filename)
        })
        .collect()
}

/// Delivers an event to every listener, isolating failures.
fn dispatch(listeners: &ListenerList, event: &Event) {
    // Snapshot so listeners may (un)register without deadlocking
    let snapshot: Vec<Listener> = listeners
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .clone();

    for (index, listener) in snapshot.iter().enumerate() {
        match panic::catch_unwind(AssertUnwindSafe(|| listener.notify(event))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(listener = index, error = %e, "Error in file watcher callback");
            }
            Err(_) => {
                error!(listener = index, "File watcher callback panicked");
            }
        }
    }
}
