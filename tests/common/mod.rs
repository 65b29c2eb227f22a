#![allow(dead_code)]

pub mod config_test_utils;

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use marksync::command::{CommandLine, PathProbe, ToolLocator};
use marksync::errors::{AnnotationError, SpawnError};
use marksync::host::{AnnotationId, CursorContext, ListingView, Notifier, Severity, ViewId};
use marksync::session::{SurfaceSize, TransferBackend, TransferChild};

/// Locator that answers without consulting PATH.
pub struct FixedLocator(pub Option<PathBuf>);

impl ToolLocator for FixedLocator {
    fn locate(&self, _name: &str) -> Option<PathBuf> {
        self.0.clone()
    }
}

pub fn rsync_locator() -> FixedLocator {
    FixedLocator(Some(PathBuf::from("/usr/bin/rsync")))
}

/// Probe with a fixed set of directories.
pub struct FixedProbe(pub HashSet<PathBuf>);

impl FixedProbe {
    pub fn none() -> Self {
        Self(HashSet::new())
    }

    pub fn dirs<const N: usize>(dirs: [PathBuf; N]) -> Self {
        Self(HashSet::from(dirs))
    }
}

impl PathProbe for FixedProbe {
    fn is_dir(&self, path: &Path) -> bool {
        self.0.contains(path)
    }
}

/// Scripted transfer backend recording every spawned argv.
pub struct MockBackend {
    pub exit_code: Option<i32>,
    pub lines: Vec<String>,
    pub spawned: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MockBackend {
    pub fn exiting(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            lines: Vec::new(),
            spawned: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn spawn_count(&self) -> usize {
        self.spawned.lock().unwrap().len()
    }

    pub fn last_argv(&self) -> Vec<String> {
        self.spawned.lock().unwrap().last().cloned().expect("spawned")
    }
}

#[async_trait]
impl TransferBackend for MockBackend {
    async fn spawn(
        &self,
        command: &CommandLine,
        _surface: SurfaceSize,
    ) -> Result<TransferChild, SpawnError> {
        self.spawned.lock().unwrap().push(command.argv());
        let (tx, output) = mpsc::unbounded_channel();
        for line in &self.lines {
            let _ = tx.send(line.clone());
        }
        let (exit_tx, exit) = oneshot::channel();
        let _ = exit_tx.send(self.exit_code);
        Ok(TransferChild { output, exit })
    }
}

/// Notifier capturing everything it is told.
pub struct RecordingNotifier(pub RefCell<Vec<(Severity, String)>>);

impl RecordingNotifier {
    pub fn new() -> Self {
        Self(RefCell::new(Vec::new()))
    }

    pub fn messages(&self) -> Vec<String> {
        self.0.borrow().iter().map(|(_, m)| m.clone()).collect()
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        self.0.borrow_mut().push((severity, message.to_string()));
    }
}

/// In-memory listing view with a scriptable cursor.
pub struct FakeView {
    pub id: ViewId,
    pub listing: bool,
    pub base: PathBuf,
    pub cursor: Option<CursorContext>,
    next: u64,
    pub live: Vec<AnnotationId>,
}

impl FakeView {
    pub fn new(id: ViewId, base: &str) -> Self {
        Self {
            id,
            listing: true,
            base: PathBuf::from(base),
            cursor: None,
            next: 0,
            live: Vec::new(),
        }
    }

    pub fn with_cursor(mut self, text: &str, col: usize, line: usize) -> Self {
        self.cursor = Some(CursorContext {
            line,
            text: text.to_string(),
            col,
        });
        self
    }
}

impl ListingView for FakeView {
    fn id(&self) -> ViewId {
        self.id
    }
    fn is_listing(&self) -> bool {
        self.listing
    }
    fn base_dir(&self) -> &Path {
        &self.base
    }
    fn cursor(&self) -> Option<CursorContext> {
        self.cursor.clone()
    }
    fn install_annotation(&mut self, _line: usize) -> Result<AnnotationId, AnnotationError> {
        self.next += 1;
        let id = AnnotationId(self.next);
        self.live.push(id);
        Ok(id)
    }
    fn remove_annotation(&mut self, id: AnnotationId) -> Result<(), AnnotationError> {
        match self.live.iter().position(|h| *h == id) {
            Some(at) => {
                self.live.remove(at);
                Ok(())
            }
            None => Err(AnnotationError::StaleHandle),
        }
    }
    fn clear_annotations(&mut self) {
        self.live.clear();
    }
}
