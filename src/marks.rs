//! Mark set and per-view annotation bookkeeping.
//!
//! One `MarkStore` instance is created by the host at startup and passed by
//! reference to the orchestration layer. Mark membership is global; the
//! annotation index is per view, so the same path can be highlighted in
//! several views at once.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::host::{AnnotationId, ListingView, ViewId};

/// Result of a toggle, reported back to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Marked,
    Unmarked,
}

#[derive(Debug, Default)]
pub struct MarkStore {
    marks: BTreeSet<PathBuf>,
    // view -> display line -> installed annotation
    annotations: HashMap<ViewId, HashMap<usize, AnnotationId>>,
}

impl MarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.marks.contains(path)
    }

    /// Sorted snapshot of the marked paths. Sorting keeps command lines and
    /// test assertions deterministic.
    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.marks.iter().cloned().collect()
    }

    /// Toggles `path` and keeps the view's line annotation in sync.
    ///
    /// Marking twice never duplicates; the second toggle removes the mark.
    /// Annotation removal failures are swallowed: a stale handle must never
    /// block the logical mark state.
    pub fn toggle(&mut self, path: PathBuf, view: &mut dyn ListingView, line: usize) -> Toggle {
        if self.marks.remove(&path) {
            if let Some(index) = self.annotations.get_mut(&view.id()) {
                if let Some(handle) = index.remove(&line) {
                    Self::remove_quietly(view, handle);
                }
            }
            tracing::debug!(path = %path.display(), "unmarked");
            return Toggle::Unmarked;
        }

        let index = self.annotations.entry(view.id()).or_default();
        // A prior occupant of the line must go before the new handle lands,
        // otherwise the view leaks annotations.
        if let Some(stale) = index.remove(&line) {
            Self::remove_quietly(view, stale);
        }
        if let Ok(handle) = view.install_annotation(line) {
            index.insert(line, handle);
        }
        tracing::debug!(path = %path.display(), "marked");
        self.marks.insert(path);
        Toggle::Marked
    }

    /// Empties the mark set and clears the whole annotation index of every
    /// live view in one pass.
    pub fn clear_all<'a>(&mut self, views: impl IntoIterator<Item = &'a mut dyn ListingView>) {
        self.marks.clear();
        self.annotations.clear();
        for view in views {
            view.clear_annotations();
        }
    }

    /// A listing reload destroys the view's visual placements; forget them.
    /// The mark set itself stays untouched.
    pub fn on_view_reset(&mut self, view: &mut dyn ListingView) {
        self.annotations.remove(&view.id());
        view.clear_annotations();
    }

    fn remove_quietly(view: &mut dyn ListingView, handle: AnnotationId) {
        if let Err(err) = view.remove_annotation(handle) {
            tracing::warn!(?handle, %err, "dropping stale annotation handle");
        }
    }
}
