//! The reference host's directory listing: one view over one directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::errors::AnnotationError;
use crate::host::{AnnotationId, CursorContext, ListingView, ViewId};

/// One entry line as displayed.
#[derive(Debug, Clone)]
pub struct Entry {
    pub name: String,
    pub is_dir: bool,
}

impl Entry {
    /// Display text, with the directory classifier suffix.
    pub fn display(&self) -> String {
        if self.is_dir {
            format!("{}/", self.name)
        } else {
            self.name.clone()
        }
    }
}

/// A sorted listing of one directory with a cursor and mark annotations.
pub struct DirListing {
    id: ViewId,
    dir: PathBuf,
    entries: Vec<Entry>,
    cursor: usize,
    next_annotation: u64,
    // line -> handle; the MarkStore owns the authoritative index, this is
    // the visual side.
    annotated: Vec<(usize, AnnotationId)>,
}

impl DirListing {
    pub fn open(id: ViewId, dir: &Path) -> Result<Self> {
        let mut listing = Self {
            id,
            dir: dir.to_path_buf(),
            entries: Vec::new(),
            cursor: 0,
            next_annotation: 0,
            annotated: Vec::new(),
        };
        listing.reload()?;
        Ok(listing)
    }

    /// Re-reads the directory. The caller must follow up with
    /// `MarkStore::on_view_reset`, since prior annotations no longer point
    /// at meaningful lines.
    pub fn reload(&mut self) -> Result<()> {
        let mut entries = Vec::new();
        let dir = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list {}", self.dir.display()))?;
        for entry in dir.flatten() {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            entries.push(Entry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir,
            });
        }
        entries.sort_by(|a, b| (!a.is_dir, &a.name).cmp(&(!b.is_dir, &b.name)));
        self.cursor = self.cursor.min(entries.len().saturating_sub(1));
        self.entries = entries;
        Ok(())
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn cursor_index(&self) -> usize {
        self.cursor
    }

    pub fn is_annotated(&self, line: usize) -> bool {
        self.annotated.iter().any(|(l, _)| *l == line)
    }

    pub fn move_cursor(&mut self, delta: isize) {
        if self.entries.is_empty() {
            return;
        }
        let last = self.entries.len() - 1;
        self.cursor = self.cursor.saturating_add_signed(delta).min(last);
    }

    /// Directory under the cursor, if the cursor sits on one.
    pub fn cursor_dir(&self) -> Option<PathBuf> {
        let entry = self.entries.get(self.cursor)?;
        entry.is_dir.then(|| self.dir.join(&entry.name))
    }

    /// Re-points the view at `dir` and reloads.
    pub fn enter(&mut self, dir: PathBuf) -> Result<()> {
        self.dir = dir;
        self.cursor = 0;
        self.reload()
    }

    pub fn parent(&self) -> Option<PathBuf> {
        self.dir.parent().map(Path::to_path_buf)
    }
}

impl ListingView for DirListing {
    fn id(&self) -> ViewId {
        self.id
    }

    fn is_listing(&self) -> bool {
        true
    }

    fn base_dir(&self) -> &Path {
        &self.dir
    }

    fn cursor(&self) -> Option<CursorContext> {
        let entry = self.entries.get(self.cursor)?;
        Some(CursorContext {
            line: self.cursor,
            text: entry.display(),
            col: 0,
        })
    }

    fn install_annotation(&mut self, line: usize) -> Result<AnnotationId, AnnotationError> {
        self.next_annotation += 1;
        let handle = AnnotationId(self.next_annotation);
        self.annotated.push((line, handle));
        Ok(handle)
    }

    fn remove_annotation(&mut self, id: AnnotationId) -> Result<(), AnnotationError> {
        match self.annotated.iter().position(|(_, h)| *h == id) {
            Some(at) => {
                self.annotated.remove(at);
                Ok(())
            }
            None => Err(AnnotationError::StaleHandle),
        }
    }

    fn clear_annotations(&mut self) {
        self.annotated.clear();
    }
}
