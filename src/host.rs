//! Interfaces to the host application.
//!
//! The listing engine, key bindings, and notification facility live in the
//! host. The core only sees these traits; the bundled TUI is one
//! implementation, tests use in-memory fakes.

use std::path::Path;

use crate::errors::AnnotationError;

/// Identifies one live listing view. Multiple views may show overlapping
/// directories at the same time.
pub type ViewId = u64;

/// Opaque handle to one visual annotation installed on a display line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnnotationId(pub u64);

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Sink for user-facing notifications.
pub trait Notifier {
    fn notify(&self, severity: Severity, message: &str);
}

/// Cursor position inside a listing view, as the host reports it.
#[derive(Debug, Clone)]
pub struct CursorContext {
    /// Display line number the cursor sits on.
    pub line: usize,
    /// Raw text of that display line.
    pub text: String,
    /// Column of the cursor within `text` (byte offset).
    pub col: usize,
}

/// One directory-listing view owned by the host.
///
/// Annotation handles are opaque to the store; `remove_annotation` may fail
/// with a stale handle after the host redrew, which callers treat as
/// cosmetic.
pub trait ListingView {
    fn id(&self) -> ViewId;

    /// Whether this view is a tracked directory listing (as opposed to some
    /// other buffer type the host may focus).
    fn is_listing(&self) -> bool;

    /// Directory the view currently lists.
    fn base_dir(&self) -> &Path;

    /// Cursor position, or None when the view has no usable cursor.
    fn cursor(&self) -> Option<CursorContext>;

    fn install_annotation(&mut self, line: usize) -> Result<AnnotationId, AnnotationError>;

    fn remove_annotation(&mut self, id: AnnotationId) -> Result<(), AnnotationError>;

    /// Drop every annotation in this view in one pass.
    fn clear_annotations(&mut self);
}
