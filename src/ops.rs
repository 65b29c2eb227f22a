//! The user-facing operations: toggle-mark, upload, upload-and-remove,
//! clear-marks.
//!
//! All validation happens here, before any process is spawned; failures
//! degrade to a notification and a returned error. The host wires these to
//! its command registry and key bindings.

use std::path::PathBuf;

use crate::command::{self, CommandLine, PathProbe, ToolLocator, UploadOptions};
use crate::common::config::TransferConfig;
use crate::errors::UploadError;
use crate::host::{ListingView, Notifier, Severity};
use crate::marks::{MarkStore, Toggle};
use crate::resolve;
use crate::session::{supervise, SessionState, SuccessAction, SurfaceSize, TransferBackend, TransferSession};

/// Plain upload, or upload that removes sources on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Keep,
    RemoveSources,
}

/// Directories among the marked paths, recorded before the transfer runs so
/// emptied sources can be swept afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovePlan {
    pub dirs: Vec<PathBuf>,
}

/// A validated, ready-to-launch upload.
#[derive(Debug)]
pub struct PreparedUpload {
    pub command: CommandLine,
    pub remove_plan: Option<RemovePlan>,
}

fn report(notifier: &dyn Notifier, err: &UploadError) {
    notifier.notify(err.severity(), &err.to_string());
}

/// Toggles the mark on the entry under the cursor of `view`.
///
/// Returns None (after a `no_target` warning) when the view is not a tracked
/// listing or the cursor resolves to nothing; marks are untouched in that
/// case.
pub fn toggle_mark(
    store: &mut MarkStore,
    view: &mut dyn ListingView,
    notifier: &dyn Notifier,
) -> Option<Toggle> {
    let target = if view.is_listing() {
        view.cursor().and_then(|cursor| {
            resolve::entry_token(&cursor.text, cursor.col)
                .and_then(|token| resolve::resolve_entry(view.base_dir(), token))
                .map(|path| (path, cursor.line))
        })
    } else {
        None
    };

    let Some((path, line)) = target else {
        report(notifier, &UploadError::NoTarget);
        return None;
    };

    let toggled = store.toggle(path.clone(), view, line);
    let verb = match toggled {
        Toggle::Marked => "Marked",
        Toggle::Unmarked => "Unmarked",
    };
    notifier.notify(Severity::Info, &format!("{verb} {}", path.display()));
    Some(toggled)
}

/// Empties the mark set and every tracked view's annotations.
pub fn clear_marks<'a>(
    store: &mut MarkStore,
    views: impl IntoIterator<Item = &'a mut dyn ListingView>,
    notifier: &dyn Notifier,
) {
    let count = store.len();
    store.clear_all(views);
    notifier.notify(Severity::Info, &format!("Cleared {count} mark(s)"));
}

/// Validates the marked set against the configuration and builds the
/// invocation. Fails fast: nothing is spawned and no state changes on error.
pub fn prepare_upload(
    kind: UploadKind,
    store: &MarkStore,
    config: &TransferConfig,
    locator: &dyn ToolLocator,
    probe: &dyn PathProbe,
) -> Result<PreparedUpload, UploadError> {
    if !config.destination_is_set() {
        return Err(UploadError::DestinationUnset);
    }
    let paths = store.snapshot();
    if paths.is_empty() {
        return Err(UploadError::NothingMarked);
    }

    // The remove flag is a one-shot option derived per invocation; the
    // shared configuration value is never touched.
    let options = UploadOptions {
        remove_sources: kind == UploadKind::RemoveSources,
    };
    let command = command::build(&paths, config, options, locator, probe)?;

    // Which marks are directories must be recorded now: after a
    // remove-transfer the answer changes under us.
    let remove_plan = (kind == UploadKind::RemoveSources).then(|| RemovePlan {
        dirs: paths.iter().filter(|p| probe.is_dir(p)).cloned().collect(),
    });

    Ok(PreparedUpload {
        command,
        remove_plan,
    })
}

/// Removes recorded source directories that the transfer emptied.
///
/// Longest path first, so children are evaluated before their ancestors.
/// Best-effort: anything that no longer exists, is not empty, or refuses
/// removal is skipped silently. Returns what was removed.
pub fn cleanup_empty_dirs(plan: &RemovePlan) -> Vec<PathBuf> {
    let mut dirs = plan.dirs.clone();
    dirs.sort_by(|a, b| b.as_os_str().len().cmp(&a.as_os_str().len()));

    let mut removed = Vec::new();
    for dir in dirs {
        let is_empty = match std::fs::read_dir(&dir) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => continue,
        };
        if is_empty && std::fs::remove_dir(&dir).is_ok() {
            removed.push(dir);
        }
    }
    removed
}

/// Post-success action for a remove-upload: sweep emptied source
/// directories, report them in one aggregated notification, then clear every
/// mark. Shared by the library entry point and the TUI host so the two
/// paths cannot drift.
pub fn remove_success_action<'a>(
    plan: RemovePlan,
    store: &'a mut MarkStore,
    views: Vec<&'a mut dyn ListingView>,
    notifier: &'a dyn Notifier,
) -> SuccessAction<'a> {
    Box::new(move || {
        let removed = cleanup_empty_dirs(&plan);
        if !removed.is_empty() {
            let listed = removed
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            notifier.notify(
                Severity::Info,
                &format!("Removed emptied source directories: {listed}"),
            );
        }
        store.clear_all(views);
        Ok(())
    })
}

/// Runs the full operation: validate, build, launch, supervise, and on
/// success of a remove-upload sweep emptied directories and clear all marks.
///
/// The caller's views are only touched from this task, after the terminal
/// exit event and after the outcome notification.
#[allow(clippy::too_many_arguments)]
pub async fn run_upload<'a>(
    kind: UploadKind,
    store: &'a mut MarkStore,
    views: Vec<&'a mut dyn ListingView>,
    config: &TransferConfig,
    locator: &dyn ToolLocator,
    probe: &dyn PathProbe,
    backend: &dyn TransferBackend,
    notifier: &'a dyn Notifier,
    surface: SurfaceSize,
) -> Result<SessionState, UploadError> {
    let prepared = match prepare_upload(kind, store, config, locator, probe) {
        Ok(prepared) => prepared,
        Err(err) => {
            report(notifier, &err);
            return Err(err);
        }
    };

    let mut session = match TransferSession::launch(backend, &prepared.command, surface).await {
        Ok(session) => session,
        Err(err) => {
            notifier.notify(Severity::Error, &format!("Failed to start transfer: {err}"));
            return Err(UploadError::TransferFailed(-1));
        }
    };

    let action = prepared
        .remove_plan
        .map(|plan| remove_success_action(plan, store, views, notifier));

    match supervise(&mut session, notifier, action).await {
        SessionState::Failed(code) => Err(UploadError::TransferFailed(code)),
        state => Ok(state),
    }
}
