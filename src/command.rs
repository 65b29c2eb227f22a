//! rsync argument-vector construction.
//!
//! `build` is a pure function over the path list and configuration; the two
//! trait seams (executable lookup, directory probing) exist so tests never
//! touch PATH or the filesystem.
//!
//! Escaping strategy: the invocation is an argument vector handed to exec
//! without an intermediate shell, so paths, the destination, and extra
//! arguments are passed literally. Shell escaping happens exactly once, in
//! the `-e` value, which rsync itself word-splits. `CommandLine::rendered`
//! escapes independently for logs and is never executed.

use std::path::{Path, PathBuf};

use crate::common::config::TransferConfig;
use crate::errors::BuildError;

/// Name of the external transfer tool looked up on the search path.
pub const TRANSFER_TOOL: &str = "rsync";

/// Flag injected for a single remove-and-upload invocation.
pub const REMOVE_SOURCES_FLAG: &str = "--remove-source-files";

/// Resolves an executable name on the search path.
pub trait ToolLocator {
    fn locate(&self, name: &str) -> Option<PathBuf>;
}

/// Production locator backed by the `which` crate.
pub struct PathLocator;

impl ToolLocator for PathLocator {
    fn locate(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }
}

/// Answers "is this path a directory right now".
pub trait PathProbe {
    fn is_dir(&self, path: &Path) -> bool;
}

/// Production probe backed by `std::fs`.
pub struct FsProbe;

impl PathProbe for FsProbe {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

/// One-shot options for a single invocation. The base configuration is
/// never mutated; remove-and-upload derives its flag set from this record
/// instead of a mutate/restore dance on shared state.
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadOptions {
    pub remove_sources: bool,
}

/// A ready-to-spawn invocation: program plus literal arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Full argument vector including the program, for spawning.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = vec![self.program.to_string_lossy().into_owned()];
        argv.extend(self.args.iter().cloned());
        argv
    }

    /// Single shell-escaped string for logs and the status line. Never
    /// executed.
    pub fn rendered(&self) -> String {
        shell_words::join(self.argv().iter().map(String::as_str))
    }
}

fn has_recursion(flags: &[String]) -> bool {
    flags.iter().any(|f| {
        if f == "--archive" || f == "--recursive" {
            return true;
        }
        // Short option cluster such as -avhP.
        match f.strip_prefix('-') {
            Some(rest) if !rest.starts_with('-') => rest.contains('a') || rest.contains('r'),
            _ => false,
        }
    })
}

/// Builds the rsync invocation for `paths` (already sorted by the caller).
///
/// Empty path lists are the caller's problem; validation happens in the
/// orchestration layer before this runs.
pub fn build(
    paths: &[PathBuf],
    config: &TransferConfig,
    options: UploadOptions,
    locator: &dyn ToolLocator,
    probe: &dyn PathProbe,
) -> Result<CommandLine, BuildError> {
    let program = locator
        .locate(TRANSFER_TOOL)
        .ok_or(BuildError::ToolNotFound)?;

    let mut args: Vec<String> = Vec::new();
    for flag in &config.base_flags {
        let flag = flag.trim();
        if flag.is_empty() {
            continue;
        }
        if flag.starts_with('-') {
            args.push(flag.to_string());
        } else {
            args.push(format!("-{flag}"));
        }
    }

    // Directories without a recursion flag transfer nothing; infer one so
    // the invocation is never a silent no-op.
    if !has_recursion(&args) && paths.iter().any(|p| probe.is_dir(p)) {
        args.push("--recursive".to_string());
    }

    if config.preserve_relative_paths {
        args.push("--relative".to_string());
    }

    if options.remove_sources {
        args.push(REMOVE_SOURCES_FLAG.to_string());
    }

    args.extend(config.extra_flags.iter().cloned());

    if !config.transport_args.is_empty() {
        args.push("-e".to_string());
        args.push(shell_words::join(
            config.transport_args.iter().map(String::as_str),
        ));
    }

    for path in paths {
        args.push(path.to_string_lossy().into_owned());
    }
    args.push(config.destination.clone());

    Ok(CommandLine { program, args })
}
