//! Path resolution for listing entries.
//!
//! Pure functions: base directory plus the raw text under the cursor in, a
//! normalized absolute path out. Nothing here touches the filesystem.

use std::path::{Component, Path, PathBuf};

// Whitespace is the only delimiter. Punctuation a word-boundary scan would
// split on (`()[]{},=;`) is legal in filenames and stays inside the token.
fn is_token_char(c: char) -> bool {
    !c.is_whitespace()
}

/// Extracts the listing entry token under the cursor column of a raw display
/// line. Tokens are delimited by whitespace only; `()[]{},=;` are part of the
/// token. Returns None when the cursor sits on blank space or past the end
/// of the line.
pub fn entry_token(line: &str, col: usize) -> Option<&str> {
    if col >= line.len() {
        return None;
    }
    // Snap the column to the char boundary at or before it.
    let col = line
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|&i| i <= col)
        .last()?;
    let cursor_char = line[col..].chars().next()?;
    if !is_token_char(cursor_char) {
        return None;
    }

    let start = line[..col]
        .char_indices()
        .rev()
        .take_while(|&(_, c)| is_token_char(c))
        .last()
        .map(|(i, _)| i)
        .unwrap_or(col);
    let end = line[col..]
        .char_indices()
        .take_while(|&(_, c)| is_token_char(c))
        .last()
        .map(|(i, c)| col + i + c.len_utf8())
        .unwrap_or(col);

    let token = &line[start..end];
    (!token.is_empty()).then_some(token)
}

/// Resolves raw entry text against the view's base directory.
///
/// Returns None for blank text, `.`, and `..`. Trailing path separators and
/// the single-character type suffixes some listing engines append (`/`, `*`,
/// `@`) are stripped so a path is a stable set key regardless of whether it
/// denotes a file or directory.
pub fn resolve_entry(base_dir: &Path, raw: &str) -> Option<PathBuf> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Listing engines classify entries with a one-char suffix (`dir/`,
    // `exe*`, `link@`); strip it so the path is a stable set key.
    let entry = trimmed.strip_suffix(['*', '@']).unwrap_or(trimmed);
    let entry = entry.trim_end_matches('/');
    if entry.is_empty() || entry == "." || entry == ".." {
        return None;
    }

    let joined = if Path::new(entry).is_absolute() {
        PathBuf::from(entry)
    } else {
        base_dir.join(entry)
    };
    Some(normalize(&joined))
}

/// Lexical normalization: drops `.` components and collapses `..` against
/// preceding normal components without consulting the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(Component::ParentDir);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_under_cursor_is_whole_entry() {
        assert_eq!(entry_token("notes.txt", 3), Some("notes.txt"));
    }

    #[test]
    fn token_keeps_punctuation_that_word_scans_split_on() {
        let line = "report (final), v2={a;b}.txt";
        assert_eq!(entry_token(line, 10), Some("(final),"));
        assert_eq!(entry_token(line, 18), Some("v2={a;b}.txt"));
    }

    #[test]
    fn every_punctuation_delimiter_candidate_stays_inside_the_token() {
        for c in ['(', ')', '[', ']', '{', '}', ',', '=', ';'] {
            let name = format!("a{c}b.txt");
            let line = format!("pre {name} post");
            assert_eq!(entry_token(&line, 4), Some(name.as_str()), "char {c:?}");
        }
    }

    #[test]
    fn blank_cursor_yields_no_token() {
        assert_eq!(entry_token("a  b", 1), None);
        assert_eq!(entry_token("", 0), None);
        assert_eq!(entry_token("abc", 10), None);
    }

    #[test]
    fn token_handles_multibyte_text() {
        let line = "héllo wörld";
        assert_eq!(entry_token(line, 0), Some("héllo"));
        assert_eq!(entry_token(line, 8), Some("wörld"));
    }

    #[test]
    fn resolves_relative_entry_against_base() {
        let got = resolve_entry(Path::new("/srv/data"), "notes.txt");
        assert_eq!(got, Some(PathBuf::from("/srv/data/notes.txt")));
    }

    #[test]
    fn trailing_separator_is_stripped() {
        let got = resolve_entry(Path::new("/srv"), "photos/");
        assert_eq!(got, Some(PathBuf::from("/srv/photos")));
    }

    #[test]
    fn dot_entries_do_not_resolve() {
        assert_eq!(resolve_entry(Path::new("/srv"), "."), None);
        assert_eq!(resolve_entry(Path::new("/srv"), ".."), None);
        assert_eq!(resolve_entry(Path::new("/srv"), "  "), None);
        assert_eq!(resolve_entry(Path::new("/srv"), "./"), None);
    }

    #[test]
    fn absolute_entry_ignores_base() {
        let got = resolve_entry(Path::new("/srv"), "/tmp/x");
        assert_eq!(got, Some(PathBuf::from("/tmp/x")));
    }

    #[test]
    fn dot_components_are_collapsed() {
        let got = resolve_entry(Path::new("/srv/./data"), "a/../b");
        assert_eq!(got, Some(PathBuf::from("/srv/data/b")));
    }

    #[test]
    fn classifier_suffixes_are_stripped() {
        let base = Path::new("/srv");
        assert_eq!(resolve_entry(base, "run*"), Some(PathBuf::from("/srv/run")));
        assert_eq!(
            resolve_entry(base, "link@"),
            Some(PathBuf::from("/srv/link"))
        );
    }

    #[test]
    fn directory_and_file_spellings_share_a_key() {
        let base = Path::new("/srv");
        assert_eq!(
            resolve_entry(base, "photos/"),
            resolve_entry(base, "photos")
        );
    }
}
