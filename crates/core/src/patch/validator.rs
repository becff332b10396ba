//! Unified-diff format validation.
//!
//! A patch is accepted when it carries a `---`/`+++` file header pair, at
//! least one well-formed `@@ -a,b +c,d @@` hunk header, only legal line
//! prefixes inside hunks, and no hunk without any real `+`/`-` change.

use std::sync::OnceLock;

use regex_lite::Regex;
use tracing::debug;

use crate::errors::PatchError;

fn hunk_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^@@ -\d+(,\d+)? \+\d+(,\d+)? @@").expect("hunk header regex is valid")
    })
}

/// Whether a line starts a new per-file section (or a non-hunk preamble line
/// such as git's `diff --git` / `Index:` separators).
fn is_file_boundary(line: &str) -> bool {
    line.starts_with("--- ")
        || line.starts_with("+++ ")
        || line.starts_with("diff ")
        || line.starts_with("Index: ")
}

/// Validate `content` as a unified diff.
///
/// Returns `Ok(())` for a well-formed patch, or the first [`PatchError`]
/// encountered. Line numbers in errors are 1-based.
pub fn validate(content: &str) -> Result<(), PatchError> {
    let mut has_old_header = false;
    let mut has_new_header = false;
    for line in content.lines() {
        if line.starts_with("--- ") {
            has_old_header = true;
        } else if line.starts_with("+++ ") {
            has_new_header = true;
        }
    }
    if !has_old_header || !has_new_header {
        return Err(PatchError::MissingFileHeaders);
    }

    let mut hunk_count = 0usize;
    // (header line number, count of +/- lines seen) for the open hunk.
    let mut open_hunk: Option<(usize, usize)> = None;

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;

        if line.starts_with("@@") {
            if !hunk_header_re().is_match(line) {
                return Err(PatchError::MalformedHunkHeader {
                    line: line_no,
                    text: line.to_string(),
                });
            }
            close_hunk(open_hunk.take())?;
            open_hunk = Some((line_no, 0));
            hunk_count += 1;
            continue;
        }

        if is_file_boundary(line) {
            close_hunk(open_hunk.take())?;
            continue;
        }

        if let Some((_, changes)) = open_hunk.as_mut() {
            match line.as_bytes().first() {
                Some(b' ') | Some(b'\\') => {}
                Some(b'+') | Some(b'-') => *changes += 1,
                _ => {
                    return Err(PatchError::MalformedHunkLine {
                        line: line_no,
                        text: line.to_string(),
                    });
                }
            }
        }
    }

    close_hunk(open_hunk.take())?;

    if hunk_count == 0 {
        return Err(PatchError::NoHunks);
    }

    debug!(hunks = hunk_count, "patch validated");
    Ok(())
}

/// Reject a finished hunk that carried no `+`/`-` lines.
fn close_hunk(hunk: Option<(usize, usize)>) -> Result<(), PatchError> {
    match hunk {
        Some((header_line, 0)) => Err(PatchError::NoOpHunk { line: header_line }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_PATCH: &str = "--- a/f\n+++ b/f\n@@ -1,1 +1,2 @@\n-old\n+new\n+new2\n";

    #[test]
    fn test_valid_patch_accepted() {
        assert!(validate(GOOD_PATCH).is_ok());
    }

    #[test]
    fn test_missing_new_header_rejected() {
        let patch = "--- a/f\n@@ -1,1 +1,1 @@\n-old\n+new\n";
        assert_eq!(validate(patch), Err(PatchError::MissingFileHeaders));
    }

    #[test]
    fn test_missing_old_header_rejected() {
        let patch = "+++ b/f\n@@ -1,1 +1,1 @@\n-old\n+new\n";
        assert_eq!(validate(patch), Err(PatchError::MissingFileHeaders));
    }

    #[test]
    fn test_no_hunks_rejected() {
        let patch = "--- a/f\n+++ b/f\njust some text\n";
        assert_eq!(validate(patch), Err(PatchError::NoHunks));
    }

    #[test]
    fn test_malformed_hunk_header_rejected() {
        let patch = "--- a/f\n+++ b/f\n@@ -x +1 @@\n+new\n";
        assert!(matches!(
            validate(patch),
            Err(PatchError::MalformedHunkHeader { line: 3, .. })
        ));
    }

    #[test]
    fn test_header_without_counts_accepted() {
        let patch = "--- a/f\n+++ b/f\n@@ -1 +1 @@\n-old\n+new\n";
        assert!(validate(patch).is_ok());
    }

    #[test]
    fn test_bad_hunk_line_named() {
        let patch = "--- a/f\n+++ b/f\n@@ -1,2 +1,2 @@\n-old\n*what\n+new\n";
        assert_eq!(
            validate(patch),
            Err(PatchError::MalformedHunkLine {
                line: 5,
                text: "*what".into()
            })
        );
    }

    #[test]
    fn test_noop_hunk_rejected() {
        let patch = "--- a/f\n+++ b/f\n@@ -1,2 +1,2 @@\n context\n another\n";
        assert_eq!(validate(patch), Err(PatchError::NoOpHunk { line: 3 }));
    }

    #[test]
    fn test_noop_hunk_before_second_file_rejected() {
        let patch = "--- a/f\n+++ b/f\n@@ -1,1 +1,1 @@\n ctx\n--- a/g\n+++ b/g\n@@ -1,1 +1,1 @@\n-x\n+y\n";
        assert_eq!(validate(patch), Err(PatchError::NoOpHunk { line: 3 }));
    }

    #[test]
    fn test_multi_file_patch_accepted() {
        let patch = concat!(
            "diff --git a/f b/f\n",
            "--- a/f\n+++ b/f\n",
            "@@ -1,1 +1,1 @@\n-x\n+y\n",
            "diff --git a/g b/g\n",
            "--- a/g\n+++ b/g\n",
            "@@ -3,2 +3,3 @@ fn main() {\n ctx\n+added\n ctx2\n",
        );
        assert!(validate(patch).is_ok());
    }

    #[test]
    fn test_no_newline_marker_accepted() {
        let patch = "--- a/f\n+++ b/f\n@@ -1,1 +1,1 @@\n-old\n+new\n\\ No newline at end of file\n";
        assert!(validate(patch).is_ok());
    }
}
