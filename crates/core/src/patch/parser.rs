//! Unified-diff statistics parser.
//!
//! `parse` walks `---`/`+++` pairs to delimit per-file segments and tallies
//! `+`/`-` line counts. The scan is pure and restartable: parsing the same
//! input twice always yields the same summary.

use serde::{Deserialize, Serialize};

/// Addition/deletion counts for one file in a patch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileDiffStat {
    pub path: String,
    pub additions: usize,
    pub deletions: usize,
}

/// Summary of a whole patch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatchSummary {
    pub files: Vec<FileDiffStat>,
    pub total_additions: usize,
    pub total_deletions: usize,
}

/// Strip the `a/` / `b/` VCS prefix from a diff header path.
fn strip_vcs_prefix(path: &str) -> &str {
    path.strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path)
}

/// Extract the path from a `--- ` or `+++ ` header line, dropping any
/// trailing tab-separated timestamp.
fn header_path(line: &str) -> &str {
    let rest = &line[4..];
    let rest = rest.split('\t').next().unwrap_or(rest).trim();
    strip_vcs_prefix(rest)
}

/// Parse `content` into per-file diff statistics.
pub fn parse(content: &str) -> PatchSummary {
    let mut summary = PatchSummary::default();
    // Path from the most recent `---` header, used when `+++` is /dev/null.
    let mut pending_old_path: Option<String> = None;
    let mut current: Option<FileDiffStat> = None;

    for line in content.lines() {
        if line.starts_with("--- ") {
            pending_old_path = Some(header_path(line).to_string());
            continue;
        }

        if line.starts_with("+++ ") {
            if let Some(file) = current.take() {
                summary.files.push(file);
            }
            let new_path = header_path(line);
            let path = if new_path == "/dev/null" {
                pending_old_path.take().unwrap_or_default()
            } else {
                new_path.to_string()
            };
            current = Some(FileDiffStat {
                path,
                additions: 0,
                deletions: 0,
            });
            continue;
        }

        if let Some(file) = current.as_mut() {
            if line.starts_with('+') {
                file.additions += 1;
                summary.total_additions += 1;
            } else if line.starts_with('-') {
                file.deletions += 1;
                summary.total_deletions += 1;
            }
        }
    }

    if let Some(file) = current.take() {
        summary.files.push(file);
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_file_counts() {
        let patch = "--- a/f\n+++ b/f\n@@ -1,1 +1,2 @@\n-old\n+new\n+new2\n";
        let summary = parse(patch);
        assert_eq!(summary.files.len(), 1);
        assert_eq!(summary.files[0].path, "f");
        assert_eq!(summary.files[0].additions, 2);
        assert_eq!(summary.files[0].deletions, 1);
        assert_eq!(summary.total_additions, 2);
        assert_eq!(summary.total_deletions, 1);
    }

    #[test]
    fn test_parse_is_idempotent() {
        let patch = "--- a/x\n+++ b/x\n@@ -1,3 +1,3 @@\n ctx\n-one\n+uno\n ctx\n";
        assert_eq!(parse(patch), parse(patch));
    }

    #[test]
    fn test_multi_file_patch() {
        let patch = concat!(
            "--- a/src/main.rs\n+++ b/src/main.rs\n",
            "@@ -1,2 +1,2 @@\n-a\n+b\n ctx\n",
            "--- a/src/lib.rs\n+++ b/src/lib.rs\n",
            "@@ -5,1 +5,3 @@\n+x\n+y\n ctx\n",
        );
        let summary = parse(patch);
        assert_eq!(summary.files.len(), 2);
        assert_eq!(summary.files[0].path, "src/main.rs");
        assert_eq!(summary.files[1].path, "src/lib.rs");
        assert_eq!(summary.total_additions, 3);
        assert_eq!(summary.total_deletions, 1);
    }

    #[test]
    fn test_deleted_file_uses_old_path() {
        let patch = "--- a/gone.rs\n+++ /dev/null\n@@ -1,2 +0,0 @@\n-a\n-b\n";
        let summary = parse(patch);
        assert_eq!(summary.files[0].path, "gone.rs");
        assert_eq!(summary.files[0].deletions, 2);
        assert_eq!(summary.files[0].additions, 0);
    }

    #[test]
    fn test_header_timestamp_stripped() {
        let patch = "--- a/f\t2025-01-01 00:00:00\n+++ b/f\t2025-01-02 00:00:00\n@@ -1 +1 @@\n-x\n+y\n";
        let summary = parse(patch);
        assert_eq!(summary.files[0].path, "f");
    }

    #[test]
    fn test_empty_input() {
        let summary = parse("");
        assert!(summary.files.is_empty());
        assert_eq!(summary.total_additions, 0);
        assert_eq!(summary.total_deletions, 0);
    }
}
