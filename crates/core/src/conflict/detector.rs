//! Positional three-way conflict detection.
//!
//! Compares base, incoming, and current file bodies line-by-line at the same
//! index, after padding all three to the longest length. This is a purely
//! positional comparison: it does NOT re-align sequences after insertions or
//! deletions, so a single inserted line shifts every comparison below it.
//! That is a documented limitation of the detector, not a bug to fix here;
//! callers wanting alignment need a real diff engine.

use serde::{Deserialize, Serialize};
use tracing::debug;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Categorisation of a line-level disagreement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// Incoming and current agree on content the base lacks.
    Add,
    /// Base and current agree; incoming removed or rewrote the line.
    Remove,
    /// All three versions disagree.
    Context,
    /// The caller pre-flagged this index as conflicting.
    Flagged,
}

impl std::fmt::Display for ConflictType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Remove => write!(f, "remove"),
            Self::Context => write!(f, "context"),
            Self::Flagged => write!(f, "flagged"),
        }
    }
}

/// A detected disagreement between the three versions at one line position.
///
/// Produced transiently for a resolution request; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineConflict {
    /// 1-based line position.
    pub line_number: usize,
    pub conflict_type: ConflictType,
    pub original: String,
    pub incoming: String,
    pub current: String,
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Compare three file bodies positionally and return the conflicting lines.
///
/// `flagged_lines` holds 1-based line positions the caller already knows are
/// conflicting (e.g. from a failed merge); those indices always produce a
/// [`ConflictType::Flagged`] entry carrying all three variants. Remaining
/// indices are classified by equality.
///
/// Positions where all three versions are identical deliberately produce
/// nothing, not a [`ConflictType::Context`] entry: agreement is not a
/// conflict, and emitting it would report a "conflict" on every line of two
/// identical files.
pub fn detect(
    base: &str,
    incoming: &str,
    current: &str,
    flagged_lines: &[usize],
) -> Vec<LineConflict> {
    let base_lines: Vec<&str> = base.lines().collect();
    let incoming_lines: Vec<&str> = incoming.lines().collect();
    let current_lines: Vec<&str> = current.lines().collect();

    let max_len = base_lines
        .len()
        .max(incoming_lines.len())
        .max(current_lines.len());

    let mut conflicts = Vec::new();

    for i in 0..max_len {
        let line_number = i + 1;
        let b = base_lines.get(i).copied().unwrap_or("");
        let inc = incoming_lines.get(i).copied().unwrap_or("");
        let cur = current_lines.get(i).copied().unwrap_or("");

        let conflict_type = if flagged_lines.contains(&line_number) {
            ConflictType::Flagged
        } else if b == inc && inc == cur {
            continue;
        } else if inc == cur && inc != b {
            ConflictType::Add
        } else if b == cur && b != inc {
            ConflictType::Remove
        } else {
            ConflictType::Context
        };

        conflicts.push(LineConflict {
            line_number,
            conflict_type,
            original: b.to_string(),
            incoming: inc.to_string(),
            current: cur.to_string(),
        });
    }

    debug!(count = conflicts.len(), lines = max_len, "conflict detection complete");
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_bodies_no_conflicts() {
        let text = "a\nb\nc\n";
        assert!(detect(text, text, text, &[]).is_empty());
    }

    #[test]
    fn test_add_classification() {
        // Incoming and current both carry "x" where the base had "a".
        let conflicts = detect("a\n", "x\n", "x\n", &[]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::Add);
        assert_eq!(conflicts[0].line_number, 1);
        assert_eq!(conflicts[0].original, "a");
        assert_eq!(conflicts[0].incoming, "x");
    }

    #[test]
    fn test_remove_classification() {
        // Base and current agree; incoming changed the line.
        let conflicts = detect("a\n", "x\n", "a\n", &[]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::Remove);
    }

    #[test]
    fn test_all_differ_is_context() {
        let conflicts = detect("a\n", "b\n", "c\n", &[]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::Context);
    }

    #[test]
    fn test_flagged_line_overrides_classification() {
        // Line 2 is identical everywhere but pre-flagged by the caller.
        let conflicts = detect("a\nb\n", "a\nb\n", "a\nb\n", &[2]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].line_number, 2);
        assert_eq!(conflicts[0].conflict_type, ConflictType::Flagged);
        assert_eq!(conflicts[0].current, "b");
    }

    #[test]
    fn test_padding_to_longest_body() {
        // Current has two extra lines past the end of base/incoming.
        let conflicts = detect("a\n", "a\n", "a\nb\nc\n", &[]);
        assert_eq!(conflicts.len(), 2);
        assert_eq!(conflicts[0].line_number, 2);
        assert_eq!(conflicts[0].original, "");
        assert_eq!(conflicts[0].current, "b");
        // base == incoming == "" while current differs: all-pairs equality
        // fails, so the entry classifies as context.
        assert_eq!(conflicts[0].conflict_type, ConflictType::Context);
    }

    #[test]
    fn test_positional_shift_is_not_realigned() {
        // Incoming inserts a line at the top; everything below it now
        // mismatches positionally. The detector reports the shift as
        // conflicts rather than re-aligning, the documented limitation.
        let base = "one\ntwo\n";
        let incoming = "zero\none\ntwo\n";
        let conflicts = detect(base, incoming, base, &[]);
        assert!(!conflicts.is_empty());
        assert!(conflicts.iter().all(|c| c.conflict_type == ConflictType::Remove));
    }
}
