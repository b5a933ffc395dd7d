//! Three-valued comparator: classifies the relation between two cleaned
//! artifacts as `SAME`, `DOMINATES`, `DIFFERENT`, or `ERROR`.
//!
//! Uses an in-process Myers-style line diff (the `similar` crate) instead of
//! shelling out to `diff`/`cmp`/`grep` — the classification contract is
//! reproduced exactly: the comparator renders the same `NdM`/`NaM`/`NcM`
//! hunk-header shape classic `diff` emits, so the noise-pattern regex and
//! the "pure-insertion hunk" stripping rule behave identically to the
//! original tool this engine replaces.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use similar::{DiffOp, TextDiff};

use crate::core::errors::{PruneError, Result};

/// Classification of the relationship between a "before" and "after" cleaned
/// artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpResult {
    /// Informationally equivalent.
    Same,
    /// `after` contains all of `before`'s information, and strictly more.
    Dominates,
    /// Each side has information the other lacks.
    Different,
    /// At least one cleaner failed; treated as `Different` for safety.
    Error,
}

impl CmpResult {
    /// `DOMINATES` folds to `SAME` when `delete_dominated`, else `DIFFERENT`;
    /// `ERROR` always folds to `DIFFERENT`.
    #[must_use]
    pub const fn normalise(self, delete_dominated: bool) -> Self {
        match self {
            Self::Dominates if delete_dominated => Self::Same,
            Self::Dominates => Self::Different,
            Self::Error => Self::Different,
            other => other,
        }
    }
}

/// A comparison result: the classification plus an optional rendering of
/// the residual diff body (kept only when non-trivial; `SAME` and the
/// byte-identical fast path never populate it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff {
    pub cmp: CmpResult,
    pub body: Option<Vec<u8>>,
}

impl Diff {
    #[must_use]
    pub const fn same() -> Self {
        Self {
            cmp: CmpResult::Same,
            body: None,
        }
    }

    #[must_use]
    pub const fn error() -> Self {
        Self {
            cmp: CmpResult::Error,
            body: None,
        }
    }
}

/// Line-anchored regex whose matches are dropped from diff output before
/// classification. The default matches classic-diff addition marker lines
/// (`> `).
#[derive(Debug, Clone)]
pub struct NoiseFilter(Regex);

impl NoiseFilter {
    pub fn new(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(Self)
            .map_err(|error| PruneError::InvalidConfig {
                details: format!("noise pattern {pattern:?} is invalid: {error}"),
            })
    }

    fn matches(&self, line: &str) -> bool {
        self.0.is_match(line)
    }
}

impl Default for NoiseFilter {
    fn default() -> Self {
        Self::new("^> ").expect("default noise pattern is valid")
    }
}

/// Matches classic-diff pure-insertion hunk headers, e.g. `12a13` or
/// `12a13,15` — these mark "added at" hunks with no removal.
fn is_pure_insertion_header(line: &str) -> bool {
    let Some(a_pos) = line.find('a') else {
        return false;
    };
    let (left, right) = (&line[..a_pos], &line[a_pos + 1..]);
    if left.is_empty() || !left.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match right.split_once(',') {
        Some((lo, hi)) => {
            !lo.is_empty()
                && !hi.is_empty()
                && lo.bytes().all(|b| b.is_ascii_digit())
                && hi.bytes().all(|b| b.is_ascii_digit())
        }
        None => !right.is_empty() && right.bytes().all(|b| b.is_ascii_digit()),
    }
}

/// The comparator: given two cleaned artifact paths, classifies their
/// relationship. Safe to call concurrently on disjoint path pairs — its
/// only external state is the two files it reads.
#[derive(Debug, Clone)]
pub struct Comparator {
    noise: NoiseFilter,
    fast_track_threshold_bytes: u64,
}

impl Comparator {
    #[must_use]
    pub fn new(noise: NoiseFilter, fast_track_threshold_bytes: u64) -> Self {
        Self {
            noise,
            fast_track_threshold_bytes,
        }
    }

    /// Compare two cleaned artifacts. Returns `Diff::error()` (not an `Err`)
    /// when the comparison itself cannot be completed due to I/O failure —
    /// comparator failure downgrades to `ERROR`, it does not abort the run.
    /// `PruneError::is_recoverable` gates the log level: a recoverable
    /// `ComparatorFailed` is expected and logged at `warn`; anything else
    /// reaching this path is a sign something upstream built the wrong
    /// error kind, logged at `error`, but still downgraded — everything but
    /// an `InvariantViolation` downgrades, and this call site never
    /// produces one.
    #[tracing::instrument(skip(self), fields(before = %before.display(), after = %after.display()))]
    pub fn compare(&self, before: &Path, after: &Path) -> Diff {
        match self.compare_inner(before, after) {
            Ok(diff) => diff,
            Err(error) => {
                if error.is_recoverable() {
                    tracing::warn!(%error, "comparator failed, downgrading to ERROR");
                } else {
                    tracing::error!(%error, "comparator failed with an unexpected error kind, downgrading to ERROR anyway");
                }
                Diff::error()
            }
        }
    }

    fn compare_inner(&self, before: &Path, after: &Path) -> Result<Diff> {
        let b = fs::read(before).map_err(|source| PruneError::ComparatorFailed {
            before: before.to_path_buf(),
            after: after.to_path_buf(),
            details: source.to_string(),
        })?;
        let a = fs::read(after).map_err(|source| PruneError::ComparatorFailed {
            before: before.to_path_buf(),
            after: after.to_path_buf(),
            details: source.to_string(),
        })?;

        // 1. Byte equality fast path.
        if a == b {
            tracing::debug!("byte-identical");
            return Ok(Diff::same());
        }

        // 2. Text diff, rendered in classic-diff hunk shape.
        let before_text = String::from_utf8_lossy(&b).into_owned();
        let after_text = String::from_utf8_lossy(&a).into_owned();
        let rendered = render_classic_diff(&before_text, &after_text);

        let filtered: Vec<&str> = rendered
            .iter()
            .map(String::as_str)
            .filter(|line| !self.noise.matches(line))
            .collect();

        let body_len: usize = filtered.iter().map(|line| line.len() + 1).sum();
        if body_len as u64 > self.fast_track_threshold_bytes {
            tracing::debug!(body_len, "diff body exceeds fast-track threshold");
            return Ok(Diff {
                cmp: CmpResult::Different,
                body: None,
            });
        }

        // 3. Strip pure-insertion hunk headers; anything left indicates
        //    removal or modification from the `before` side.
        let residual: Vec<&str> = filtered
            .into_iter()
            .filter(|line| !is_pure_insertion_header(line))
            .collect();

        if residual.is_empty() {
            tracing::debug!("all changes are additions only");
            Ok(Diff {
                cmp: CmpResult::Dominates,
                body: None,
            })
        } else {
            let body = residual.join("\n").into_bytes();
            Ok(Diff {
                cmp: CmpResult::Different,
                body: Some(body),
            })
        }
    }
}

/// Render a line diff in the shape classic (non-unified) `diff` emits:
/// `NdM` / `NaM` / `NcM` hunk headers, `< `-prefixed removed lines,
/// `> `-prefixed added lines, and a `---` separator for change hunks.
fn render_classic_diff(old_text: &str, new_text: &str) -> Vec<String> {
    let diff = TextDiff::from_lines(old_text, new_text);
    let old_slices = diff.old_slices();
    let new_slices = diff.new_slices();

    let mut out = Vec::new();
    for op in diff.ops() {
        match *op {
            DiffOp::Equal { .. } => {}
            DiffOp::Delete {
                old_index,
                old_len,
                new_index,
            } => {
                out.push(format!(
                    "{}d{new_index}",
                    fmt_range(old_index + 1, old_len)
                ));
                push_lines(&mut out, old_slices, old_index, old_len, "< ");
            }
            DiffOp::Insert {
                old_index,
                new_index,
                new_len,
            } => {
                out.push(format!(
                    "{old_index}a{}",
                    fmt_range(new_index + 1, new_len)
                ));
                push_lines(&mut out, new_slices, new_index, new_len, "> ");
            }
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => {
                out.push(format!(
                    "{}c{}",
                    fmt_range(old_index + 1, old_len),
                    fmt_range(new_index + 1, new_len)
                ));
                push_lines(&mut out, old_slices, old_index, old_len, "< ");
                out.push("---".to_string());
                push_lines(&mut out, new_slices, new_index, new_len, "> ");
            }
        }
    }
    out
}

fn push_lines(out: &mut Vec<String>, slices: &[&str], start: usize, len: usize, prefix: &str) {
    for slice in &slices[start..start + len] {
        out.push(format!("{prefix}{}", slice.trim_end_matches(['\n', '\r'])));
    }
}

fn fmt_range(start_1based: usize, len: usize) -> String {
    if len <= 1 {
        start_1based.to_string()
    } else {
        format!("{start_1based},{}", start_1based + len - 1)
    }
}

/// Convenience: resolve a readable `PathBuf` for error messages even when a
/// file has already vanished (used by callers building `ComparatorFailed`).
#[must_use]
pub fn display_path(path: &Path) -> PathBuf {
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let p = dir.join(name);
        fs::write(&p, contents).unwrap();
        p
    }

    fn comparator() -> Comparator {
        Comparator::new(NoiseFilter::default(), 10_000)
    }

    #[test]
    fn identical_files_are_same() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a", "one\ntwo\nthree\n");
        let b = write(dir.path(), "b", "one\ntwo\nthree\n");
        let diff = comparator().compare(&a, &b);
        assert_eq!(diff.cmp, CmpResult::Same);
    }

    #[test]
    fn pure_additions_dominate() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a", "one\ntwo\n");
        let b = write(dir.path(), "b", "one\ntwo\nthree\nfour\n");
        let diff = comparator().compare(&a, &b);
        assert_eq!(diff.cmp, CmpResult::Dominates);
    }

    #[test]
    fn removed_lines_are_different() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a", "one\ntwo\nthree\n");
        let b = write(dir.path(), "b", "one\nthree\n");
        let diff = comparator().compare(&a, &b);
        assert_eq!(diff.cmp, CmpResult::Different);
    }

    #[test]
    fn mixed_add_and_remove_is_different() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a", "one\ntwo\nthree\n");
        let b = write(dir.path(), "b", "one\nfour\nthree\nfive\n");
        let diff = comparator().compare(&a, &b);
        assert_eq!(diff.cmp, CmpResult::Different);
    }

    #[test]
    fn large_diff_short_circuits_to_different_even_if_additions_only() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a", "base\n");
        let mut big = "base\n".to_string();
        for i in 0..2000 {
            big.push_str(&format!("line number {i} padding padding padding\n"));
        }
        let b = write(dir.path(), "b", &big);
        let cmp = Comparator::new(NoiseFilter::default(), 64);
        let diff = cmp.compare(&a, &b);
        // A large additions-only diff is conservatively classified
        // DIFFERENT, not DOMINATES, once it crosses the fast-track
        // threshold — see DESIGN.md's note on this tradeoff.
        assert_eq!(diff.cmp, CmpResult::Different);
    }

    #[test]
    fn missing_file_downgrades_to_error() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a", "one\n");
        let missing = dir.path().join("does-not-exist");
        let diff = comparator().compare(&a, &missing);
        assert_eq!(diff.cmp, CmpResult::Error);
    }

    #[test]
    fn normalise_folds_dominates_per_policy() {
        assert_eq!(CmpResult::Dominates.normalise(true), CmpResult::Same);
        assert_eq!(CmpResult::Dominates.normalise(false), CmpResult::Different);
        assert_eq!(CmpResult::Error.normalise(true), CmpResult::Different);
        assert_eq!(CmpResult::Same.normalise(true), CmpResult::Same);
    }

    #[test]
    fn pure_insertion_header_detection() {
        assert!(is_pure_insertion_header("12a13"));
        assert!(is_pure_insertion_header("12a13,15"));
        assert!(!is_pure_insertion_header("12d13"));
        assert!(!is_pure_insertion_header("12c13,15"));
        assert!(!is_pure_insertion_header("< some line"));
    }
}
