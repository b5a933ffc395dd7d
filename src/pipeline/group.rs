//! The group folder: consumes a relation stream and yields equivalence
//! groups — maximal runs of mutually redundant snapshots.
//!
//! Grounded in the grouping behaviour implied by `bleanser.core.processor`'s
//! `compute_instructions`/`relations_to_instructions` (referenced from
//! `tests/test_hypothesis.py`; the fold itself isn't in the filtered source,
//! so this follows the documented fold rules literally, validated against
//! worked grouping scenarios covering delete-dominated and keep-both runs).

use std::path::PathBuf;

use crate::compare::CmpResult;
use crate::core::errors::{PruneError, Result};
use crate::pipeline::relation::Relation;

/// A non-empty, ordered, contiguous run of input paths that are mutually
/// redundant under the active policy. Groups partition the input
/// sequence and preserve its order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group(Vec<PathBuf>);

impl Group {
    /// Wrap a non-empty path vector as a group.
    ///
    /// # Errors
    /// Returns [`PruneError::EmptyGroup`] if `paths` is empty — a group
    /// folder yielding an empty group is a programmer error caught by a
    /// runtime invariant check, not a recoverable condition.
    pub fn new(paths: Vec<PathBuf>) -> Result<Self> {
        if paths.is_empty() {
            return Err(PruneError::EmptyGroup {
                details: "group folder yielded an empty group".to_string(),
            });
        }
        Ok(Self(paths))
    }

    /// The paths in this group, in input order.
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.0
    }

    /// Number of paths in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// A group is never empty by construction, but clippy wants this.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Folds an ordered relation stream into groups under the `delete_dominated`
/// policy knob. `keep_both` does not affect grouping — only plan building.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupFolder {
    delete_dominated: bool,
}

impl GroupFolder {
    /// Build a folder with the given `delete_dominated` policy.
    #[must_use]
    pub const fn new(delete_dominated: bool) -> Self {
        Self { delete_dominated }
    }

    /// Fold `paths` and their `relations` into groups.
    ///
    /// `paths` is the full, ordered input sequence; it disambiguates the
    /// zero/one-relation edge cases ("single input" / "two inputs") where
    /// the relation stream alone cannot reveal which single path to emit.
    /// For two or more inputs, `relations` must be exactly
    /// `produce_relations(paths, ..)`'s output — same order, same chaining.
    ///
    /// # Errors
    /// Returns [`PruneError::InvariantViolation`] if adjacent relations
    /// don't chain (`relations[i].after != relations[i+1].before`), or
    /// [`PruneError::EmptyGroup`] if folding would yield an empty group.
    pub fn fold(
        &self,
        paths: &[PathBuf],
        relations: impl IntoIterator<Item = Relation>,
    ) -> Result<Vec<Group>> {
        if paths.len() <= 1 {
            return Ok(paths
                .first()
                .cloned()
                .map(|p| Group::new(vec![p]))
                .transpose()?
                .into_iter()
                .collect());
        }

        let mut groups = Vec::new();
        let mut buffer: Vec<PathBuf> = Vec::new();
        let mut last_after: Option<PathBuf> = None;

        for relation in relations {
            if let Some(expected_before) = &last_after {
                if *expected_before != relation.before {
                    return Err(PruneError::InvariantViolation {
                        details: format!(
                            "relation chain broken: expected before={expected_before:?}, got {:?}",
                            relation.before
                        ),
                    });
                }
            }

            let normalised = relation.diff.cmp.normalise(self.delete_dominated);

            if buffer.last() != Some(&relation.before) {
                buffer.push(relation.before.clone());
            }

            if normalised == CmpResult::Different {
                tracing::debug!(size = buffer.len(), "group boundary");
                groups.push(Group::new(std::mem::take(&mut buffer))?);
            }

            last_after = Some(relation.after.clone());
        }

        if let Some(after) = last_after {
            if buffer.last() != Some(&after) {
                buffer.push(after);
            }
        }
        if !buffer.is_empty() {
            groups.push(Group::new(buffer)?);
        }

        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::Diff;

    fn path(name: &str) -> PathBuf {
        PathBuf::from(name)
    }

    fn relation(before: &str, after: &str, cmp: CmpResult) -> Relation {
        Relation {
            before: path(before),
            after: path(after),
            diff: Diff { cmp, body: None },
        }
    }

    #[test]
    fn single_input_yields_one_group() {
        let paths = vec![path("a")];
        let groups = GroupFolder::new(false).fold(&paths, vec![]).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].paths(), &[path("a")]);
    }

    #[test]
    fn empty_input_yields_no_groups() {
        let groups = GroupFolder::new(false).fold(&[], vec![]).unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn two_inputs_different_yields_two_groups() {
        let paths = vec![path("a"), path("b")];
        let relations = vec![relation("a", "b", CmpResult::Different)];
        let groups = GroupFolder::new(false).fold(&paths, relations).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].paths(), &[path("a")]);
        assert_eq!(groups[1].paths(), &[path("b")]);
    }

    #[test]
    fn two_inputs_same_yields_one_group_of_two() {
        let paths = vec![path("a"), path("b")];
        let relations = vec![relation("a", "b", CmpResult::Same)];
        let groups = GroupFolder::new(false).fold(&paths, relations).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].paths(), &[path("a"), path("b")]);
    }

    /// 8 inputs a..h, adjacent results
    /// SAME, DOMINATES, DIFFERENT, SAME, DIFFERENT, SAME, SAME.
    /// With delete_dominated=true groups are [a,b,c],[d,e],[f,g,h].
    #[test]
    fn eight_input_run_groups_on_difference_boundaries() {
        let paths: Vec<PathBuf> = "abcdefgh".chars().map(|c| path(&c.to_string())).collect();
        let letters: Vec<String> = "abcdefgh".chars().map(String::from).collect();
        let cmps = [
            CmpResult::Same,
            CmpResult::Dominates,
            CmpResult::Different,
            CmpResult::Same,
            CmpResult::Different,
            CmpResult::Same,
            CmpResult::Same,
        ];
        let relations: Vec<Relation> = (0..7)
            .map(|i| relation(&letters[i], &letters[i + 1], cmps[i]))
            .collect();

        let groups = GroupFolder::new(true).fold(&paths, relations).unwrap();
        let grouped: Vec<Vec<String>> = groups
            .iter()
            .map(|g| {
                g.paths()
                    .iter()
                    .map(|p| p.to_string_lossy().into_owned())
                    .collect()
            })
            .collect();
        assert_eq!(
            grouped,
            vec![
                vec!["a", "b", "c"],
                vec!["d", "e"],
                vec!["f", "g", "h"],
            ]
        );
    }

    #[test]
    fn broken_chain_is_invariant_violation() {
        let paths = vec![path("a"), path("b"), path("c")];
        let relations = vec![
            relation("a", "b", CmpResult::Same),
            relation("x", "c", CmpResult::Same),
        ];
        let err = GroupFolder::new(false).fold(&paths, relations).unwrap_err();
        assert!(matches!(err, PruneError::InvariantViolation { .. }));
    }

    #[test]
    fn error_relations_fold_as_different() {
        let paths = vec![path("a"), path("b"), path("c")];
        let relations = vec![
            relation("a", "b", CmpResult::Error),
            relation("b", "c", CmpResult::Same),
        ];
        let groups = GroupFolder::new(true).fold(&paths, relations).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].paths(), &[path("a")]);
        assert_eq!(groups[1].paths(), &[path("b"), path("c")]);
    }
}
