//! The plan builder: converts groups into a deletion/move plan under the
//! `keep_both` policy knob.
//!
//! Grounded in `compute_instructions`/`relations_to_instructions` in
//! `bleanser.core.processor` (referenced from `tests/test_hypothesis.py`).
//! The two top-level scripts in that original tool disagreed on
//! `keep_both` semantics; this adopts the later, list-based definition —
//! the literal slice rule (`removable = g[1:|g|-1]` when `keep_both`, else
//! `g[0:|g|-1]`) is what's implemented here; see the worked cross-check in
//! this module's tests and `DESIGN.md`.

use std::path::PathBuf;

use crate::pipeline::group::Group;

/// One decision per input path: the final output of the core pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Retain this path untouched.
    Keep(PathBuf),
    /// This path is redundant and safe to delete.
    Remove(PathBuf),
    /// This path is redundant and should be relocated to `dest` rather than
    /// deleted outright. Produced by the `apply` module when running in
    /// move mode, never by the plan builder itself — mode is selected by
    /// the caller, not the engine.
    Move(PathBuf, PathBuf),
}

impl Instruction {
    /// The path this instruction concerns, regardless of variant.
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Keep(p) | Self::Remove(p) | Self::Move(p, _) => p,
        }
    }
}

/// Builds a plan from a sequence of groups under the `keep_both` policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanBuilder {
    keep_both: bool,
}

impl PlanBuilder {
    /// Build a plan builder with the given `keep_both` policy.
    #[must_use]
    pub const fn new(keep_both: bool) -> Self {
        Self { keep_both }
    }

    /// Convert `groups` into one instruction per input path, in input order.
    #[must_use]
    pub fn build(&self, groups: &[Group]) -> Vec<Instruction> {
        let mut instructions = Vec::new();
        for group in groups {
            instructions.extend(self.plan_group(group));
        }
        instructions
    }

    /// Plan a single group.
    fn plan_group(&self, group: &Group) -> Vec<Instruction> {
        let paths = group.paths();
        if paths.len() <= 1 {
            return paths.iter().cloned().map(Instruction::Keep).collect();
        }

        // removable = g[1:|g|-1] when keep_both, else g[0:|g|-1].
        // The last index is never in either range, so the final element is
        // always kept regardless of policy.
        let removable_start = usize::from(self.keep_both);
        let removable_end = paths.len() - 1;

        paths
            .iter()
            .enumerate()
            .map(|(index, path)| {
                if index >= removable_start && index < removable_end {
                    Instruction::Remove(path.clone())
                } else {
                    Instruction::Keep(path.clone())
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(name: &str) -> PathBuf {
        PathBuf::from(name)
    }

    fn group(names: &[&str]) -> Group {
        Group::new(names.iter().map(|n| path(n)).collect()).unwrap()
    }

    #[test]
    fn singleton_group_is_always_kept() {
        let groups = vec![group(&["a"])];
        let plan = PlanBuilder::new(false).build(&groups);
        assert_eq!(plan, vec![Instruction::Keep(path("a"))]);
    }

    #[test]
    fn single_input_group_is_kept_regardless_of_policy() {
        let groups = vec![group(&["only"])];
        let plan = PlanBuilder::new(true).build(&groups);
        assert_eq!(plan, vec![Instruction::Keep(path("only"))]);
    }

    /// N identical copies fold into one group; keep_both=false
    /// keeps only the last.
    #[test]
    fn identical_run_keep_both_false_keeps_only_last() {
        let g = group(&["a", "b", "c", "d"]);
        let plan = PlanBuilder::new(false).build(std::slice::from_ref(&g));
        assert_eq!(
            plan,
            vec![
                Instruction::Remove(path("a")),
                Instruction::Remove(path("b")),
                Instruction::Remove(path("c")),
                Instruction::Keep(path("d")),
            ]
        );
    }

    /// Same identical run, keep_both=true keeps first and last.
    #[test]
    fn identical_run_keep_both_true_keeps_first_and_last() {
        let g = group(&["a", "b", "c", "d"]);
        let plan = PlanBuilder::new(true).build(std::slice::from_ref(&g));
        assert_eq!(
            plan,
            vec![
                Instruction::Keep(path("a")),
                Instruction::Remove(path("b")),
                Instruction::Remove(path("c")),
                Instruction::Keep(path("d")),
            ]
        );
    }

    /// delete_dominated=false / keep_both=true:
    /// groups [a],[b],[c,d,e,f],[g],[h] -> removed = [d, e].
    #[test]
    fn mixed_groups_keep_both_true() {
        let groups = vec![
            group(&["a"]),
            group(&["b"]),
            group(&["c", "d", "e", "f"]),
            group(&["g"]),
            group(&["h"]),
        ];
        let plan = PlanBuilder::new(true).build(&groups);
        let removed: Vec<&PathBuf> = plan
            .iter()
            .filter_map(|instruction| match instruction {
                Instruction::Remove(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(removed, vec![&path("d"), &path("e")]);
    }

    /// Same corpus, delete_dominated=true / keep_both=false:
    /// groups [a],[b,c,d,e,f],[g,h] -> removed = [b,c,d,e,g].
    #[test]
    fn mixed_groups_delete_dominated_true_keep_both_false() {
        let groups = vec![
            group(&["a"]),
            group(&["b", "c", "d", "e", "f"]),
            group(&["g", "h"]),
        ];
        let plan = PlanBuilder::new(false).build(&groups);
        let removed: Vec<&PathBuf> = plan
            .iter()
            .filter_map(|instruction| match instruction {
                Instruction::Remove(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(
            removed,
            vec![&path("b"), &path("c"), &path("d"), &path("e"), &path("g")]
        );
    }

    #[test]
    fn plan_covers_every_input_path_exactly_once() {
        let groups = vec![group(&["a", "b"]), group(&["c"]), group(&["d", "e", "f"])];
        let plan = PlanBuilder::new(false).build(&groups);
        let paths: Vec<&PathBuf> = plan.iter().map(Instruction::path).collect();
        assert_eq!(
            paths,
            vec![
                &path("a"),
                &path("b"),
                &path("c"),
                &path("d"),
                &path("e"),
                &path("f"),
            ]
        );
    }

    #[test]
    fn keep_both_never_removes_fewer_paths_than_keep_both_false() {
        let g = group(&["a", "b", "c", "d", "e"]);
        let removed_count = |keep_both: bool| {
            PlanBuilder::new(keep_both)
                .build(std::slice::from_ref(&g))
                .iter()
                .filter(|i| matches!(i, Instruction::Remove(_)))
                .count()
        };
        assert!(removed_count(false) >= removed_count(true));
    }
}
