//! The apply step: turns a built `Vec<Instruction>` into real filesystem
//! operations. Deliberately outside the core pipeline boundary — the engine
//! emits a plan, it never touches the filesystem itself.
//!
//! Grounded in `apply_instructions` in `bleanser.core.processor` (referenced
//! from `tests/test_hypothesis.py`'s `Remove`/`Move`/`Dry` modes), with
//! collision handling in the style of `scanner::deletion`'s safety
//! pre-flight. [`apply_instructions`] keeps that name.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::errors::{PruneError, Result};
use crate::core::paths::resolve_absolute_path;
use crate::pipeline::plan::Instruction;

/// How a built plan should be realised against the filesystem — selected
/// by the CLI, not the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Report the plan; no filesystem effect.
    Dry,
    /// Unlink every `Remove` path.
    Remove,
    /// Move every `Remove` path into `dest`, preserving its basename.
    Move(PathBuf),
}

/// Summary of what [`apply_instructions`] did (or would do, in dry mode).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Paths left untouched.
    pub kept: Vec<PathBuf>,
    /// Paths unlinked (or that dry-run would unlink).
    pub removed: Vec<PathBuf>,
    /// `(source, destination)` pairs moved (or that dry-run would move).
    pub moved: Vec<(PathBuf, PathBuf)>,
    /// The realised instruction for every input path, in input order. In
    /// `Mode::Move`, a plan's `Remove` entries are resolved here into the
    /// actual `Instruction::Move(path, dest)` that was (or would be)
    /// performed — this is the one place that variant is ever constructed;
    /// the plan builder itself never produces `Move`.
    pub instructions: Vec<Instruction>,
}

/// Apply `instructions` under `mode`.
///
/// # Errors
/// Returns [`PruneError::ApplyFailed`] if a filesystem operation fails —
/// plan-application failures are reported by the applier, not the core.
pub fn apply_instructions(instructions: &[Instruction], mode: &Mode) -> Result<ApplyReport> {
    let mut report = ApplyReport::default();

    if *mode == Mode::Dry {
        for instruction in instructions {
            match instruction {
                Instruction::Keep(p) => report.kept.push(p.clone()),
                Instruction::Remove(p) => report.removed.push(p.clone()),
                Instruction::Move(p, dest) => report.moved.push((p.clone(), dest.clone())),
            }
            report.instructions.push(instruction.clone());
        }
        return Ok(report);
    }

    for instruction in instructions {
        match instruction {
            Instruction::Keep(path) => {
                report.kept.push(path.clone());
                report.instructions.push(Instruction::Keep(path.clone()));
            }
            Instruction::Remove(path) => match mode {
                Mode::Dry => unreachable!("handled above"),
                Mode::Remove => {
                    fs::remove_file(path).map_err(|source| PruneError::ApplyFailed {
                        path: path.clone(),
                        details: source.to_string(),
                    })?;
                    tracing::info!(path = %path.display(), "removed");
                    report.removed.push(path.clone());
                    report.instructions.push(Instruction::Remove(path.clone()));
                }
                Mode::Move(dest) => {
                    let target = move_destination(dest, path)?;
                    fs::rename(path, &target).map_err(|source| PruneError::ApplyFailed {
                        path: path.clone(),
                        details: source.to_string(),
                    })?;
                    tracing::info!(path = %path.display(), dest = %target.display(), "moved");
                    report.moved.push((path.clone(), target.clone()));
                    report.instructions.push(Instruction::Move(path.clone(), target));
                }
            },
            Instruction::Move(path, dest) => {
                fs::rename(path, dest).map_err(|source| PruneError::ApplyFailed {
                    path: path.clone(),
                    details: source.to_string(),
                })?;
                report.moved.push((path.clone(), dest.clone()));
                report.instructions.push(Instruction::Move(path.clone(), dest.clone()));
            }
        }
    }

    Ok(report)
}

/// Resolve a collision-free destination inside `dest` for `source`,
/// preserving `source`'s basename and appending a numeric suffix
/// (`name (1).ext`, `name (2).ext`, ...) if that basename is already taken.
///
/// `dest` is canonicalised via [`resolve_absolute_path`] first, so a
/// relative `--move` destination behaves the same regardless of which
/// directory the caller happened to be standing in when it built the plan.
fn move_destination(dest: &Path, source: &Path) -> Result<PathBuf> {
    let dest = resolve_absolute_path(dest);
    let dest = dest.as_path();
    fs::create_dir_all(dest).map_err(|e| PruneError::io(dest, e))?;

    let file_name = source
        .file_name()
        .ok_or_else(|| PruneError::ApplyFailed {
            path: source.to_path_buf(),
            details: "source path has no file name".to_string(),
        })?
        .to_string_lossy()
        .into_owned();

    let candidate = dest.join(&file_name);
    if !candidate.exists() {
        return Ok(candidate);
    }

    let path = Path::new(&file_name);
    let stem = path
        .file_stem()
        .map_or_else(|| file_name.clone(), |s| s.to_string_lossy().into_owned());
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());

    for suffix in 1..10_000 {
        let candidate_name = ext.as_ref().map_or_else(
            || format!("{stem} ({suffix})"),
            |ext| format!("{stem} ({suffix}).{ext}"),
        );
        let candidate = dest.join(candidate_name);
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(PruneError::ApplyFailed {
        path: source.to_path_buf(),
        details: format!("could not find a free destination name under {}", dest.display()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str) -> PathBuf {
        let p = dir.join(name);
        fs::write(&p, b"x").unwrap();
        p
    }

    #[test]
    fn dry_mode_performs_no_io() {
        let dir = tempfile::tempdir().unwrap();
        let kept = write(dir.path(), "kept.txt");
        let removed = write(dir.path(), "removed.txt");
        let instructions = vec![
            Instruction::Keep(kept.clone()),
            Instruction::Remove(removed.clone()),
        ];
        let report = apply_instructions(&instructions, &Mode::Dry).unwrap();
        assert!(kept.exists());
        assert!(removed.exists());
        assert_eq!(report.kept, vec![kept]);
        assert_eq!(report.removed, vec![removed]);
    }

    #[test]
    fn remove_mode_unlinks_files() {
        let dir = tempfile::tempdir().unwrap();
        let removed = write(dir.path(), "gone.txt");
        let instructions = vec![Instruction::Remove(removed.clone())];
        apply_instructions(&instructions, &Mode::Remove).unwrap();
        assert!(!removed.exists());
    }

    #[test]
    fn remove_mode_reports_missing_file_as_apply_failed() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.txt");
        let instructions = vec![Instruction::Remove(missing)];
        let err = apply_instructions(&instructions, &Mode::Remove).unwrap_err();
        assert!(matches!(err, PruneError::ApplyFailed { .. }));
    }

    #[test]
    fn move_mode_relocates_to_dest_preserving_basename() {
        let dir = tempfile::tempdir().unwrap();
        let source = write(dir.path(), "old.json");
        let dest = dir.path().join("archive");
        let instructions = vec![Instruction::Remove(source.clone())];
        let report = apply_instructions(&instructions, &Mode::Move(dest.clone())).unwrap();
        assert!(!source.exists());
        assert!(dest.join("old.json").exists());
        assert_eq!(report.moved, vec![(source, dest.join("old.json"))]);
    }

    #[test]
    fn move_mode_disambiguates_name_collisions() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("archive");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("old.json"), b"existing").unwrap();

        let source = write(dir.path(), "old.json");
        let instructions = vec![Instruction::Remove(source.clone())];
        let report = apply_instructions(&instructions, &Mode::Move(dest.clone())).unwrap();
        assert_eq!(report.moved[0].1, dest.join("old (1).json"));
    }

    #[test]
    fn move_mode_realises_instruction_move_in_the_report() {
        let dir = tempfile::tempdir().unwrap();
        let kept = write(dir.path(), "kept.txt");
        let source = write(dir.path(), "old.json");
        let dest = dir.path().join("archive");
        let instructions = vec![Instruction::Keep(kept.clone()), Instruction::Remove(source.clone())];
        let report = apply_instructions(&instructions, &Mode::Move(dest.clone())).unwrap();
        assert_eq!(
            report.instructions,
            vec![
                Instruction::Keep(kept),
                Instruction::Move(source, dest.join("old.json")),
            ]
        );
    }

    #[test]
    fn dry_mode_preserves_existing_move_instructions_in_the_report() {
        let source = PathBuf::from("/tmp/old.json");
        let dest = PathBuf::from("/tmp/archive/old.json");
        let instructions = vec![Instruction::Move(source.clone(), dest.clone())];
        let report = apply_instructions(&instructions, &Mode::Dry).unwrap();
        assert_eq!(report.instructions, vec![Instruction::Move(source, dest)]);
    }
}
