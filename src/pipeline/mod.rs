//! The core normalise-compare-group-prune pipeline: lazily materialise
//! cleaned views, classify adjacent relations, fold them into equivalence
//! groups, and derive a deletion plan.
//!
//! Data flows strictly forward: paths -> (clean, clean) pairs -> relations
//! -> groups -> plan. [`run`] wires the four stages together the way the
//! CLI, which sits outside this core, is expected to.

pub mod group;
pub mod plan;
pub mod relation;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use crate::cleaner::Cleaner;
use crate::compare::{Comparator, NoiseFilter};
use crate::core::config::PipelineConfig;
use crate::core::errors::{PruneError, Result};

pub use group::{Group, GroupFolder};
pub use plan::{Instruction, PlanBuilder};
pub use relation::{produce_relations, Relation};

/// The result of running the full pipeline over one input sequence.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// One relation per adjacent input pair (`N - 1` for `N` inputs).
    pub relations: Vec<Relation>,
    /// The input sequence folded into equivalence groups.
    pub groups: Vec<Group>,
    /// One instruction per input path, in input order.
    pub instructions: Vec<Instruction>,
}

/// Run the whole pipeline: clean, compare, group, plan.
///
/// Cleaning happens inside a process-managed temporary directory that is
/// removed in full when this function returns, win or lose — the engine's
/// own scope, one level above each individual cleaner's scope, so every
/// scope unwinds cleanly.
///
/// # Errors
/// Propagates [`PruneError::InvariantViolation`] from the relation producer
/// or group folder, and [`PruneError::InvalidConfig`] if `config`'s noise
/// pattern fails to compile.
#[tracing::instrument(skip(paths, cleaner, config), fields(inputs = paths.len()))]
pub fn run(paths: &[PathBuf], cleaner: Arc<dyn Cleaner>, config: &PipelineConfig) -> Result<PipelineOutput> {
    config.validate()?;

    let scratch = TempDir::new().map_err(|source| PruneError::io(std::env::temp_dir(), source))?;
    run_in(paths, cleaner, config, scratch.path())
}

/// As [`run`], but cleans into a caller-supplied working directory instead
/// of a fresh temporary one. Exposed so tests (and debugging, per the
/// Python original's `_wdir` escape hatch in `relations()`) can inspect
/// on-disk working-set size during a run.
///
/// # Errors
/// See [`run`].
pub fn run_in(
    paths: &[PathBuf],
    cleaner: Arc<dyn Cleaner>,
    config: &PipelineConfig,
    wdir: &Path,
) -> Result<PipelineOutput> {
    let noise = NoiseFilter::new(&config.noise_pattern)?;
    let comparator = Comparator::new(noise, config.fast_track_threshold_bytes);

    let max_workers = if config.max_workers == 0 {
        Some(0)
    } else {
        Some(config.max_workers)
    };

    let relations = produce_relations(paths, cleaner, comparator, wdir, max_workers)?;
    let groups = GroupFolder::new(config.delete_dominated).fold(paths, relations.clone())?;
    let instructions = PlanBuilder::new(config.keep_both).build(&groups);

    Ok(PipelineOutput {
        relations,
        groups,
        instructions,
    })
}
