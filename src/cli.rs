//! `snprune` CLI surface: mode selection, worker count, input globbing, and
//! cleaner selection. Explicitly outside the core pipeline boundary — this
//! module only wires user input onto [`crate::pipeline`] and
//! [`crate::apply`].
//!
//! Grounded in `cli_app.rs`'s `clap` derive `Cli` with global flags
//! (`--config`, `--json`, `--verbose`/`--quiet`) and a subcommand dispatch,
//! reproduced here without the daemon/ballast/TUI subcommands that don't
//! transfer to this domain.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::Level;

use crate::apply::{self, ApplyReport, Mode};
use crate::cleaner::CleanerRegistry;
use crate::core::config::PipelineConfig;
use crate::core::errors::{PruneError, Result};
use crate::pipeline::{self, Instruction, PipelineOutput};

/// Prunes redundant backup snapshots of a dataset.
#[derive(Debug, Parser)]
#[command(
    name = "snprune",
    author,
    version,
    about = "Prune redundant backup snapshots, keeping every witnessed change",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Glob pattern(s) selecting input snapshots, matched and then sorted
    /// lexicographically (relies on filenames that sort chronologically,
    /// mirroring `sorted(data.glob('*.json'))` in the original test suite).
    #[arg(required = true)]
    pub inputs: Vec<String>,

    /// Name of the registered cleaner to use.
    #[arg(long, default_value = "identity")]
    pub cleaner: String,

    /// Report the plan without touching the filesystem (default mode).
    #[arg(long, conflicts_with_all = ["remove", "move_to"])]
    pub dry: bool,

    /// Delete every path the plan marks as removable.
    #[arg(long, conflicts_with_all = ["dry", "move_to"])]
    pub remove: bool,

    /// Move every path the plan marks as removable into DEST, preserving
    /// basenames (collisions get a numeric suffix).
    #[arg(long, value_name = "DEST", conflicts_with_all = ["dry", "remove"])]
    pub move_to: Option<PathBuf>,

    /// Worker count for the parallel relation producer (0 = fully serial).
    /// Defaults to the config value, which defaults to the host's CPU count.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Preserve both endpoints of each equivalence run instead of only the
    /// latest.
    #[arg(long)]
    pub keep_both: bool,

    /// Fold DOMINATES into SAME for grouping purposes.
    #[arg(long)]
    pub delete_dominated: bool,

    /// Override config file path.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Emit the plan as JSON instead of a human-readable table.
    #[arg(long)]
    pub json: bool,

    /// Increase verbosity.
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Quiet mode (errors only).
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    fn log_level(&self) -> Level {
        if self.quiet {
            Level::ERROR
        } else if self.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }

    fn mode(&self) -> Mode {
        if self.remove {
            Mode::Remove
        } else if let Some(dest) = &self.move_to {
            Mode::Move(crate::core::paths::resolve_absolute_path(dest))
        } else {
            Mode::Dry
        }
    }
}

/// Expand and sort the input glob patterns into a single ordered path list.
///
/// # Errors
/// Returns [`PruneError::InvalidConfig`] if a pattern fails to parse, or
/// [`PruneError::Io`] if a matched entry cannot be read.
fn resolve_inputs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        let matches = glob::glob(pattern).map_err(|error| PruneError::InvalidConfig {
            details: format!("invalid glob pattern {pattern:?}: {error}"),
        })?;
        for entry in matches {
            let path = entry.map_err(|error| {
                let path = error.path().to_path_buf();
                let source = std::io::Error::new(error.error().kind(), error.to_string());
                PruneError::io(path, source)
            })?;
            if path.is_file() {
                paths.push(path);
            }
        }
    }
    paths.sort();
    paths.dedup();
    Ok(paths)
}

/// Run the CLI end to end: resolve inputs, build the config, run the
/// pipeline, and report or apply the resulting plan.
///
/// # Errors
/// Returns any [`PruneError`] surfaced while resolving inputs, loading
/// config, running the pipeline, or applying the plan.
pub fn run(cli: &Cli) -> Result<()> {
    crate::logging::init(cli.log_level());

    let mut config = PipelineConfig::load(cli.config.as_deref())?;
    if let Some(workers) = cli.workers {
        config.max_workers = workers;
    }
    config.keep_both |= cli.keep_both;
    config.delete_dominated |= cli.delete_dominated;
    config.validate()?;

    let paths = resolve_inputs(&cli.inputs)?;
    if paths.is_empty() {
        tracing::warn!("no input snapshots matched the given pattern(s)");
        return Ok(());
    }
    tracing::info!(count = paths.len(), "resolved input snapshots");

    let registry = CleanerRegistry::with_defaults();
    let cleaner = registry.get(&cli.cleaner)?;

    let output = pipeline::run(&paths, Arc::clone(&cleaner), &config)?;
    let mode = cli.mode();
    let report = apply::apply_instructions(&output.instructions, &mode)?;

    if cli.json {
        print_json(&output, &report);
    } else {
        print_table(paths.len(), &output, &report, &mode);
    }

    Ok(())
}

fn print_table(input_count: usize, output: &PipelineOutput, report: &ApplyReport, mode: &Mode) {
    println!(
        "{input_count} inputs -> {} relations -> {} groups",
        output.relations.len(),
        output.groups.len()
    );
    // Printed from the realised report, not the raw plan: in `Mode::Move`
    // this is where a `Remove` entry actually shows up as the
    // `Instruction::Move(path, dest)` that was performed.
    for instruction in &report.instructions {
        match instruction {
            Instruction::Keep(p) => println!("KEEP   {}", p.display()),
            Instruction::Remove(p) => println!("REMOVE {}", p.display()),
            Instruction::Move(p, dest) => {
                println!("MOVE   {} -> {}", p.display(), dest.display());
            }
        }
    }
    match mode {
        Mode::Dry => println!(
            "\n(dry run: {} kept, {} would be removed, {} would be moved)",
            report.kept.len(),
            report.removed.len(),
            report.moved.len()
        ),
        Mode::Remove => println!(
            "\n{} kept, {} removed",
            report.kept.len(),
            report.removed.len()
        ),
        Mode::Move(dest) => println!(
            "\n{} kept, {} moved to {}",
            report.kept.len(),
            report.moved.len(),
            dest.display()
        ),
    }
}

fn print_json(output: &PipelineOutput, report: &ApplyReport) {
    let instructions: Vec<serde_json::Value> = report
        .instructions
        .iter()
        .map(|instruction| match instruction {
            Instruction::Keep(p) => serde_json::json!({"action": "keep", "path": p}),
            Instruction::Remove(p) => serde_json::json!({"action": "remove", "path": p}),
            Instruction::Move(p, dest) => {
                serde_json::json!({"action": "move", "path": p, "dest": dest})
            }
        })
        .collect();
    let payload = serde_json::json!({
        "relations": output.relations.len(),
        "groups": output.groups.len(),
        "instructions": instructions,
        "kept": report.kept.len(),
        "removed": report.removed.len(),
        "moved": report.moved.len(),
    });
    println!("{}", serde_json::to_string_pretty(&payload).unwrap_or_default());
}
