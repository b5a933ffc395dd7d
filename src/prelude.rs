//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use snapshot_prune::prelude::*;
//! ```

// Core
pub use crate::core::config::PipelineConfig;
pub use crate::core::errors::{PruneError, Result};

// Cleaner interface
pub use crate::cleaner::{Cleaner, CleanerRegistry, IdentityCleaner, ScopedArtifact};

// Comparator
pub use crate::compare::{CmpResult, Comparator, Diff, NoiseFilter};

// Pipeline
pub use crate::pipeline::{Group, GroupFolder, Instruction, PipelineOutput, PlanBuilder, Relation};

// Apply
pub use crate::apply::{ApplyReport, Mode};
