#![deny(unsafe_code)]

//! snapshot-prune — prunes redundancy from a chronologically ordered series
//! of backup snapshots of the same logical dataset.
//!
//! For each adjacent pair of snapshots, the engine decides whether the
//! later one adds new information; snapshots that add nothing are safe to
//! delete. The core pipeline is a streaming
//! normalise-compare-group-prune loop:
//!
//! 1. [`cleaner`] — a pluggable per-format normaliser, scoped so its
//!    temporary state is always released.
//! 2. [`compare`] — a three-valued comparator classifying adjacent cleaned
//!    views as `SAME`, `DOMINATES`, `DIFFERENT`, or `ERROR`.
//! 3. [`pipeline::relation`] — a lazy relation stream producer that bounds
//!    on-disk working set, with an optional parallel fan-out.
//! 4. [`pipeline::group`] — folds relations into equivalence groups.
//! 5. [`pipeline::plan`] — derives a keep/remove/move plan from groups.
//!
//! [`apply`] realises a plan against the real filesystem; [`cli`] is the
//! command-line surface built on top of all of the above. Both are ambient
//! concerns, not part of the core pipeline (see spec's §1 scope note).

pub mod apply;
pub mod cleaner;
#[cfg(feature = "cli")]
pub mod cli;
pub mod compare;
pub mod core;
#[cfg(feature = "cli")]
pub mod logging;
pub mod pipeline;
pub mod prelude;
