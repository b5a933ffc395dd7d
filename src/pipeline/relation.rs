//! The relation stream producer: walks an ordered input sequence, invokes the
//! cleaner with bounded disk footprint, and emits a lazy sequence of
//! `Relation` records.
//!
//! Grounded in `bleanser.core.processor.relations`/`_relations_serial`: the
//! Python original holds an `ExitStack`-scoped cleaned view per input and
//! unlinks the older of the two dumps as soon as its relation has been
//! emitted. `SerialRelations` reproduces that lazily as a Rust `Iterator`
//! instead of a generator; `parallel_relations` reproduces the
//! chunk-and-stitch fan-out in `relations` using OS threads instead of a
//! `ThreadPoolExecutor`.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use crossbeam_channel as channel;

use crate::cleaner::{Cleaner, ScopedArtifact};
use crate::compare::{CmpResult, Comparator, Diff};
use crate::core::errors::{PruneError, Result};

/// One relation between two adjacent inputs: `before` and `after` as they
/// appeared in the caller's ordering, plus the comparator's classification
/// of how `after` relates to `before`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// The earlier of the two inputs.
    pub before: PathBuf,
    /// The later of the two inputs.
    pub after: PathBuf,
    /// The comparator's classification plus optional diff body.
    pub diff: Diff,
}

impl Relation {
    /// The conservative stitch relation inserted between two independently
    /// processed chunks in parallel mode: always a group boundary, never
    /// loses information.
    #[must_use]
    pub fn stitch(before: PathBuf, after: PathBuf) -> Self {
        Self {
            before,
            after,
            diff: Diff {
                cmp: CmpResult::Different,
                body: None,
            },
        }
    }
}

/// Outcome of cleaning a single input: either the scoped artifact, or the
/// stringified error that the engine downgrades to: a cleaner may fail,
/// the engine catches it, records an `ERROR` diff, and continues.
enum CleanOutcome {
    Ready(ScopedArtifact),
    Failed(String),
}

/// Lazily produces the relation stream for one contiguous chunk of the
/// input sequence, holding at most two cleaned artifacts on disk at a time
/// — the bounded-resources invariant this module's tests verify.
pub struct SerialRelations {
    cleaner: Arc<dyn Cleaner>,
    comparator: Comparator,
    wdir: PathBuf,
    remaining: VecDeque<PathBuf>,
    last: Option<(PathBuf, CleanOutcome)>,
}

impl SerialRelations {
    /// Build a serial relation iterator over `paths`, cleaning into `wdir`.
    #[must_use]
    pub fn new(
        paths: Vec<PathBuf>,
        cleaner: Arc<dyn Cleaner>,
        comparator: Comparator,
        wdir: PathBuf,
    ) -> Self {
        Self {
            cleaner,
            comparator,
            wdir,
            remaining: paths.into(),
            last: None,
        }
    }

    fn clean_one(&self, path: &Path) -> CleanOutcome {
        match self.cleaner.clean(path, &self.wdir) {
            Ok(artifact) => CleanOutcome::Ready(artifact),
            Err(error) => {
                // A recoverable (CleanerFailed) error is the expected shape
                // here; anything else still downgrades, but is worth
                // logging louder since it means a cleaner raised a kind of
                // error this boundary wasn't built to produce.
                if error.is_recoverable() {
                    tracing::warn!(path = %path.display(), %error, "cleaner failed, downgrading to ERROR");
                } else {
                    tracing::error!(path = %path.display(), %error, "cleaner failed with an unexpected error kind, downgrading to ERROR anyway");
                }
                CleanOutcome::Failed(error.to_string())
            }
        }
    }
}

impl Iterator for SerialRelations {
    type Item = Relation;

    fn next(&mut self) -> Option<Relation> {
        loop {
            let path = self.remaining.pop_front()?;
            let outcome = self.clean_one(&path);

            let Some((before_path, before_outcome)) = self.last.take() else {
                // First input: nothing to relate it to yet.
                self.last = Some((path, outcome));
                continue;
            };

            let diff = match (&before_outcome, &outcome) {
                (CleanOutcome::Ready(b), CleanOutcome::Ready(a)) => {
                    tracing::debug!(before = %before_path.display(), after = %path.display(), "comparing");
                    self.comparator.compare(b.path(), a.path())
                }
                _ => Diff::error(),
            };

            // `before_outcome` drops here, unlinking its artifact (if any)
            // immediately — before the next iteration cleans another input
            // — which is what bounds the working set to two artifacts.
            drop(before_outcome);

            tracing::info!(before = %before_path.display(), after = %path.display(), cmp = ?diff.cmp, "relation");

            self.last = Some((path.clone(), outcome));
            return Some(Relation {
                before: before_path,
                after: path,
                diff,
            });
        }
    }
}

/// Run the serial algorithm over `paths`, collecting every relation eagerly.
/// Used by each parallel worker: its chunk's relations must be forced into
/// a `Vec` before the chunk join, since handing back a lazy iterator across
/// a thread boundary would re-serialise the work.
fn relations_serial_vec(
    paths: Vec<PathBuf>,
    cleaner: Arc<dyn Cleaner>,
    comparator: Comparator,
    wdir: PathBuf,
) -> Vec<Relation> {
    SerialRelations::new(paths, cleaner, comparator, wdir).collect()
}

/// Split `paths` into `workers` contiguous, near-equal chunks, dropping any
/// empty chunk (mirrors `more_itertools.divide` in the Python original).
fn divide_into_chunks(paths: &[PathBuf], workers: usize) -> Vec<Vec<PathBuf>> {
    if workers == 0 || paths.is_empty() {
        return Vec::new();
    }
    let workers = workers.min(paths.len());
    let len = paths.len();
    let base = len / workers;
    let extra = len % workers;

    let mut chunks = Vec::with_capacity(workers);
    let mut start = 0;
    for i in 0..workers {
        let size = base + usize::from(i < extra);
        if size == 0 {
            continue;
        }
        chunks.push(paths[start..start + size].to_vec());
        start += size;
    }
    chunks
}

/// Produce the relation stream for the whole input sequence.
///
/// `max_workers == 0` (or `Some(0)`) selects fully synchronous execution
/// with no thread pool; `None` defaults to the host's logical CPU count,
/// capped at `paths.len()`.
///
/// # Errors
/// Returns [`PruneError::InvariantViolation`] if the emitted relation count
/// does not equal `paths.len() - 1`, an asserted post-condition.
pub fn produce_relations(
    paths: &[PathBuf],
    cleaner: Arc<dyn Cleaner>,
    comparator: Comparator,
    wdir: &Path,
    max_workers: Option<usize>,
) -> Result<Vec<Relation>> {
    if paths.len() < 2 {
        return Ok(Vec::new());
    }

    let workers = max_workers.unwrap_or_else(|| {
        std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
    });

    let relations = if workers <= 1 {
        tracing::info!(workers = 1, "running relation producer serially");
        relations_serial_vec(paths.to_vec(), cleaner, comparator, wdir.to_path_buf())
    } else {
        let chunks = divide_into_chunks(paths, workers);
        tracing::info!(workers = chunks.len(), "running relation producer in parallel");
        parallel_relations(chunks, cleaner, comparator, wdir)
    };

    let expected = paths.len() - 1;
    if relations.len() != expected {
        return Err(PruneError::InvariantViolation {
            details: format!(
                "expected {expected} relations for {} inputs, produced {}",
                paths.len(),
                relations.len()
            ),
        });
    }
    Ok(relations)
}

/// Run each chunk's serial algorithm on its own OS thread, then stitch the
/// per-chunk vectors together in chunk order with a synthetic `DIFFERENT`
/// relation between adjacent chunks.
///
/// Workers report back over a bounded `crossbeam-channel`, one worker per
/// in-flight slot, the same fan-out/fan-in shape `scanner::walker` uses for
/// directory traversal — backpressured rather than an unbounded queue of
/// pending chunk results.
fn parallel_relations(
    chunks: Vec<Vec<PathBuf>>,
    cleaner: Arc<dyn Cleaner>,
    comparator: Comparator,
    wdir: &Path,
) -> Vec<Relation> {
    let (tx, rx) = channel::bounded::<(usize, Vec<Relation>)>(chunks.len());

    let chunk_results: Vec<Vec<Relation>> = thread::scope(|scope| {
        for (index, chunk) in chunks.iter().enumerate() {
            let cleaner = Arc::clone(&cleaner);
            let comparator = comparator.clone();
            // Each worker owns a private subdirectory so concurrent
            // cleaners never contend over filenames: partitioned by
            // construction.
            let chunk_wdir = wdir.join(format!("chunk-{index}"));
            let chunk = chunk.clone();
            let tx = tx.clone();
            scope.spawn(move || {
                let _ = std::fs::create_dir_all(&chunk_wdir);
                let result = relations_serial_vec(chunk, cleaner, comparator, chunk_wdir);
                let _ = tx.send((index, result));
            });
        }
        drop(tx);

        let mut by_index: Vec<Option<Vec<Relation>>> = (0..chunks.len()).map(|_| None).collect();
        while let Ok((index, result)) = rx.recv() {
            by_index[index] = Some(result);
        }
        by_index.into_iter().map(Option::unwrap_or_default).collect()
    });

    let mut out = Vec::new();
    let mut last_tail: Option<PathBuf> = None;
    for (chunk, chunk_relations) in chunks.iter().zip(chunk_results) {
        let Some(head) = chunk.first().cloned() else {
            continue;
        };
        if let Some(tail) = last_tail.take() {
            out.push(Relation::stitch(tail, head));
        }
        let tail = chunk.last().cloned();
        out.extend(chunk_relations);
        last_tail = tail;
    }
    out
}
