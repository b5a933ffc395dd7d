//! The cleaner interface: pluggable per-format normalisers plus the
//! scoped-artifact guard that bounds disk usage to the artifacts actually in
//! flight.
//!
//! Grounded in `bleanser.core.processor`'s `Cleaner` protocol and its
//! `ExitStack`-scoped cleanup in `_relations_serial`: there, every cleaned
//! view is registered with a context manager that unlinks it on exit, no
//! matter which code path leaves the `with` block. `ScopedArtifact` is the
//! same guarantee expressed as a `Drop` impl instead of a context manager.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::core::errors::{PruneError, Result};

/// A cleaned view of one input snapshot, scoped to a working directory.
///
/// Holds no file handle — only a path — but guarantees the path is removed
/// exactly once, whether the caller calls [`ScopedArtifact::release`]
/// explicitly or simply lets it drop. Dropping without releasing is the
/// normal case: the relation producer holds two of these at a time and lets
/// the older one fall out of scope once its relation has been emitted.
#[derive(Debug)]
pub struct ScopedArtifact {
    path: PathBuf,
    released: bool,
}

impl ScopedArtifact {
    /// Wrap a path a cleaner has just written. The caller is responsible
    /// for having actually created something at `path`.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self {
            path,
            released: false,
        }
    }

    /// Path to the cleaned artifact on disk.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unlink the artifact now. Idempotent: calling it twice, or calling it
    /// and then dropping the guard, removes the file at most once.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match fs::symlink_metadata(&self.path) {
            Ok(meta) if meta.is_dir() => {
                let _ = fs::remove_dir_all(&self.path);
            }
            Ok(_) => {
                let _ = fs::remove_file(&self.path);
            }
            Err(_) => {}
        }
    }
}

impl Drop for ScopedArtifact {
    fn drop(&mut self) {
        self.release();
    }
}

/// A per-format normaliser: strips noise (timestamps, auto-increment ids,
/// volatile metadata) from an input snapshot, writing the cleaned result
/// somewhere inside `wdir`.
///
/// Implementations must be deterministic: the same input bytes must always
/// produce the same cleaned output bytes, since the comparator relies on
/// byte-for-byte equality as its fast path.
pub trait Cleaner: Send + Sync {
    /// Human-readable name this cleaner is registered under.
    fn name(&self) -> &str;

    /// Produce a cleaned view of `input`, writing it inside `wdir`.
    ///
    /// # Errors
    /// Returns [`PruneError::CleanerFailed`] if the input cannot be read or
    /// the cleaned view cannot be written.
    fn clean(&self, input: &Path, wdir: &Path) -> Result<ScopedArtifact>;
}

/// The identity cleaner: copies the input byte-for-byte into `wdir`.
///
/// Used as the default when no format-specific cleaner applies, and as the
/// baseline for the bounded-resources property test — mirrors
/// `test_bounded_resources`'s `ident` cleaner in the original tool.
#[derive(Debug, Default)]
pub struct IdentityCleaner {
    counter: AtomicU64,
}

impl IdentityCleaner {
    #[must_use]
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }
}

impl Cleaner for IdentityCleaner {
    fn name(&self) -> &str {
        "identity"
    }

    fn clean(&self, input: &Path, wdir: &Path) -> Result<ScopedArtifact> {
        let id = self.counter.fetch_add(1, Ordering::Relaxed);
        let stem = input
            .file_name()
            .map_or_else(|| "artifact".to_string(), |n| n.to_string_lossy().into_owned());
        let out = wdir.join(format!("{id:08x}-{stem}"));
        fs::copy(input, &out).map_err(|source| PruneError::CleanerFailed {
            path: input.to_path_buf(),
            details: source.to_string(),
        })?;
        Ok(ScopedArtifact::new(out))
    }
}

/// Name-keyed lookup of cleaners, used by the CLI to resolve `--cleaner
/// NAME` against the built-in set. The engine ships only generic cleaners;
/// format-specific ones are an external collaborator's concern.
#[derive(Clone, Default)]
pub struct CleanerRegistry {
    cleaners: HashMap<String, Arc<dyn Cleaner>>,
}

impl CleanerRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the built-in `identity` cleaner.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(IdentityCleaner::new()));
        registry
    }

    /// Register a cleaner under its own `name()`, replacing any previous
    /// registration with the same name.
    pub fn register(&mut self, cleaner: Arc<dyn Cleaner>) {
        self.cleaners.insert(cleaner.name().to_string(), cleaner);
    }

    /// Look up a cleaner by name.
    ///
    /// # Errors
    /// Returns [`PruneError::UnknownCleaner`] if no cleaner is registered
    /// under `name`.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Cleaner>> {
        self.cleaners
            .get(name)
            .cloned()
            .ok_or_else(|| PruneError::UnknownCleaner {
                name: name.to_string(),
            })
    }

    /// Names of all registered cleaners, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.cleaners.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
