//! PRN-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::PathBuf;

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, PruneError>;

/// Top-level error type for the snapshot-prune engine.
#[derive(Debug, Error)]
pub enum PruneError {
    #[error("[PRN-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[PRN-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[PRN-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[PRN-2001] cleaner failed for {path}: {details}")]
    CleanerFailed { path: PathBuf, details: String },

    #[error("[PRN-2002] comparator failed comparing {before} and {after}: {details}")]
    ComparatorFailed {
        before: PathBuf,
        after: PathBuf,
        details: String,
    },

    #[error("[PRN-2003] unknown cleaner: {name}")]
    UnknownCleaner { name: String },

    #[error("[PRN-3001] relation stream invariant violated: {details}")]
    InvariantViolation { details: String },

    #[error("[PRN-3002] group folder invariant violated: {details}")]
    EmptyGroup { details: String },

    #[error("[PRN-4001] failed to apply instruction for {path}: {details}")]
    ApplyFailed { path: PathBuf, details: String },

    #[error("[PRN-9001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[PRN-9900] runtime failure: {details}")]
    Runtime { details: String },
}

impl PruneError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "PRN-1001",
            Self::MissingConfig { .. } => "PRN-1002",
            Self::ConfigParse { .. } => "PRN-1003",
            Self::CleanerFailed { .. } => "PRN-2001",
            Self::ComparatorFailed { .. } => "PRN-2002",
            Self::UnknownCleaner { .. } => "PRN-2003",
            Self::InvariantViolation { .. } => "PRN-3001",
            Self::EmptyGroup { .. } => "PRN-3002",
            Self::ApplyFailed { .. } => "PRN-4001",
            Self::Io { .. } => "PRN-9001",
            Self::Runtime { .. } => "PRN-9900",
        }
    }

    /// Whether this failure is the kind the relation producer downgrades to
    /// a `CmpResult::Error` relation instead of aborting the run — everything
    /// but invariant violations is safe to continue past.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::CleanerFailed { .. } | Self::ComparatorFailed { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for PruneError {
    fn from(value: serde_json::Error) -> Self {
        Self::ConfigParse {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for PruneError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
