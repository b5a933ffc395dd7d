//! Structured logging init. This engine has no daemon/observability layer
//! of its own — no `logger::jsonl`/`sqlite` audit trail — just ordinary
//! structured logging for the engine itself.
//!
//! Grounded in `saworbit-orbit`'s `logging::init_logging`: `tracing` +
//! `tracing-subscriber` with an `EnvFilter` that defaults to a crate-scoped
//! level and can be overridden with `RUST_LOG`. Unlike a dual SQLite/JSONL
//! audit writer tied to a daemon/ballast domain, this engine has no
//! persistent daemon, so a single stdout layer is enough.

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialise stdout logging at `level`, honouring `RUST_LOG` if set.
pub fn init(level: Level) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("snapshot_prune={level}")));

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}
