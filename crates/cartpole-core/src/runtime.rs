//! Process-wide execution runtime, initialized at most once.
//!
//! The training driver guards backend startup behind this singleton so that
//! repeated driver calls in one process never double-initialize. There is no
//! explicit teardown; the runtime lives until process exit.

use std::sync::OnceLock;
use time::OffsetDateTime;

#[derive(Debug)]
pub struct Runtime {
    suppress_logs: bool,
    started: OffsetDateTime,
}

impl Runtime {
    /// Whether best-effort warnings (swallowed iteration failures) are muted.
    #[must_use]
    pub fn suppresses_logs(&self) -> bool {
        self.suppress_logs
    }

    #[must_use]
    pub fn started(&self) -> OffsetDateTime {
        self.started
    }
}

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Initialize the runtime on first use; later calls return the existing
/// instance and ignore `suppress_logs`.
pub fn ensure_initialized(suppress_logs: bool) -> &'static Runtime {
    RUNTIME.get_or_init(|| Runtime {
        suppress_logs,
        started: OffsetDateTime::now_utc(),
    })
}

#[must_use]
pub fn is_initialized() -> bool {
    RUNTIME.get().is_some()
}
