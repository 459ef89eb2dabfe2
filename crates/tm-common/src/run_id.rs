//! Run identifiers for tracing recommendation work.
//!
//! The process gets one ULID at first access; every pipeline invocation and
//! batch additionally gets its own ULID so log lines from concurrent
//! pipelines can be told apart.

use once_cell::sync::Lazy;
use ulid::Ulid;

static RUN_ID: Lazy<String> = Lazy::new(|| Ulid::new().to_string());

/// Process-level run ID, stable for the lifetime of the process.
#[inline]
pub fn get() -> &'static str {
    &RUN_ID
}

/// Fresh, time-ordered ULID for a single pipeline invocation or batch.
#[inline]
pub fn generate() -> String {
    Ulid::new().to_string()
}
