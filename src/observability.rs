//! Logging infrastructure for block filtering.
//!
//! All events go through `tracing` with target "logsieve" and carry an
//! `event` field for filtering.
//!
//! ## Library Integration
//!
//! The crate never initializes a global subscriber. Applications configure
//! tracing via `tracing_subscriber` or similar.
//!
//! ## Conventions
//!
//! - `event`: snake_case event name (required)
//! - `component`: module/subsystem (e.g., "search", "bloom")
//! - Use `%` for Display, `?` for Debug formatting
//! - Per-row events are never emitted; the finest granularity is one block

/// Target for all log events emitted by this crate.
pub(crate) const LOGSIEVE_TARGET: &str = "logsieve";

/// Macro for debug-level log events.
///
/// # Example
/// ```ignore
/// log_debug!(
///     component = "block",
///     event = "built",
///     part = %part_path,
///     rows = rows_count,
/// );
/// ```
macro_rules! log_debug {
    ($($field:tt)*) => {
        ::tracing::debug!(target: $crate::observability::LOGSIEVE_TARGET, $($field)*)
    };
}

/// Macro for trace-level log events.
macro_rules! log_trace {
    ($($field:tt)*) => {
        ::tracing::trace!(target: $crate::observability::LOGSIEVE_TARGET, $($field)*)
    };
}

pub(crate) use log_debug;
pub(crate) use log_trace;
