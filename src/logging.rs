//! Structured logging helpers for batch dispatch events.
//!
//! Fine-grained tracing lives inline at the call sites; this module provides
//! the per-batch summary event emitted once per dispatch.

/// Log the completion of one batch dispatch.
///
/// Logged at warn level when any slot faulted, debug otherwise.
pub fn log_batch_dispatch(
    batch_id: &str,
    batch_size: usize,
    matched: usize,
    unmatched: usize,
    faulted: usize,
    duration_ms: u64,
) {
    if faulted > 0 {
        tracing::warn!(
            batch_id = %batch_id,
            batch_size,
            matched,
            unmatched,
            faulted,
            duration_ms,
            "Batch dispatch completed with faulted slots"
        );
    } else {
        tracing::debug!(
            batch_id = %batch_id,
            batch_size,
            matched,
            unmatched,
            faulted,
            duration_ms,
            "Batch dispatch completed"
        );
    }
}
