//! Progress reporting for long-running operations.
//!
//! Imports and nearest-neighbor runs report through [`ProgressCallback`]
//! so the same code can drive a terminal progress bar, a log line, or
//! nothing at all.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Receives progress updates from a running operation.
///
/// Implementations must be `Send + Sync` so a callback can be shared via
/// `Arc` with whatever is driving the operation.
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected units of work (chunks, target records).
    fn set_total(&self, total: u64);

    /// Set the current position (absolute, not delta).
    fn set_position(&self, pos: u64);

    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);

    /// Mark progress as complete and remove the progress indicator.
    fn finish_and_clear(&self);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn set_position(&self, _pos: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
    fn finish_and_clear(&self) {}
}

/// Returns a shared [`NullProgress`] instance.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}

/// Writes progress to the log instead of drawing anything.
///
/// Position changes are logged at debug level, messages and completion
/// at info level.
pub struct LogProgress {
    label: String,
    total: AtomicU64,
    position: AtomicU64,
}

impl LogProgress {
    /// Creates a log-backed callback whose lines are prefixed by `label`.
    #[must_use]
    pub fn new(label: &str) -> Arc<dyn ProgressCallback> {
        Arc::new(Self {
            label: label.to_string(),
            total: AtomicU64::new(0),
            position: AtomicU64::new(0),
        })
    }

    fn log_position(&self, pos: u64) {
        log::debug!(
            "{}: {pos}/{}",
            self.label,
            self.total.load(Ordering::Relaxed)
        );
    }
}

impl ProgressCallback for LogProgress {
    fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
        self.position.store(0, Ordering::Relaxed);
    }

    fn set_position(&self, pos: u64) {
        self.position.store(pos, Ordering::Relaxed);
        self.log_position(pos);
    }

    fn inc(&self, delta: u64) {
        let pos = self.position.fetch_add(delta, Ordering::Relaxed) + delta;
        self.log_position(pos);
    }

    fn set_message(&self, msg: String) {
        log::info!("{}: {msg}", self.label);
    }

    fn finish(&self, msg: String) {
        log::info!("{}: {msg}", self.label);
    }

    fn finish_and_clear(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_progress_tracks_position() {
        let progress = LogProgress {
            label: "chunks".to_string(),
            total: AtomicU64::new(0),
            position: AtomicU64::new(0),
        };
        progress.set_total(3);
        progress.inc(1);
        progress.inc(1);
        assert_eq!(progress.position.load(Ordering::Relaxed), 2);
        progress.set_position(3);
        assert_eq!(progress.position.load(Ordering::Relaxed), 3);
        progress.set_total(5);
        assert_eq!(progress.position.load(Ordering::Relaxed), 0);
    }
}
