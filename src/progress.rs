//! Progress-callback trait for per-unit conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline processes each unit (page, paragraph or line).
//!
//! # Example
//!
//! ```rust
//! use doc2md::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_unit_complete(&self, unit: usize, total_units: usize, markdown_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Unit {}/{} done ({} bytes)", unit, total_units, markdown_len);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline as it processes each unit.
///
/// Units are processed concurrently, so `on_unit_start`, `on_unit_complete`
/// and `on_unit_error` may be called from different threads and out of
/// order. All methods default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before any unit is processed.
    fn on_conversion_start(&self, total_units: usize) {
        let _ = total_units;
    }

    /// Called before a unit's text is classified.
    ///
    /// # Arguments
    /// * `unit`        — 1-indexed unit number
    /// * `total_units` — number of selected units
    fn on_unit_start(&self, unit: usize, total_units: usize) {
        let _ = (unit, total_units);
    }

    /// Called when a unit's Markdown was written (rendering may still have failed;
    /// those failures arrive through `on_unit_error`).
    fn on_unit_complete(&self, unit: usize, total_units: usize, markdown_len: usize) {
        let _ = (unit, total_units, markdown_len);
    }

    /// Called for every non-fatal error a unit produced.
    fn on_unit_error(&self, unit: usize, total_units: usize, error: &str) {
        let _ = (unit, total_units, error);
    }

    /// Called once after all units have been attempted.
    fn on_conversion_complete(&self, total_units: usize, success_count: usize) {
        let _ = (total_units, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        started_total: AtomicUsize,
        completed_total: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_conversion_start(&self, total_units: usize) {
            self.started_total.store(total_units, Ordering::SeqCst);
        }

        fn on_unit_start(&self, _unit: usize, _total_units: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_unit_complete(&self, _unit: usize, _total_units: usize, _markdown_len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_unit_error(&self, _unit: usize, _total_units: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_conversion_complete(&self, _total_units: usize, success_count: usize) {
            self.completed_total.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start(5);
        cb.on_unit_start(1, 5);
        cb.on_unit_complete(1, 5, 42);
        cb.on_unit_error(2, 5, "some error");
        cb.on_conversion_complete(5, 4);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_conversion_start(3);
        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 3);

        tracker.on_unit_start(1, 3);
        tracker.on_unit_complete(1, 3, 100);
        tracker.on_unit_start(2, 3);
        tracker.on_unit_complete(2, 3, 200);
        tracker.on_unit_start(3, 3);
        tracker.on_unit_error(3, 3, "render failed");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);

        tracker.on_conversion_complete(3, 2);
        assert_eq!(tracker.completed_total.load(Ordering::SeqCst), 2);
    }
}
