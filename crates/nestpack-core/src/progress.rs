//! Non-blocking progress reporting and cooperative cancellation (spec §5, §7).
//!
//! Strategies never spawn threads internally; a pack call is single-threaded
//! unless the `parallel` feature is used by the planner across independent
//! sheets. Progress events and cancellation polls happen at well-defined
//! yield points within each strategy's placement loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One step of a pack operation, emitted to an optional [`ProgressListener`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A candidate rotation/position is being evaluated.
    Trying {
        id: String,
        attempt: usize,
        /// Position of `id` within the current sheet's placement order.
        index: usize,
        total: usize,
    },
    /// A candidate was placed.
    Placed {
        id: String,
        x: f64,
        y: f64,
        rotation: f64,
        index: usize,
        total: usize,
    },
    /// A candidate could not be placed on the current sheet.
    Failed {
        id: String,
        reason: String,
        index: usize,
        total: usize,
        /// How many distinct positions were scored before giving up.
        positions_tried: usize,
        /// How many rotations from the config were attempted.
        rotations_tried: usize,
        /// Fraction of the sheet's occupancy grid already marked full, if the
        /// strategy tracks one (raster only; `0.0` elsewhere).
        grid_utilization: f64,
    },
    /// The auto-expand planner is adding another sheet.
    Expanding { sheet_index: usize },
    /// A pre-flight estimate was computed.
    Estimating { candidates: usize },
    /// A non-fatal condition worth surfacing (e.g. sheet nearly full).
    Warning { message: String },
}

/// Receives [`Event`]s as a pack operation progresses. Implementors must not
/// block: the packer calls this synchronously from its placement loop.
pub trait ProgressListener: Send + Sync {
    fn on_event(&self, event: Event);
}

/// A [`ProgressListener`] that discards every event, used when the caller
/// passes `None`.
pub struct NullListener;

impl ProgressListener for NullListener {
    fn on_event(&self, _event: Event) {}
}

/// Cooperative cancellation flag, polled at each strategy's yield points.
/// Cloning shares the same underlying flag; cancelling through any clone
/// cancels all of them.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Dispatches an [`Event`] to an optional listener without allocating when
/// `listener` is `None`.
pub fn emit(listener: Option<&dyn ProgressListener>, event: Event) {
    if let Some(l) = listener {
        l.on_event(event);
    }
}
