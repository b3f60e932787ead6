//! Core geometry, collision, and packing-strategy library for nesting
//! irregular 2D shapes onto one or more sheets.
//!
//! The public surface is three functions: [`pack`] for a single sheet,
//! [`pack_multi`] for the production planner across repeated sheets, and
//! [`estimate`] for a cheap pre-flight area check. Everything else —
//! geometry primitives, the collision service, individual strategies — is
//! exposed for callers who want finer control or want to build their own
//! strategy on top of the same primitives.

pub mod collision;
pub mod config;
pub mod error;
pub mod estimator;
pub mod geometry;
pub mod model;
pub mod packer;
pub mod planner;
pub mod progress;
pub mod units;

pub use error::{NestError, Result};

use config::{PackerConfig, PlannerConfig};
use model::{Estimate, PackResult, PackablePolygon, SheetSize};
use progress::{CancellationToken, ProgressListener};

/// Packs `candidates` onto a single sheet of `sheet` size using `config`.
///
/// Returns [`NestError::InvalidInput`] if `config` fails validation, or
/// [`NestError::Cancelled`] if `cancel` was signalled mid-pack. Individual
/// candidates that don't fit are never an error: they show up in
/// [`PackResult::unplaced`].
#[tracing::instrument(skip(candidates, config, listener, cancel))]
pub fn pack(
    sheet: SheetSize,
    candidates: &[PackablePolygon],
    config: &PackerConfig,
    listener: Option<&dyn ProgressListener>,
    cancel: &CancellationToken,
) -> Result<PackResult> {
    config.validate()?;
    let result = packer::pack_sheet(sheet, candidates, config, listener, cancel);
    if cancel.is_cancelled() {
        return Err(NestError::Cancelled {
            placed: result.placements.len(),
        });
    }
    Ok(result)
}

/// Packs a catalog of `(design, quantity)` pairs across as many sheets as
/// `config` allows. See [`config::PlannerConfig`] for fixed-page vs.
/// auto-expand behavior.
pub fn pack_multi(
    sheet: SheetSize,
    items: &[(PackablePolygon, usize)],
    config: &PlannerConfig,
    listener: Option<&dyn ProgressListener>,
    cancel: &CancellationToken,
) -> Result<model::MultiSheetResult> {
    planner::pack_multi(sheet, items, config, listener, cancel)
}

/// Cheap pre-flight check of whether `items` can plausibly fit the page
/// budget in `config`, based on area alone. Never runs an actual pack.
pub fn estimate(
    sheet: SheetSize,
    items: &[(PackablePolygon, usize)],
    config: &PlannerConfig,
) -> Estimate {
    estimator::estimate(sheet, items, config)
}

/// Re-exports the types most callers need in scope.
pub mod prelude {
    pub use crate::config::{JoinType, PackerConfig, PlannerConfig, RotationPreset, StrategyKind};
    pub use crate::error::{NestError, Result};
    pub use crate::model::{
        BBox, Estimate, MultiSheetResult, PackResult, PackStats, PackablePolygon, Placement, Point,
        Polygon, Sheet, SheetSize, UnplacedItem,
    };
    pub use crate::progress::{CancellationToken, Event, ProgressListener};
    pub use crate::{estimate, pack, pack_multi};
}
