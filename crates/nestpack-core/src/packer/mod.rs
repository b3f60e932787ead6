//! Single-sheet placement strategies (spec §4.3–§4.6).
//!
//! Dispatch is a tagged enum rather than a trait object: the strategy set is
//! closed and known at compile time, so there is no polymorphism to gain
//! from dynamic dispatch and a match keeps each algorithm's actual code path
//! visible at the call site.

pub mod bottom_left;
pub mod gravity;
pub mod nfp;
pub mod raster;

use crate::config::{PackerConfig, StrategyKind};
use crate::model::{PackResult, PackablePolygon, SheetSize};
use crate::progress::{CancellationToken, ProgressListener};

/// Packs `candidates` onto one sheet of `sheet` size using `config.strategy`.
///
/// Candidates are attempted in input order; each strategy internally sorts
/// or scores placements but does not reorder the caller's `unplaced` bookkeeping.
#[tracing::instrument(skip(candidates, config, listener, cancel), fields(strategy = ?config.strategy, candidates = candidates.len()))]
pub fn pack_sheet(
    sheet: SheetSize,
    candidates: &[PackablePolygon],
    config: &PackerConfig,
    listener: Option<&dyn ProgressListener>,
    cancel: &CancellationToken,
) -> PackResult {
    let result = match config.strategy {
        StrategyKind::Raster => raster::pack(sheet, candidates, config, listener, cancel),
        StrategyKind::BottomLeft => bottom_left::pack(sheet, candidates, config, listener, cancel),
        StrategyKind::Gravity => gravity::pack(sheet, candidates, config, listener, cancel),
        StrategyKind::Nfp => nfp::pack(sheet, candidates, config, listener, cancel),
    };
    tracing::debug!(
        placed = result.placements.len(),
        unplaced = result.unplaced.len(),
        utilization = result.utilization,
        "pack_sheet finished"
    );
    result
}

/// Sorts candidate indices by descending height, then descending area —
/// the general-case ordering used by raster and bottom-left (spec §4.7).
pub(crate) fn height_then_area_order(candidates: &[PackablePolygon]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| {
        let height_a = candidates[a].height;
        let height_b = candidates[b].height;
        match height_b.partial_cmp(&height_a).unwrap() {
            std::cmp::Ordering::Equal => {
                let area_a = candidates[a].width * candidates[a].height;
                let area_b = candidates[b].width * candidates[b].height;
                area_b.partial_cmp(&area_a).unwrap()
            }
            ord => ord,
        }
    });
    order
}

/// Sorts candidate indices by descending bounding-box area only — the
/// exception ordering spec §4.7 calls out for gravity and NFP, where a
/// tall-first bias fights both strategies' own drop/slide heuristics.
pub(crate) fn largest_area_order(candidates: &[PackablePolygon]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| {
        let area_a = candidates[a].width * candidates[a].height;
        let area_b = candidates[b].width * candidates[b].height;
        area_b.partial_cmp(&area_a).unwrap()
    });
    order
}

pub(crate) fn utilization(sheet: SheetSize, placed_area: f64) -> f64 {
    let sheet_area = sheet.area();
    if sheet_area <= 0.0 {
        0.0
    } else {
        (placed_area / sheet_area).clamp(0.0, 1.0)
    }
}
