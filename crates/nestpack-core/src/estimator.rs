//! Pre-flight area-based estimate (spec §4.8): a cheap sanity check run
//! before committing to a full pack, so callers can warn users before
//! spending time on a doomed configuration.

use crate::config::PlannerConfig;
use crate::model::{Estimate, PackablePolygon, SheetSize};

/// Efficiency floor used for the cannot-fit decision: deliberately more
/// pessimistic than `MINIMUM_PAGES_FILL_RATE` so the gate errs toward
/// rejecting a pack rather than promising pages it can't deliver.
const CANNOT_FIT_EFFICIENCY_FLOOR: f64 = 0.50;

/// Fill-rate assumption used only for the reported `minimum_pages_needed`
/// figure, less conservative than the cannot-fit floor above.
const MINIMUM_PAGES_FILL_RATE: f64 = 0.60;

/// Estimates whether `candidates`, each expanded to `quantities[id]` copies,
/// can fit within `config.page_count` sheets of `sheet` size.
pub fn estimate(
    sheet: SheetSize,
    candidates: &[(PackablePolygon, usize)],
    config: &PlannerConfig,
) -> Estimate {
    let total_item_area: f64 = candidates.iter().map(|(p, qty)| p.area * *qty as f64).sum();
    let total_sheet_area = sheet.area() * config.page_count as f64;
    let estimated_utilization = if total_sheet_area > 0.0 {
        (total_item_area / total_sheet_area).min(1.0)
    } else {
        0.0
    };
    let usable_area_per_sheet = sheet.area() * MINIMUM_PAGES_FILL_RATE;
    let minimum_pages_needed = if usable_area_per_sheet > 0.0 {
        (total_item_area / usable_area_per_sheet).ceil().max(1.0) as usize
    } else {
        usize::MAX
    };
    let cannot_fit_threshold = sheet.area() * config.page_count as f64 * CANNOT_FIT_EFFICIENCY_FLOOR;
    let can_fit_in_requested_pages =
        cannot_fit_threshold > 0.0 && total_item_area / cannot_fit_threshold <= 1.0;

    Estimate {
        total_item_area,
        total_sheet_area,
        estimated_utilization,
        minimum_pages_needed,
        can_fit_in_requested_pages,
    }
}
