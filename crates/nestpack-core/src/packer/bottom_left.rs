//! Bottom-left fill strategy (spec §4.4): exact-geometry sliding, scored by
//! `x + y` rather than a discretized grid. Slower than [`super::raster`] but
//! tighter on non-rectangular outlines.

use crate::collision::{CollisionService, PlacedShape};
use crate::config::PackerConfig;
use crate::geometry;
use crate::model::{failure_reason, PackResult, PackablePolygon, Placement, SheetSize, UnplacedItem};
use crate::packer::{height_then_area_order, utilization};
use crate::progress::{CancellationToken, Event, ProgressListener};

/// Finds the position minimizing `x + y` for `normalized` (already translated
/// so its bbox min corner sits at the origin) against `collision`, scanning
/// at `step` resolution. Returns `None` if no feasible position exists.
fn best_position(
    collision: &CollisionService,
    normalized: &[crate::model::Point],
    sheet: SheetSize,
    spacing: f64,
    step: f64,
) -> (Option<(f64, f64)>, usize) {
    let bbox = geometry::bounding_box(normalized);
    let w = bbox.width();
    let h = bbox.height();
    if w + 2.0 * spacing > sheet.width || h + 2.0 * spacing > sheet.height {
        return (None, 0);
    }
    let mut best: Option<(f64, f64, f64)> = None; // (score, x, y)
    let mut tried = 0usize;
    let mut y = spacing;
    while y + h <= sheet.height - spacing {
        let mut x = spacing;
        while x + w <= sheet.width - spacing {
            let score = x + y;
            let should_try = match best {
                Some((b, _, _)) => score < b,
                None => true,
            };
            if should_try {
                tried += 1;
                let candidate = geometry::translate(normalized, x, y);
                if collision.is_free(&candidate) {
                    best = Some((score, x, y));
                }
            }
            x += step;
        }
        y += step;
    }
    (best.map(|(_, x, y)| (x, y)), tried)
}

pub fn pack(
    sheet: SheetSize,
    candidates: &[PackablePolygon],
    config: &PackerConfig,
    listener: Option<&dyn ProgressListener>,
    cancel: &CancellationToken,
) -> PackResult {
    let mut collision =
        CollisionService::new(sheet, config.spacing, config.offset_join, config.sat_epsilon);
    let mut placements = Vec::new();
    let mut unplaced = Vec::new();
    let mut placed_area = 0.0;

    let total = candidates.len();
    for (index, idx) in height_then_area_order(candidates).into_iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }
        let poly = &candidates[idx];
        let mut placed_this = false;
        let mut any_rotation_size_fits = false;
        let mut best_overall: Option<(f64, f64, f64, Vec<crate::model::Point>)> = None; // score,x,y,normalized
        let mut positions_tried = 0usize;
        let mut rotations_tried = 0usize;

        for (attempt, &rot) in config.rotations.iter().enumerate() {
            crate::progress::emit(
                listener,
                Event::Trying {
                    id: poly.id.clone(),
                    attempt,
                    index,
                    total,
                },
            );
            rotations_tried += 1;
            let rotated = geometry::rotate(&poly.points, rot, None);
            let bbox = geometry::bounding_box(&rotated);
            let normalized = geometry::translate(&rotated, -bbox.min_x, -bbox.min_y);
            let (position, tried) =
                best_position(&collision, &normalized, sheet, config.spacing, config.step_size);
            positions_tried += tried;
            if let Some((x, y)) = position {
                any_rotation_size_fits = true;
                let score = x + y;
                let better = match &best_overall {
                    Some((b, ..)) => score < *b,
                    None => true,
                };
                if better {
                    best_overall = Some((score, x, y, normalized));
                }
            } else {
                let bbox_w = bbox.width();
                let bbox_h = bbox.height();
                if bbox_w + 2.0 * config.spacing <= sheet.width
                    && bbox_h + 2.0 * config.spacing <= sheet.height
                {
                    any_rotation_size_fits = true;
                }
            }
        }

        if let Some((_, x, y, normalized)) = best_overall {
            let rotation = config
                .rotations
                .iter()
                .find(|&&r| {
                    let rotated = geometry::rotate(&poly.points, r, None);
                    let bbox = geometry::bounding_box(&rotated);
                    let n = geometry::translate(&rotated, -bbox.min_x, -bbox.min_y);
                    n == normalized
                })
                .copied()
                .unwrap_or(0.0);
            let candidate_points = geometry::translate(&normalized, x, y);
            collision.commit(PlacedShape::new(poly.id.clone(), candidate_points.clone()));
            placements.push(Placement {
                id: poly.id.clone(),
                x,
                y,
                rotation,
                points: Some(candidate_points),
            });
            placed_area += poly.area;
            placed_this = true;
            tracing::debug!(id = %poly.id, x, y, rotation, "candidate accepted");
            crate::progress::emit(
                listener,
                Event::Placed {
                    id: poly.id.clone(),
                    x,
                    y,
                    rotation,
                    index,
                    total,
                },
            );
        } else {
            tracing::trace!(id = %poly.id, "no bottom-left position found for any rotation");
        }

        if !placed_this {
            let reason = if !any_rotation_size_fits {
                failure_reason::NO_ROTATION_FITS.to_string()
            } else {
                failure_reason::NO_COLLISION_FREE_POSITION.to_string()
            };
            crate::progress::emit(
                listener,
                Event::Failed {
                    id: poly.id.clone(),
                    reason: reason.clone(),
                    index,
                    total,
                    positions_tried,
                    rotations_tried,
                    grid_utilization: 0.0,
                },
            );
            unplaced.push(UnplacedItem {
                id: poly.id.clone(),
                reason,
            });
        }
    }

    PackResult {
        placements,
        utilization: utilization(sheet, placed_area),
        unplaced,
    }
}
