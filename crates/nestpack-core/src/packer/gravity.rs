//! Gravity (drop-and-slide) strategy (spec §4.5): candidates fall until they
//! rest on the sheet floor or another shape, then slide sideways to
//! interlock into the gaps that rectangular grid scans leave behind.

use crate::collision::{CollisionService, PlacedShape};
use crate::config::PackerConfig;
use crate::geometry;
use crate::model::{failure_reason, PackResult, PackablePolygon, Placement, Point, SheetSize, UnplacedItem};
use crate::packer::{largest_area_order, utilization};
use crate::progress::{CancellationToken, Event, ProgressListener};

/// Drops `normalized` (bbox min corner at the origin) from the top of the
/// sheet at horizontal offset `start_x` until it rests, then slides it left
/// as far as it will go. Returns the resting `(x, y)` if the starting column
/// is feasible at all, `None` otherwise.
fn drop_and_slide(
    collision: &CollisionService,
    normalized: &[Point],
    sheet: SheetSize,
    spacing: f64,
    step: f64,
    start_x: f64,
) -> Option<(f64, f64)> {
    let bbox = geometry::bounding_box(normalized);
    let w = bbox.width();
    let h = bbox.height();
    let mut x = start_x;
    let mut y = sheet.height - spacing - h;
    if y < spacing {
        return None;
    }
    if !collision.is_free(&geometry::translate(normalized, x, y)) {
        return None;
    }

    let mut moved = true;
    while moved {
        moved = false;
        // drop: descend while the next step down stays free
        loop {
            let next_y = y - step;
            if next_y < spacing {
                break;
            }
            if collision.is_free(&geometry::translate(normalized, x, next_y)) {
                y = next_y;
                moved = true;
            } else {
                break;
            }
        }
        // slide: move left while the next step stays free
        loop {
            let next_x = x - step;
            if next_x < spacing {
                break;
            }
            if collision.is_free(&geometry::translate(normalized, next_x, y)) {
                x = next_x;
                moved = true;
            } else {
                break;
            }
        }
    }
    Some((x, y))
}

/// Seed columns to drop a candidate down: the top edge at `step*4` intervals,
/// plus the left/right edges of every already-placed shape's bounding box so
/// new shapes can slide in and interlock against them (spec §4.5).
fn seed_columns(sheet: SheetSize, spacing: f64, step: f64, placed: &[PlacedShape]) -> Vec<f64> {
    let mut xs = Vec::new();
    let mut x = spacing;
    while x <= sheet.width - spacing {
        xs.push(x);
        x += step * 4.0;
    }
    for shape in placed {
        xs.push(shape.bbox.min_x);
        xs.push(shape.bbox.max_x + spacing);
        if shape.bbox.min_x - spacing >= spacing {
            xs.push(shape.bbox.min_x - spacing);
        }
    }
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
    xs.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
    xs.retain(|&x| x >= spacing && x <= sheet.width - spacing);
    xs
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
    for (index, idx) in largest_area_order(candidates).into_iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }
        let poly = &candidates[idx];
        let mut placed_this = false;
        let mut any_rotation_size_fits = false;
        let mut best: Option<(f64, f64, f64, f64, Vec<Point>)> = None; // score,x,y,rotation,normalized
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
            let w = bbox.width();
            let h = bbox.height();
            if w + 2.0 * config.spacing > sheet.width || h + 2.0 * config.spacing > sheet.height {
                continue;
            }
            any_rotation_size_fits = true;
            let normalized = geometry::translate(&rotated, -bbox.min_x, -bbox.min_y);

            for start_x in seed_columns(sheet, config.spacing, config.step_size, collision.placed()) {
                if start_x + w > sheet.width - config.spacing {
                    continue;
                }
                positions_tried += 1;
                if let Some((x, y)) = drop_and_slide(
                    &collision,
                    &normalized,
                    sheet,
                    config.spacing,
                    config.step_size,
                    start_x,
                ) {
                    let score = y * sheet.width + x; // lower is better: resting height dominates
                    let better = match &best {
                        Some((b, ..)) => score < *b,
                        None => true,
                    };
                    if better {
                        best = Some((score, x, y, rot, normalized.clone()));
                    }
                }
            }
        }

        if let Some((_, x, y, rotation, normalized)) = best {
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
            tracing::debug!(id = %poly.id, x, y, rotation, "candidate settled");
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
            tracing::trace!(id = %poly.id, "no resting position found along any drop column");
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{JoinType, StrategyKind};

    fn square(id: &str, side: f64) -> PackablePolygon {
        PackablePolygon::new(
            id,
            vec![
                Point::new(0.0, 0.0),
                Point::new(side, 0.0),
                Point::new(side, side),
                Point::new(0.0, side),
            ],
        )
        .unwrap()
    }

    fn cfg() -> PackerConfig {
        PackerConfig {
            strategy: StrategyKind::Gravity,
            spacing: 0.1,
            rotations: vec![0.0],
            cells_per_inch: 10.0,
            step_size: 0.25,
            nfp_exact: false,
            offset_join: JoinType::Round,
            sat_epsilon: 1e-6,
        }
    }

    #[test]
    fn square_settles_on_the_floor() {
        let c = cfg();
        let result = pack(
            SheetSize::new(10.0, 10.0),
            &[square("a", 2.0)],
            &c,
            None,
            &CancellationToken::new(),
        );
        assert_eq!(result.placements.len(), 1);
        assert!((result.placements[0].y - c.spacing).abs() < 1e-6);
    }

    #[test]
    fn two_squares_both_land() {
        let c = cfg();
        let result = pack(
            SheetSize::new(10.0, 10.0),
            &[square("a", 2.0), square("b", 2.0)],
            &c,
            None,
            &CancellationToken::new(),
        );
        assert_eq!(result.placements.len(), 2);
    }
}
