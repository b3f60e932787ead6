//! No-fit-polygon candidate sampler (spec §4.6), the default strategy for
//! true irregular nesting. Generates candidate reference points from the
//! Minkowski difference of the candidate's convex hull against each already
//! placed shape's hull, then confirms each with the exact collision service.

use crate::collision::{CollisionService, PlacedShape};
use crate::config::PackerConfig;
use crate::geometry;
use crate::model::{failure_reason, PackResult, PackablePolygon, Placement, Point, SheetSize, UnplacedItem};
use crate::packer::{largest_area_order, utilization};
use crate::progress::{CancellationToken, Event, ProgressListener};

/// Step for the dense grid sampled close to every placed shape, spec §4.6.
const DENSE_LOCAL_STEP: f64 = 0.03;
/// Step for the sparse grid sampled across the whole feasible rectangle.
const SPARSE_GLOBAL_STEP: f64 = 0.15;
/// Quantization granularity used to dedup near-identical candidates.
const QUANTIZE: f64 = 1000.0;

fn quantize(p: Point) -> (i64, i64) {
    ((p.x * QUANTIZE).round() as i64, (p.y * QUANTIZE).round() as i64)
}

/// Candidate reference points for placing `normalized` (bbox min corner at
/// the origin) against the sheet boundary and every already-placed shape,
/// drawn from three sources (spec §4.6):
///
/// 1. edge-adjacent seeds along each placed shape's edges, at a few outward
///    offsets, so the candidate can nestle directly against a neighbor;
/// 2. a dense local grid around each placed shape's inflated bbox;
/// 3. a sparse global grid across the sheet's whole feasible rectangle, so a
///    candidate with no neighbors yet still has somewhere to land.
///
/// Candidates are deduplicated by quantized coordinate and returned sorted by
/// `y*100+x` (top-to-bottom, then left-to-right) for the caller to consume in
/// that order, accepting the first collision-free one.
fn candidate_points(
    normalized: &[Point],
    sheet: SheetSize,
    spacing: f64,
    placed: &[PlacedShape],
    exact: bool,
) -> Vec<Point> {
    let bbox = geometry::bounding_box(normalized);
    let w = bbox.width();
    let h = bbox.height();
    let max_x = sheet.width - spacing - w;
    let max_y = sheet.height - spacing - h;

    let mut out = vec![Point::new(spacing, spacing)];

    if placed.is_empty() {
        return finish_candidates(out, spacing, max_x, max_y);
    }

    if exact {
        let candidate_hull = geometry::convex_hull(normalized);
        for shape in placed {
            let shape_hull = geometry::convex_hull(&shape.points);
            let nfp = geometry::minkowski_diff_hull(&shape_hull, &candidate_hull);
            out.extend(nfp.iter().copied());
        }
    }

    for shape in placed {
        // 1. edge-adjacent seeds: offset outward from each edge's endpoints.
        let n = shape.points.len();
        for i in 0..n {
            let a = shape.points[i];
            for &offset in &[spacing, spacing * 2.0, spacing * 4.0] {
                out.push(Point::new(a.x + offset, a.y));
                out.push(Point::new(a.x, a.y + offset));
            }
        }

        // 2. dense local grid around the shape's inflated bbox.
        let b = shape.bbox;
        let lo_x = (b.min_x - spacing * 2.0).max(spacing);
        let hi_x = (b.max_x + spacing * 2.0).min(max_x);
        let lo_y = (b.min_y - spacing * 2.0).max(spacing);
        let hi_y = (b.max_y + spacing * 2.0).min(max_y);
        let mut y = lo_y;
        while y <= hi_y {
            let mut x = lo_x;
            while x <= hi_x {
                out.push(Point::new(x, y));
                x += DENSE_LOCAL_STEP;
            }
            y += DENSE_LOCAL_STEP;
        }
    }

    // 3. sparse global grid across the whole feasible rectangle.
    let mut y = spacing;
    while y <= max_y {
        let mut x = spacing;
        while x <= max_x {
            out.push(Point::new(x, y));
            x += SPARSE_GLOBAL_STEP;
        }
        y += SPARSE_GLOBAL_STEP;
    }

    finish_candidates(out, spacing, max_x, max_y)
}

fn finish_candidates(mut out: Vec<Point>, spacing: f64, max_x: f64, max_y: f64) -> Vec<Point> {
    out.retain(|p| p.x >= spacing && p.y >= spacing && p.x <= max_x && p.y <= max_y);

    let mut seen = std::collections::HashSet::new();
    out.retain(|p| seen.insert(quantize(*p)));

    out.sort_by(|a, b| {
        let key_a = a.y * 100.0 + a.x;
        let key_b = b.y * 100.0 + b.x;
        key_a.partial_cmp(&key_b).unwrap()
    });
    out
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
        let mut best: Option<(f64, f64, f64, Vec<Point>)> = None; // x,y,rotation,normalized
        let mut positions_tried = 0usize;
        let mut rotations_tried = 0usize;

        'rotation: for (attempt, &rot) in config.rotations.iter().enumerate() {
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

            let candidates_for_rotation = candidate_points(
                &normalized,
                sheet,
                config.spacing,
                collision.placed(),
                config.nfp_exact,
            );
            for pos in candidates_for_rotation {
                positions_tried += 1;
                let placed_points = geometry::translate(&normalized, pos.x, pos.y);
                if !collision.is_free(&placed_points) {
                    tracing::trace!(id = %poly.id, x = pos.x, y = pos.y, "nfp candidate rejected by collision check");
                    continue;
                }
                best = Some((pos.x, pos.y, rot, normalized.clone()));
                break 'rotation;
            }
        }

        if let Some((x, y, rotation, normalized)) = best {
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
            tracing::trace!(id = %poly.id, "no nfp candidate survived the collision check");
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
