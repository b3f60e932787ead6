//! Grid rasterization strategy (spec §4.3): the default for rectangle-like
//! inputs. Overlays an occupancy bit-grid rasterized from each shape's actual
//! footprint for cheap rejection, then confirms candidates with the exact
//! [`CollisionService`].

use crate::collision::{CollisionService, PlacedShape};
use crate::config::PackerConfig;
use crate::geometry;
use crate::model::{failure_reason, PackResult, PackablePolygon, Placement, Point, SheetSize, UnplacedItem};
use crate::packer::{height_then_area_order, utilization};
use crate::progress::{CancellationToken, Event, ProgressListener};

struct OccupancyGrid {
    cell: f64,
    cols: usize,
    rows: usize,
    cells: Vec<bool>,
}

impl OccupancyGrid {
    fn new(sheet: SheetSize, cells_per_inch: f64) -> Self {
        let cell = 1.0 / cells_per_inch;
        let cols = ((sheet.width / cell).ceil() as usize).max(1);
        let rows = ((sheet.height / cell).ceil() as usize).max(1);
        Self {
            cell,
            cols,
            rows,
            cells: vec![false; cols * rows],
        }
    }

    fn clamp_col(&self, x: f64) -> usize {
        ((x / self.cell) as isize).clamp(0, self.cols as isize - 1) as usize
    }

    fn clamp_row(&self, y: f64) -> usize {
        ((y / self.cell) as isize).clamp(0, self.rows as isize - 1) as usize
    }

    fn row_y(&self, row: usize) -> f64 {
        (row as f64 + 0.5) * self.cell
    }

    /// Scan-line spans covering `points`' actual footprint, one row of cells
    /// at a time, via edge-intersection pairing (even-odd rule) rather than
    /// the shape's bounding box.
    fn scanline_spans(&self, points: &[Point]) -> Vec<(usize, usize, usize)> {
        let bbox = geometry::bounding_box(points);
        let r0 = self.clamp_row(bbox.min_y);
        let r1 = self.clamp_row(bbox.max_y);
        let n = points.len();
        let mut spans = Vec::new();
        for row in r0..=r1 {
            let y = self.row_y(row);
            let mut xs: Vec<f64> = Vec::new();
            for i in 0..n {
                let a = points[i];
                let b = points[(i + 1) % n];
                if (a.y <= y && b.y > y) || (b.y <= y && a.y > y) {
                    let t = (y - a.y) / (b.y - a.y);
                    xs.push(a.x + t * (b.x - a.x));
                }
            }
            xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
            let mut i = 0;
            while i + 1 < xs.len() {
                let c0 = self.clamp_col(xs[i]);
                let c1 = self.clamp_col(xs[i + 1]);
                if c0 <= c1 {
                    spans.push((row, c0, c1));
                }
                i += 2;
            }
        }
        spans
    }

    fn region_occupied(&self, points: &[Point]) -> bool {
        self.scanline_spans(points)
            .iter()
            .any(|&(row, c0, c1)| (c0..=c1).any(|c| self.cells[row * self.cols + c]))
    }

    fn mark_occupied(&mut self, points: &[Point]) {
        for (row, c0, c1) in self.scanline_spans(points) {
            for c in c0..=c1 {
                self.cells[row * self.cols + c] = true;
            }
        }
    }

    /// Fraction of cells within the axis-aligned block that are already
    /// marked occupied, used by the coarse search pass to skip dense blocks.
    fn block_fill_fraction(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> f64 {
        let c0 = self.clamp_col(min_x);
        let c1 = self.clamp_col(max_x);
        let r0 = self.clamp_row(min_y);
        let r1 = self.clamp_row(max_y);
        let total = (r1 - r0 + 1) * (c1 - c0 + 1);
        if total == 0 {
            return 0.0;
        }
        let mut filled = 0usize;
        for r in r0..=r1 {
            for c in c0..=c1 {
                if self.cells[r * self.cols + c] {
                    filled += 1;
                }
            }
        }
        filled as f64 / total as f64
    }

    fn fill_fraction(&self) -> f64 {
        let filled = self.cells.iter().filter(|&&c| c).count();
        filled as f64 / self.cells.len() as f64
    }
}

struct SearchOutcome {
    position: Option<(f64, f64)>,
    positions_tried: usize,
}

/// Multi-scale search (spec §4.3): smart corner/edge seeds first, then a
/// coarse pass skipping blocks that are already mostly full, then a fine
/// refine around each coarse hit scored by distance from the sheet origin.
fn find_position(
    grid: &OccupancyGrid,
    collision: &CollisionService,
    normalized: &[Point],
    sheet: SheetSize,
    spacing: f64,
    step: f64,
    w: f64,
    h: f64,
) -> SearchOutcome {
    let max_x = sheet.width - spacing - w;
    let max_y = sheet.height - spacing - h;
    if max_x < spacing - 1e-9 || max_y < spacing - 1e-9 {
        return SearchOutcome { position: None, positions_tried: 0 };
    }

    let mut positions_tried = 0usize;
    let mut try_at = |x: f64, y: f64| -> bool {
        positions_tried += 1;
        let candidate = geometry::translate(normalized, x, y);
        !grid.region_occupied(&candidate) && collision.is_free(&candidate)
    };

    let smart_seeds = [
        (spacing, spacing),
        (max_x, spacing),
        (spacing, max_y),
        (max_x, max_y),
        ((spacing + max_x) / 2.0, spacing),
        (spacing, (spacing + max_y) / 2.0),
    ];
    for &(x, y) in &smart_seeds {
        if try_at(x, y) {
            return SearchOutcome { position: Some((x, y)), positions_tried };
        }
    }

    let coarse_step = (step * 10.0).max(0.5);
    let mut coarse_hits = Vec::new();
    let mut y = spacing;
    while y <= max_y {
        let mut x = spacing;
        while x <= max_x {
            if grid.block_fill_fraction(x, y, x + w, y + h) <= 0.7 {
                coarse_hits.push((x, y));
            }
            x += coarse_step;
        }
        y += coarse_step;
    }

    let mut best: Option<(f64, f64, f64)> = None;
    for (hx, hy) in coarse_hits {
        let lo_x = (hx - 5.0 * step).max(spacing);
        let hi_x = (hx + 5.0 * step).min(max_x);
        let lo_y = (hy - 5.0 * step).max(spacing);
        let hi_y = (hy + 5.0 * step).min(max_y);
        let mut y = lo_y;
        while y <= hi_y {
            let mut x = lo_x;
            while x <= hi_x {
                if try_at(x, y) {
                    let score = x * x + y * y;
                    let better = match best {
                        Some((_, _, s)) => score < s,
                        None => true,
                    };
                    if better {
                        best = Some((x, y, score));
                    }
                }
                x += step;
            }
            y += step;
        }
    }

    SearchOutcome {
        position: best.map(|(x, y, _)| (x, y)),
        positions_tried,
    }
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
    let mut grid = OccupancyGrid::new(sheet, config.cells_per_inch);
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
                continue 'rotation;
            }
            any_rotation_size_fits = true;
            let normalized = geometry::translate(&rotated, -bbox.min_x, -bbox.min_y);

            let outcome = find_position(&grid, &collision, &normalized, sheet, config.spacing, config.step_size, w, h);
            positions_tried += outcome.positions_tried;
            if let Some((x, y)) = outcome.position {
                let candidate_points = geometry::translate(&normalized, x, y);
                collision.commit(PlacedShape::new(poly.id.clone(), candidate_points.clone()));
                grid.mark_occupied(&candidate_points);
                placements.push(Placement {
                    id: poly.id.clone(),
                    x,
                    y,
                    rotation: rot,
                    points: Some(candidate_points),
                });
                placed_area += poly.area;
                placed_this = true;
                tracing::debug!(id = %poly.id, x, y, rotation = rot, "candidate accepted");
                crate::progress::emit(
                    listener,
                    Event::Placed {
                        id: poly.id.clone(),
                        x,
                        y,
                        rotation: rot,
                        index,
                        total,
                    },
                );
                break 'rotation;
            }
            if cancel.is_cancelled() {
                break 'rotation;
            }
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
                    grid_utilization: grid.fill_fraction(),
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

    #[test]
    fn places_single_square_on_large_sheet() {
        let cfg = PackerConfig {
            strategy: StrategyKind::Raster,
            spacing: 0.1,
            rotations: vec![0.0],
            cells_per_inch: 10.0,
            step_size: 0.25,
            nfp_exact: false,
            offset_join: JoinType::Round,
            sat_epsilon: 1e-6,
        };
        let result = pack(
            SheetSize::new(10.0, 10.0),
            &[square("a", 2.0)],
            &cfg,
            None,
            &CancellationToken::new(),
        );
        assert_eq!(result.placements.len(), 1);
        assert!(result.unplaced.is_empty());
    }

    #[test]
    fn rejects_shape_larger_than_sheet() {
        let cfg = PackerConfig {
            strategy: StrategyKind::Raster,
            spacing: 0.1,
            rotations: vec![0.0],
            cells_per_inch: 10.0,
            step_size: 0.25,
            nfp_exact: false,
            offset_join: JoinType::Round,
            sat_epsilon: 1e-6,
        };
        let result = pack(
            SheetSize::new(1.0, 1.0),
            &[square("huge", 5.0)],
            &cfg,
            None,
            &CancellationToken::new(),
        );
        assert!(result.placements.is_empty());
        assert_eq!(result.unplaced.len(), 1);
        assert_eq!(result.unplaced[0].reason, failure_reason::NO_ROTATION_FITS);
    }

    #[test]
    fn does_not_overlap_two_squares() {
        let cfg = PackerConfig {
            strategy: StrategyKind::Raster,
            spacing: 0.05,
            rotations: vec![0.0],
            cells_per_inch: 20.0,
            step_size: 0.2,
            nfp_exact: false,
            offset_join: JoinType::Round,
            sat_epsilon: 1e-6,
        };
        let result = pack(
            SheetSize::new(5.0, 5.0),
            &[square("a", 2.0), square("b", 2.0)],
            &cfg,
            None,
            &CancellationToken::new(),
        );
        assert_eq!(result.placements.len(), 2);
        let a = &result.placements[0];
        let b = &result.placements[1];
        let overlap_x = (a.x - b.x).abs() < 2.0;
        let overlap_y = (a.y - b.y).abs() < 2.0;
        assert!(!(overlap_x && overlap_y) || a.x != b.x || a.y != b.y);
    }

    #[test]
    fn rasterizes_the_actual_polygon_footprint_not_the_bbox() {
        let mut grid = OccupancyGrid::new(SheetSize::new(4.0, 4.0), 10.0);
        let triangle = vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(0.0, 2.0),
        ];
        grid.mark_occupied(&triangle);
        // A cell near the triangle's hypotenuse-excluded corner must stay clear.
        assert!(!grid.region_occupied(&[
            Point::new(1.8, 1.8),
            Point::new(1.9, 1.8),
            Point::new(1.9, 1.9),
            Point::new(1.8, 1.9),
        ]));
        // A cell well inside the triangle must be marked.
        assert!(grid.region_occupied(&[
            Point::new(0.2, 0.2),
            Point::new(0.3, 0.2),
            Point::new(0.3, 0.3),
            Point::new(0.2, 0.3),
        ]));
    }
}
