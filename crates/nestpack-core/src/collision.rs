//! Collision queries against the set of shapes already placed on a sheet
//! (spec §4.2). Every strategy routes its overlap and containment checks
//! through this service so spacing enforcement stays in one place.

use crate::config::JoinType;
use crate::geometry;
use crate::model::{BBox, Point, Polygon, SheetSize};

/// A transformed polygon already committed to a sheet, plus its bounding box
/// cached for the fast-reject path.
#[derive(Debug, Clone)]
pub struct PlacedShape {
    pub id: String,
    pub points: Polygon,
    pub bbox: BBox,
}

impl PlacedShape {
    pub fn new(id: impl Into<String>, points: Polygon) -> Self {
        let bbox = geometry::bounding_box(&points);
        Self {
            id: id.into(),
            points,
            bbox,
        }
    }
}

/// Stateful query surface over one sheet's placed shapes.
///
/// `spacing` is the minimum required gap, enforced by dilating candidate
/// shapes by `spacing / 2` before testing against placed shapes dilated by
/// the other half — symmetric so the exact split point doesn't matter.
pub struct CollisionService {
    sheet: SheetSize,
    spacing: f64,
    join: JoinType,
    sat_epsilon: f64,
    placed: Vec<PlacedShape>,
}

impl CollisionService {
    pub fn new(sheet: SheetSize, spacing: f64, join: JoinType, sat_epsilon: f64) -> Self {
        Self {
            sheet,
            spacing,
            join,
            sat_epsilon,
            placed: Vec::new(),
        }
    }

    pub fn placed(&self) -> &[PlacedShape] {
        &self.placed
    }

    pub fn commit(&mut self, shape: PlacedShape) {
        self.placed.push(shape);
    }

    /// True if `candidate` (already transformed to its proposed position)
    /// fits within the sheet bounds, honoring edge spacing.
    pub fn within_sheet(&self, candidate: &[Point]) -> bool {
        let bbox = geometry::bounding_box(candidate);
        bbox.min_x >= self.spacing
            && bbox.min_y >= self.spacing
            && bbox.max_x <= self.sheet.width - self.spacing
            && bbox.max_y <= self.sheet.height - self.spacing
    }

    /// True if `candidate` does not overlap any placed shape, honoring the
    /// configured minimum spacing.
    pub fn collides(&self, candidate: &[Point]) -> bool {
        if self.placed.is_empty() {
            return false;
        }
        let cand_bbox = geometry::bounding_box(candidate);
        let half = self.spacing / 2.0;
        let dilated_candidate = if self.spacing > 0.0 {
            geometry::offset(candidate, half, self.join)
        } else {
            candidate.to_vec()
        };
        for shape in &self.placed {
            let inflated_bbox = BBox {
                min_x: shape.bbox.min_x - self.spacing,
                min_y: shape.bbox.min_y - self.spacing,
                max_x: shape.bbox.max_x + self.spacing,
                max_y: shape.bbox.max_y + self.spacing,
            };
            if !inflated_bbox.intersects(&cand_bbox) {
                continue;
            }
            let dilated_other = if self.spacing > 0.0 {
                geometry::offset(&shape.points, half, self.join)
            } else {
                shape.points.clone()
            };
            if geometry::sat_overlap(&dilated_candidate, &dilated_other, self.sat_epsilon) {
                return true;
            }
        }
        false
    }

    /// Convenience combining [`Self::within_sheet`] and the negation of
    /// [`Self::collides`]: true if `candidate` may be committed as-is.
    pub fn is_free(&self, candidate: &[Point]) -> bool {
        self.within_sheet(candidate) && !self.collides(candidate)
    }
}
