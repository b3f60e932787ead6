use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{NestError, Result};

/// A point in the sheet coordinate system, inches, `f64`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An ordered sequence of vertices, implicitly closed (last edge joins last→first).
/// Winding is not normalized on construction; `geometry::to_ccw` does that where required.
pub type Polygon = Vec<Point>;

/// Axis-aligned bounding box, inches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
    /// True if `self` fully contains `other`, within `epsilon`.
    pub fn contains(&self, other: &BBox, epsilon: f64) -> bool {
        other.min_x >= self.min_x - epsilon
            && other.min_y >= self.min_y - epsilon
            && other.max_x <= self.max_x + epsilon
            && other.max_y <= self.max_y + epsilon
    }
    /// Fast-reject overlap test between two bounding boxes.
    pub fn intersects(&self, other: &BBox) -> bool {
        !(self.max_x < other.min_x
            || other.max_x < self.min_x
            || self.max_y < other.min_y
            || other.max_y < self.min_y)
    }
}

/// Sheet dimensions, inches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SheetSize {
    pub width: f64,
    pub height: f64,
}

impl SheetSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Identity + geometry of one unique design, at its origin orientation (rotation = 0).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackablePolygon {
    /// Stable external identity. Cloned instances produced by the planner get
    /// an instance suffix: `<id>_<n>`.
    pub id: String,
    pub points: Polygon,
    pub width: f64,
    pub height: f64,
    pub area: f64,
}

impl PackablePolygon {
    /// Builds a `PackablePolygon`, computing bbox extents and shoelace area.
    ///
    /// Returns [`NestError::InvalidInput`] if `points` has fewer than 3
    /// vertices or contains non-finite coordinates.
    pub fn new(id: impl Into<String>, points: Polygon) -> Result<Self> {
        let id = id.into();
        if points.len() < 3 {
            return Err(NestError::InvalidInput(format!(
                "polygon '{id}' has fewer than 3 vertices"
            )));
        }
        if points
            .iter()
            .any(|p| !p.x.is_finite() || !p.y.is_finite())
        {
            return Err(NestError::InvalidInput(format!(
                "polygon '{id}' has non-finite coordinates"
            )));
        }
        let bbox = crate::geometry::bounding_box(&points);
        let width = bbox.width();
        let height = bbox.height();
        if width <= 0.0 || height <= 0.0 {
            return Err(NestError::InvalidInput(format!(
                "polygon '{id}' has zero-area bounding box"
            )));
        }
        let area = crate::geometry::shoelace_area(&points);
        Ok(Self {
            id,
            points,
            width,
            height,
            area,
        })
    }

    /// Clones this design as a numbered instance, `<id>_<n>`, for the multi-sheet planner.
    pub fn as_instance(&self, n: usize) -> Self {
        Self {
            id: format!("{}_{}", self.id, n),
            points: self.points.clone(),
            width: self.width,
            height: self.height,
            area: self.area,
        }
    }

    /// Builds a `PackablePolygon` from vertices given in millimeters, converting
    /// to the crate's internal inch coordinate system at construction time.
    pub fn from_mm_points(id: impl Into<String>, points_mm: Polygon) -> Result<Self> {
        let points = points_mm
            .into_iter()
            .map(|p| Point::new(crate::units::mm_to_in(p.x), crate::units::mm_to_in(p.y)))
            .collect();
        Self::new(id, points)
    }

    /// Strips a planner-added `_<n>` instance suffix, returning the design id.
    pub fn design_id(id: &str) -> &str {
        match id.rfind('_') {
            Some(pos) if id[pos + 1..].chars().all(|c| c.is_ascii_digit()) && pos + 1 < id.len() => {
                &id[..pos]
            }
            _ => id,
        }
    }
}

/// Result of placing one polygon on a sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    /// Final transformed vertices, denormalized. Useful for rendering and collision checks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<Polygon>,
}

impl Placement {
    /// Returns a copy of this placement with `x`, `y`, and (if present)
    /// `points` converted to millimeters, for callers working in that unit.
    pub fn to_mm(&self) -> Self {
        Self {
            id: self.id.clone(),
            x: crate::units::in_to_mm(self.x),
            y: crate::units::in_to_mm(self.y),
            rotation: self.rotation,
            points: self.points.as_ref().map(|pts| {
                pts.iter()
                    .map(|p| Point::new(crate::units::in_to_mm(p.x), crate::units::in_to_mm(p.y)))
                    .collect()
            }),
        }
    }
}

/// Why a candidate could not be placed. Values are drawn from a small closed set
/// (see spec §7, `PlacementFailure`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnplacedItem {
    pub id: String,
    pub reason: String,
}

pub mod failure_reason {
    pub const TOO_LARGE: &str = "polygon too large for sheet";
    pub const NO_ROTATION_FITS: &str = "no rotation fits";
    pub const NO_COLLISION_FREE_POSITION: &str = "no collision-free position found";
    pub fn sheet_nearly_full(pct: f64) -> String {
        format!("sheet nearly full ({pct:.1}%)")
    }
}

/// Result of packing a single sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackResult {
    pub placements: Vec<Placement>,
    pub utilization: f64,
    pub unplaced: Vec<UnplacedItem>,
}

/// One sheet within a [`MultiSheetResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sheet {
    pub sheet_index: usize,
    pub placements: Vec<Placement>,
    pub utilization: f64,
}

/// Output of the multi-sheet production planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiSheetResult {
    pub sheets: Vec<Sheet>,
    pub total_utilization: f64,
    pub quantities: HashMap<String, usize>,
    /// Instances from the oversubscribed candidate pool that never got placed
    /// on any sheet. Tracked separately from `quantities`, which counts only
    /// what was actually placed (spec §4.7).
    pub items_unplaced: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Pre-flight estimate of whether a candidate pool fits a page budget.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Estimate {
    pub total_item_area: f64,
    pub total_sheet_area: f64,
    pub estimated_utilization: f64,
    pub minimum_pages_needed: usize,
    pub can_fit_in_requested_pages: bool,
}

/// Aggregate packing statistics over a [`MultiSheetResult`] or a single [`PackResult`].
/// Convenience summary, grounded in the teacher's `PackOutput::stats()`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PackStats {
    pub sheets_used: usize,
    pub items_placed: usize,
    pub items_unplaced: usize,
    pub area_placed: f64,
    pub mean_utilization: f64,
}

impl MultiSheetResult {
    pub fn stats(&self) -> PackStats {
        let sheets_used = self.sheets.len();
        let items_placed: usize = self.sheets.iter().map(|s| s.placements.len()).sum();
        let area_placed: f64 = self
            .sheets
            .iter()
            .flat_map(|s| s.placements.iter())
            .filter_map(|p| p.points.as_ref())
            .map(|pts| crate::geometry::shoelace_area(pts))
            .sum();
        let mean_utilization = if sheets_used == 0 {
            0.0
        } else {
            self.sheets.iter().map(|s| s.utilization).sum::<f64>() / sheets_used as f64
        };
        PackStats {
            sheets_used,
            items_placed,
            items_unplaced: self.items_unplaced,
            area_placed,
            mean_utilization,
        }
    }
}
