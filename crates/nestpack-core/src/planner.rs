//! Multi-sheet production planner (spec §4.7): expands a catalog of designs
//! into individual instances, distributes them across sheets, and decides
//! when to stop — either at a fixed page budget or, in auto-expand mode,
//! once every instance is placed or the hard cap is hit.

use std::collections::{HashMap, HashSet};

use crate::collision::{CollisionService, PlacedShape};
use crate::config::{PlannerConfig, StrategyKind, AUTO_EXPAND_HARD_CAP};
use crate::error::{NestError, Result};
use crate::estimator;
use crate::geometry;
use crate::model::{MultiSheetResult, PackablePolygon, Placement, Sheet, SheetSize};
use crate::packer::{self, utilization};
use crate::progress::{self, CancellationToken, Event, ProgressListener};

/// Packs `items` (each a design paired with the quantity requested) onto
/// repeated sheets of `sheet` size according to `config`.
#[tracing::instrument(skip(items, config, listener, cancel), fields(designs = items.len()))]
pub fn pack_multi(
    sheet: SheetSize,
    items: &[(PackablePolygon, usize)],
    config: &PlannerConfig,
    listener: Option<&dyn ProgressListener>,
    cancel: &CancellationToken,
) -> Result<MultiSheetResult> {
    config.validate()?;

    if !config.pack_all_items {
        let est = estimator::estimate(sheet, items, config);
        if !est.can_fit_in_requested_pages {
            let warning = format!(
                "catalog needs an estimated {} page(s) but only {} requested (total item area {:.2} in²)",
                est.minimum_pages_needed, config.page_count, est.total_item_area
            );
            progress::emit(listener, Event::Warning { message: warning.clone() });
            return Err(NestError::InsufficientSpace { warning });
        }
    }

    let mut remaining: Vec<PackablePolygon> = items
        .iter()
        .flat_map(|(design, qty)| (0..*qty).map(move |n| design.as_instance(n)))
        .collect();

    tracing::debug!(total_instances = remaining.len(), "expanded catalog into instances");

    progress::emit(
        listener,
        Event::Estimating {
            candidates: remaining.len(),
        },
    );

    let max_pages = if config.pack_all_items {
        AUTO_EXPAND_HARD_CAP
    } else {
        config.page_count
    };

    let mut sheets = Vec::new();
    let mut sheet_index = 0usize;

    while !remaining.is_empty() && sheet_index < max_pages {
        if cancel.is_cancelled() {
            let placed: usize = sheets.iter().map(|s: &Sheet| s.placements.len()).sum();
            return Err(NestError::Cancelled { placed });
        }
        if sheet_index >= config.page_count {
            tracing::info!(sheet_index, "expanding beyond the requested page count");
            progress::emit(listener, Event::Expanding { sheet_index });
        }

        let result = packer::pack_sheet(sheet, &remaining, &config.packer, listener, cancel);
        let mut placements = result.placements;
        tracing::debug!(
            sheet_index,
            placed = placements.len(),
            remaining_before_gap_fill = remaining.len() - placements.len().min(remaining.len()),
            "sheet primary pass complete"
        );

        let placed_ids: HashSet<&str> = placements.iter().map(|p| p.id.as_str()).collect();
        remaining.retain(|c| !placed_ids.contains(c.id.as_str()));

        if config.gap_filling && config.packer.strategy == StrategyKind::Raster && !remaining.is_empty()
        {
            let (extra, still_unplaced) = gap_fill(sheet, &remaining, &placements, &config.packer);
            tracing::debug!(sheet_index, gap_filled = extra.len(), "gap-filling pass complete");
            placements.extend(extra);
            remaining = still_unplaced;
        }

        let placed_area: f64 = placements
            .iter()
            .filter_map(|p| p.points.as_ref())
            .map(|pts| geometry::shoelace_area(pts))
            .sum();

        let sheet_utilization = utilization(sheet, placed_area);
        if sheet_utilization > 0.9 {
            progress::emit(
                listener,
                Event::Warning {
                    message: crate::model::failure_reason::sheet_nearly_full(sheet_utilization * 100.0),
                },
            );
        }

        sheets.push(Sheet {
            sheet_index,
            placements,
            utilization: sheet_utilization,
        });
        sheet_index += 1;
    }

    let message = if remaining.is_empty() {
        None
    } else {
        if config.pack_all_items && sheet_index >= AUTO_EXPAND_HARD_CAP {
            progress::emit(
                listener,
                Event::Warning {
                    message: format!(
                        "auto-expand hit the {AUTO_EXPAND_HARD_CAP}-sheet cap with {} item(s) still unplaced",
                        remaining.len()
                    ),
                },
            );
        }
        for item in &remaining {
            progress::emit(
                listener,
                Event::Warning {
                    message: format!("'{}' could not be placed within the page budget", item.id),
                },
            );
        }
        Some(format!(
            "{} item(s) could not be placed within {} sheet(s)",
            remaining.len(),
            sheet_index
        ))
    };

    let total_utilization = if sheets.is_empty() {
        0.0
    } else {
        sheets.iter().map(|s| s.utilization).sum::<f64>() / sheets.len() as f64
    };

    let mut quantities: HashMap<String, usize> = HashMap::new();
    for sheet in &sheets {
        for placement in &sheet.placements {
            *quantities.entry(PackablePolygon::design_id(&placement.id).to_string()).or_insert(0) += 1;
        }
    }

    Ok(MultiSheetResult {
        sheets,
        total_utilization,
        quantities,
        items_unplaced: remaining.len(),
        message,
    })
}

/// Second pass over a sheet's leftover instances, smallest-first, to fill
/// gaps the largest-first primary pass left behind. Raster-only: see the
/// design note on why bottom-left/gravity/NFP don't run this pass.
fn gap_fill(
    sheet: SheetSize,
    leftover: &[PackablePolygon],
    existing: &[Placement],
    config: &crate::config::PackerConfig,
) -> (Vec<Placement>, Vec<PackablePolygon>) {
    let mut collision =
        CollisionService::new(sheet, config.spacing, config.offset_join, config.sat_epsilon);
    for p in existing {
        if let Some(pts) = &p.points {
            collision.commit(PlacedShape::new(p.id.clone(), pts.clone()));
        }
    }

    let mut order: Vec<usize> = (0..leftover.len()).collect();
    order.sort_by(|&a, &b| {
        let area_a = leftover[a].width * leftover[a].height;
        let area_b = leftover[b].width * leftover[b].height;
        area_a.partial_cmp(&area_b).unwrap()
    });

    let mut placed_now = Vec::new();
    let mut still_unplaced = Vec::new();

    for idx in order {
        let poly = &leftover[idx];
        let mut found = false;
        'rotation: for &rot in &config.rotations {
            let rotated = geometry::rotate(&poly.points, rot, None);
            let bbox = geometry::bounding_box(&rotated);
            let w = bbox.width();
            let h = bbox.height();
            if w + 2.0 * config.spacing > sheet.width || h + 2.0 * config.spacing > sheet.height {
                continue;
            }
            let normalized = geometry::translate(&rotated, -bbox.min_x, -bbox.min_y);
            let mut y = config.spacing;
            while y + h <= sheet.height - config.spacing {
                let mut x = config.spacing;
                while x + w <= sheet.width - config.spacing {
                    let candidate = geometry::translate(&normalized, x, y);
                    if collision.is_free(&candidate) {
                        collision.commit(PlacedShape::new(poly.id.clone(), candidate.clone()));
                        placed_now.push(Placement {
                            id: poly.id.clone(),
                            x,
                            y,
                            rotation: rot,
                            points: Some(candidate),
                        });
                        found = true;
                        break;
                    }
                    x += config.step_size;
                }
                if found {
                    break;
                }
                y += config.step_size;
            }
            if found {
                break 'rotation;
            }
        }
        if !found {
            still_unplaced.push(poly.clone());
        }
    }

    (placed_now, still_unplaced)
}
