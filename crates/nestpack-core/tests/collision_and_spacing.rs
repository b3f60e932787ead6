use nestpack_core::geometry;
use nestpack_core::prelude::*;

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

fn assert_no_overlaps(placements: &[Placement], epsilon: f64) {
    for i in 0..placements.len() {
        for j in (i + 1)..placements.len() {
            let a = placements[i].points.as_ref().unwrap();
            let b = placements[j].points.as_ref().unwrap();
            assert!(
                !geometry::sat_overlap(a, b, epsilon),
                "placements {} and {} overlap",
                placements[i].id,
                placements[j].id
            );
        }
    }
}

fn assert_within_sheet(placements: &[Placement], sheet: SheetSize, spacing: f64) {
    for p in placements {
        let pts = p.points.as_ref().unwrap();
        let bbox = geometry::bounding_box(pts);
        assert!(bbox.min_x >= spacing - 1e-6, "{} crosses left edge", p.id);
        assert!(bbox.min_y >= spacing - 1e-6, "{} crosses bottom edge", p.id);
        assert!(
            bbox.max_x <= sheet.width - spacing + 1e-6,
            "{} crosses right edge",
            p.id
        );
        assert!(
            bbox.max_y <= sheet.height - spacing + 1e-6,
            "{} crosses top edge",
            p.id
        );
    }
}

#[test]
fn raster_strategy_never_overlaps_and_respects_spacing() {
    let config = PackerConfig::builder()
        .strategy(StrategyKind::Raster)
        .spacing(0.1)
        .step_size(0.2)
        .build();
    let candidates: Vec<PackablePolygon> = (0..6).map(|i| square(&format!("s{i}"), 2.0)).collect();
    let result = pack(
        SheetSize::new(10.0, 10.0),
        &candidates,
        &config,
        None,
        &CancellationToken::new(),
    )
    .unwrap();
    assert!(!result.placements.is_empty());
    assert_no_overlaps(&result.placements, config.sat_epsilon);
    assert_within_sheet(&result.placements, SheetSize::new(10.0, 10.0), config.spacing);
}

#[test]
fn bottom_left_strategy_never_overlaps_and_respects_spacing() {
    let config = PackerConfig::builder()
        .strategy(StrategyKind::BottomLeft)
        .spacing(0.15)
        .step_size(0.25)
        .build();
    let candidates: Vec<PackablePolygon> = (0..5).map(|i| square(&format!("s{i}"), 1.5)).collect();
    let result = pack(
        SheetSize::new(8.0, 8.0),
        &candidates,
        &config,
        None,
        &CancellationToken::new(),
    )
    .unwrap();
    assert_no_overlaps(&result.placements, config.sat_epsilon);
    assert_within_sheet(&result.placements, SheetSize::new(8.0, 8.0), config.spacing);
}

#[test]
fn gravity_strategy_never_overlaps_and_respects_spacing() {
    let config = PackerConfig::builder()
        .strategy(StrategyKind::Gravity)
        .spacing(0.1)
        .step_size(0.2)
        .build();
    let candidates: Vec<PackablePolygon> = (0..5).map(|i| square(&format!("s{i}"), 1.8)).collect();
    let result = pack(
        SheetSize::new(9.0, 9.0),
        &candidates,
        &config,
        None,
        &CancellationToken::new(),
    )
    .unwrap();
    assert_no_overlaps(&result.placements, config.sat_epsilon);
    assert_within_sheet(&result.placements, SheetSize::new(9.0, 9.0), config.spacing);
}

#[test]
fn nfp_strategy_never_overlaps_and_respects_spacing() {
    let config = PackerConfig::builder()
        .strategy(StrategyKind::Nfp)
        .spacing(0.1)
        .nfp_exact(true)
        .build();
    let candidates: Vec<PackablePolygon> = (0..5).map(|i| square(&format!("s{i}"), 1.8)).collect();
    let result = pack(
        SheetSize::new(9.0, 9.0),
        &candidates,
        &config,
        None,
        &CancellationToken::new(),
    )
    .unwrap();
    assert_no_overlaps(&result.placements, config.sat_epsilon);
    assert_within_sheet(&result.placements, SheetSize::new(9.0, 9.0), config.spacing);
}

#[test]
fn utilization_is_always_within_unit_range() {
    let config = PackerConfig::builder().strategy(StrategyKind::Raster).build();
    let candidates: Vec<PackablePolygon> = (0..10).map(|i| square(&format!("s{i}"), 3.0)).collect();
    let result = pack(
        SheetSize::new(10.0, 10.0),
        &candidates,
        &config,
        None,
        &CancellationToken::new(),
    )
    .unwrap();
    assert!(result.utilization >= 0.0 && result.utilization <= 1.0);
}

#[test]
fn unplaced_items_carry_a_known_reason() {
    let config = PackerConfig::builder().strategy(StrategyKind::Raster).build();
    let candidates: Vec<PackablePolygon> = (0..20).map(|i| square(&format!("s{i}"), 3.0)).collect();
    let result = pack(
        SheetSize::new(10.0, 10.0),
        &candidates,
        &config,
        None,
        &CancellationToken::new(),
    )
    .unwrap();
    assert!(!result.unplaced.is_empty());
    for item in &result.unplaced {
        assert!(
            item.reason == failure_reason_too_large()
                || item.reason == failure_reason_no_rotation()
                || item.reason == failure_reason_no_collision_free()
                || item.reason.starts_with("sheet nearly full"),
            "unexpected reason: {}",
            item.reason
        );
    }
}

fn failure_reason_too_large() -> String {
    nestpack_core::model::failure_reason::TOO_LARGE.to_string()
}
fn failure_reason_no_rotation() -> String {
    nestpack_core::model::failure_reason::NO_ROTATION_FITS.to_string()
}
fn failure_reason_no_collision_free() -> String {
    nestpack_core::model::failure_reason::NO_COLLISION_FREE_POSITION.to_string()
}
