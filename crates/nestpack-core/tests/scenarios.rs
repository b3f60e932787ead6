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

fn rect(id: &str, w: f64, h: f64) -> PackablePolygon {
    PackablePolygon::new(
        id,
        vec![
            Point::new(0.0, 0.0),
            Point::new(w, 0.0),
            Point::new(w, h),
            Point::new(0.0, h),
        ],
    )
    .unwrap()
}

#[test]
fn single_item_on_a_roomy_sheet_places_cleanly() {
    let config = PackerConfig::default();
    let result = pack(
        SheetSize::new(24.0, 24.0),
        &[square("lone", 4.0)],
        &config,
        None,
        &CancellationToken::new(),
    )
    .unwrap();
    assert_eq!(result.placements.len(), 1);
    assert!(result.unplaced.is_empty());
}

#[test]
fn item_larger_than_the_sheet_is_reported_unplaced() {
    let config = PackerConfig::default();
    let result = pack(
        SheetSize::new(5.0, 5.0),
        &[square("giant", 20.0)],
        &config,
        None,
        &CancellationToken::new(),
    )
    .unwrap();
    assert!(result.placements.is_empty());
    assert_eq!(result.unplaced.len(), 1);
}

#[test]
fn item_exactly_matching_the_sheet_minus_spacing_still_fits() {
    let spacing = 0.1;
    let config = PackerConfig::builder().spacing(spacing).rotations(vec![0.0]).build();
    let side = 10.0 - 2.0 * spacing;
    let result = pack(
        SheetSize::new(10.0, 10.0),
        &[square("exact", side)],
        &config,
        None,
        &CancellationToken::new(),
    )
    .unwrap();
    assert_eq!(result.placements.len(), 1);
}

#[test]
fn a_grid_of_identical_rectangles_tiles_without_gaps_in_raster_mode() {
    let config = PackerConfig::builder()
        .strategy(StrategyKind::Raster)
        .spacing(0.0)
        .rotations(vec![0.0])
        .step_size(0.5)
        .build();
    let candidates: Vec<PackablePolygon> = (0..16).map(|i| rect(&format!("r{i}"), 3.0, 2.0)).collect();
    let result = pack(
        SheetSize::new(12.0, 8.0),
        &candidates,
        &config,
        None,
        &CancellationToken::new(),
    )
    .unwrap();
    assert_eq!(result.placements.len(), 16);
    assert!(result.utilization > 0.95);
}

#[test]
fn a_rectangle_that_only_fits_after_rotation_requires_the_90_degree_option() {
    let tall = rect("tall", 2.0, 9.0);
    let sheet = SheetSize::new(10.0, 3.0);

    let no_rotation = PackerConfig::builder().rotations(vec![0.0]).build();
    let only_upright = pack(
        sheet,
        &[tall.clone()],
        &no_rotation,
        None,
        &CancellationToken::new(),
    )
    .unwrap();
    assert!(only_upright.placements.is_empty());

    let with_rotation = PackerConfig::builder().rotations(vec![0.0, 90.0]).build();
    let rotated = pack(sheet, &[tall], &with_rotation, None, &CancellationToken::new()).unwrap();
    assert_eq!(rotated.placements.len(), 1);
}

#[test]
fn overflow_beyond_a_fixed_page_budget_is_rejected_before_packing_starts() {
    let config = PlannerConfig::builder()
        .packer(PackerConfig::builder().spacing(0.05).build())
        .page_count(1)
        .pack_all_items(false)
        .build();
    let items = vec![(square("tile", 4.0), 20)];
    let result = pack_multi(
        SheetSize::new(10.0, 10.0),
        &items,
        &config,
        None,
        &CancellationToken::new(),
    );
    assert!(matches!(result, Err(NestError::InsufficientSpace { .. })));
}

#[test]
fn a_catalog_that_fits_the_area_estimate_can_still_leave_items_unplaced() {
    // Four 6"x6" squares only fit one-per-sheet on a 10"x10" sheet (two side
    // by side would need 12" of width), so three pages hold three of them —
    // but their combined area (144 in²) stays under the gate's 50%-of-three-
    // pages floor (150 in²), so the pack proceeds instead of erroring.
    let config = PlannerConfig::builder()
        .packer(PackerConfig::builder().spacing(0.05).build())
        .page_count(3)
        .pack_all_items(false)
        .build();
    let items = vec![(square("crate-panel", 6.0), 4)];
    let result = pack_multi(
        SheetSize::new(10.0, 10.0),
        &items,
        &config,
        None,
        &CancellationToken::new(),
    )
    .unwrap();
    assert_eq!(result.sheets.len(), 3);
    assert_eq!(result.items_unplaced, 1);
    assert_eq!(result.quantities.get("crate-panel"), Some(&3));
    assert!(result.message.is_some());
}

#[test]
fn an_empty_catalog_produces_an_empty_plan_with_no_warning() {
    let config = PlannerConfig::default();
    let items: Vec<(PackablePolygon, usize)> = vec![];
    let result = pack_multi(
        SheetSize::new(10.0, 10.0),
        &items,
        &config,
        None,
        &CancellationToken::new(),
    )
    .unwrap();
    assert!(result.sheets.is_empty());
    assert!(result.message.is_none());
    assert_eq!(result.stats().items_placed, 0);
}
