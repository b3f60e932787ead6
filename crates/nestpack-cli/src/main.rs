use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};

use nestpack_core::prelude::*;
use nestpack_core::units;
use tracing::info;

/// Nest irregular 2D shapes onto one or more sheets.
#[derive(Debug, Parser)]
#[command(name = "nestpack", version, about, long_about = None)]
struct Cli {
    /// Path to a JSON design file: an array of `{ id, points, quantity }`.
    design: PathBuf,

    /// Sheet width, millimeters.
    #[arg(long, default_value_t = 609.6)]
    width_mm: f64,

    /// Sheet height, millimeters.
    #[arg(long, default_value_t = 914.4)]
    height_mm: f64,

    /// Minimum spacing between shapes and sheet edges, millimeters.
    #[arg(long, default_value_t = 1.5875)]
    spacing_mm: f64,

    /// Placement strategy: raster, bottom-left, gravity, or nfp.
    #[arg(long, default_value = "nfp")]
    strategy: String,

    /// Rotation density preset: 90, 45, 15, 10, or 5 (degrees).
    #[arg(long)]
    rotation_preset: Option<u16>,

    /// Number of sheets to plan for.
    #[arg(long, default_value_t = 1)]
    pages: usize,

    /// Keep adding sheets (up to the hard cap) until every item is placed.
    #[arg(long)]
    pack_all: bool,

    /// Run a raster gap-filling pass after the primary placement.
    #[arg(long)]
    gap_fill: bool,

    /// Only print the pre-flight area estimate; don't run a full pack.
    #[arg(long)]
    estimate_only: bool,

    /// Write JSON output here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct DesignEntry {
    id: String,
    /// Polygon vertices, millimeters, `[x, y]` pairs.
    points: Vec<[f64; 2]>,
    #[serde(default = "default_quantity")]
    quantity: usize,
}

fn default_quantity() -> usize {
    1
}

#[derive(Debug, Serialize)]
struct CliOutput {
    sheets_used: usize,
    items_placed: usize,
    items_unplaced: usize,
    total_utilization: f64,
    result: MultiSheetResult,
}

struct CliProgress {
    bar: ProgressBar,
}

impl ProgressListener for CliProgress {
    fn on_event(&self, event: Event) {
        match event {
            Event::Estimating { candidates } => {
                self.bar.set_length(candidates as u64);
                self.bar.set_message("estimating");
            }
            Event::Trying { id, index, total, .. } => {
                self.bar.set_message(format!("trying {id} ({}/{total})", index + 1));
            }
            Event::Placed { id, index, total, .. } => {
                self.bar.set_message(format!("placed {id} ({}/{total})", index + 1));
                self.bar.inc(1);
            }
            Event::Failed { id, reason, positions_tried, rotations_tried, .. } => {
                self.bar.set_message(format!(
                    "failed {id}: {reason} ({positions_tried} position(s), {rotations_tried} rotation(s) tried)"
                ));
            }
            Event::Expanding { sheet_index } => {
                self.bar.set_message(format!("expanding to sheet {sheet_index}"));
            }
            Event::Warning { message } => {
                self.bar.println(format!("warning: {message}"));
            }
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let raw = fs::read_to_string(&cli.design)
        .with_context(|| format!("reading design file {}", cli.design.display()))?;
    let entries: Vec<DesignEntry> =
        serde_json::from_str(&raw).with_context(|| "parsing design file as JSON")?;
    if entries.is_empty() {
        anyhow::bail!("design file contains no entries");
    }
    info!(designs = entries.len(), path = %cli.design.display(), "loaded design file");

    let items: Vec<(PackablePolygon, usize)> = entries
        .into_iter()
        .map(|entry| {
            let points: Vec<Point> = entry.points.iter().map(|[x, y]| Point::new(*x, *y)).collect();
            let design = PackablePolygon::from_mm_points(entry.id, points)
                .with_context(|| "building polygon from design entry")?;
            Ok((design, entry.quantity))
        })
        .collect::<Result<Vec<_>>>()?;

    let strategy: StrategyKind = cli
        .strategy
        .parse()
        .map_err(|_| anyhow::anyhow!("unknown strategy '{}'", cli.strategy))?;

    let mut packer_builder = PackerConfig::builder()
        .spacing(units::mm_to_in(cli.spacing_mm))
        .strategy(strategy);
    if let Some(preset) = cli.rotation_preset {
        let preset = match preset {
            90 => RotationPreset::P90,
            45 => RotationPreset::P45,
            15 => RotationPreset::P15,
            10 => RotationPreset::P10,
            5 => RotationPreset::P5,
            other => anyhow::bail!("unsupported rotation preset '{other}' (use 90, 45, 15, 10, or 5)"),
        };
        packer_builder = packer_builder.rotation_preset(preset);
    }
    let packer_config = packer_builder.build();

    let planner_config = PlannerConfig::builder()
        .packer(packer_config)
        .page_count(cli.pages)
        .pack_all_items(cli.pack_all)
        .gap_filling(cli.gap_fill)
        .build();
    planner_config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    let sheet = SheetSize::new(units::mm_to_in(cli.width_mm), units::mm_to_in(cli.height_mm));

    if cli.estimate_only {
        let est = estimate(sheet, &items, &planner_config);
        let json = serde_json::to_string_pretty(&est)?;
        println!("{json}");
        return Ok(());
    }

    let bar = ProgressBar::new(items.iter().map(|(_, qty)| *qty as u64).sum());
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
            .unwrap(),
    );
    let listener = CliProgress { bar: bar.clone() };
    let cancel = CancellationToken::new();

    let result = pack_multi(sheet, &items, &planner_config, Some(&listener), &cancel)?;
    bar.finish_and_clear();

    let stats = result.stats();
    info!(
        sheets_used = stats.sheets_used,
        items_placed = stats.items_placed,
        items_unplaced = stats.items_unplaced,
        "pack complete"
    );
    let mut result = result;
    for sheet in &mut result.sheets {
        for placement in &mut sheet.placements {
            *placement = placement.to_mm();
        }
    }
    let output = CliOutput {
        sheets_used: stats.sheets_used,
        items_placed: stats.items_placed,
        items_unplaced: stats.items_unplaced,
        total_utilization: result.total_utilization,
        result,
    };
    let json = serde_json::to_string_pretty(&output)?;

    match cli.output {
        Some(path) => fs::write(&path, json)
            .with_context(|| format!("writing output to {}", path.display()))?,
        None => println!("{json}"),
    }

    Ok(())
}
