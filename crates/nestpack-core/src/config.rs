use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{NestError, Result};

/// Single-sheet placement strategy. See spec §4.3–§4.6 for algorithms.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Grid overlay, default for rectangle-like inputs.
    Raster,
    /// Exact-geometry sliding, scored by `x+y`.
    BottomLeft,
    /// Drop-and-slide interlock.
    Gravity,
    /// No-fit-polygon candidate sampler, default for true irregular nesting.
    Nfp,
}

impl FromStr for StrategyKind {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raster" => Ok(Self::Raster),
            "bottom-left" | "bottomleft" | "bl" => Ok(Self::BottomLeft),
            "gravity" => Ok(Self::Gravity),
            "nfp" => Ok(Self::Nfp),
            _ => Err(()),
        }
    }
}

impl Default for StrategyKind {
    fn default() -> Self {
        Self::Nfp
    }
}

/// Minkowski-offset join style, used by `geometry::offset`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    Round,
    Miter,
    Square,
}

/// Shorthand rotation density presets (spec §6). Also adjusts grid resolution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RotationPreset {
    P90,
    P45,
    P15,
    P10,
    P5,
}

impl RotationPreset {
    /// Evenly spaced rotation set in degrees, per spec's `90→4, 45→8, 15→24, 10→36, 5→72` table.
    pub fn rotations(&self) -> Vec<f64> {
        let n = match self {
            Self::P90 => 4,
            Self::P45 => 8,
            Self::P15 => 24,
            Self::P10 => 36,
            Self::P5 => 72,
        };
        (0..n).map(|i| i as f64 * (360.0 / n as f64)).collect()
    }

    /// `(cells_per_inch, step_size)` paired defaults: coarser for denser rotation sets.
    pub fn grid_defaults(&self) -> (f64, f64) {
        match self {
            Self::P90 => (100.0, 0.05),
            Self::P45 => (80.0, 0.06),
            Self::P15 => (50.0, 0.08),
            Self::P10 => (30.0, 0.12),
            Self::P5 => (20.0, 0.2),
        }
    }
}

/// Single-sheet packing configuration (spec §6 option table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackerConfig {
    /// Minimum gap between placed shapes and between shapes and sheet edges, inches.
    pub spacing: f64,
    /// Discrete rotation set tried in order, degrees.
    pub rotations: Vec<f64>,
    /// Grid resolution for the raster strategy.
    pub cells_per_inch: f64,
    /// Fine-grid step for raster/bottom-left, inches.
    pub step_size: f64,
    pub strategy: StrategyKind,
    /// Gate for the pure-NFP candidate rejection variant (spec §4.6).
    pub nfp_exact: bool,
    /// Join style used when dilating shapes for spacing enforcement.
    pub offset_join: JoinType,
    /// SAT overlap epsilon, inch².
    pub sat_epsilon: f64,
}

fn default_rotations() -> Vec<f64> {
    vec![0.0, 90.0, 180.0, 270.0]
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self {
            spacing: 0.0625,
            rotations: default_rotations(),
            cells_per_inch: 100.0,
            step_size: 0.05,
            strategy: StrategyKind::default(),
            nfp_exact: false,
            offset_join: JoinType::Round,
            sat_epsilon: 1e-4,
        }
    }
}

impl PackerConfig {
    pub fn builder() -> PackerConfigBuilder {
        PackerConfigBuilder::new()
    }

    /// Parses a config from JSON, e.g. a file loaded by the CLI.
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Applies a [`RotationPreset`], overwriting `rotations`, `cells_per_inch`, and `step_size`.
    pub fn with_rotation_preset(mut self, preset: RotationPreset) -> Self {
        self.rotations = preset.rotations();
        let (cpi, step) = preset.grid_defaults();
        self.cells_per_inch = cpi;
        self.step_size = step;
        self
    }

    /// Validates configuration invariants.
    ///
    /// Returns [`NestError::InvalidInput`] if spacing is negative, the
    /// rotation set is empty, or the grid resolution/step is non-positive.
    pub fn validate(&self) -> Result<()> {
        if self.spacing < 0.0 {
            return Err(NestError::InvalidInput(format!(
                "spacing must be non-negative (got {})",
                self.spacing
            )));
        }
        if self.rotations.is_empty() {
            return Err(NestError::InvalidInput(
                "rotations must be a non-empty set".into(),
            ));
        }
        if self.rotations.iter().any(|r| !r.is_finite()) {
            return Err(NestError::InvalidInput(
                "rotations must all be finite".into(),
            ));
        }
        if self.cells_per_inch <= 0.0 {
            return Err(NestError::InvalidInput(format!(
                "cells_per_inch must be positive (got {})",
                self.cells_per_inch
            )));
        }
        if self.step_size <= 0.0 {
            return Err(NestError::InvalidInput(format!(
                "step_size must be positive (got {})",
                self.step_size
            )));
        }
        Ok(())
    }
}

/// Builder for [`PackerConfig`] for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct PackerConfigBuilder {
    cfg: PackerConfig,
}

impl PackerConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: PackerConfig::default(),
        }
    }
    pub fn spacing(mut self, v: f64) -> Self {
        self.cfg.spacing = v;
        self
    }
    pub fn rotations(mut self, v: Vec<f64>) -> Self {
        self.cfg.rotations = v;
        self
    }
    pub fn rotation_preset(self, preset: RotationPreset) -> Self {
        Self {
            cfg: self.cfg.with_rotation_preset(preset),
        }
    }
    pub fn cells_per_inch(mut self, v: f64) -> Self {
        self.cfg.cells_per_inch = v;
        self
    }
    pub fn step_size(mut self, v: f64) -> Self {
        self.cfg.step_size = v;
        self
    }
    pub fn strategy(mut self, v: StrategyKind) -> Self {
        self.cfg.strategy = v;
        self
    }
    pub fn nfp_exact(mut self, v: bool) -> Self {
        self.cfg.nfp_exact = v;
        self
    }
    pub fn offset_join(mut self, v: JoinType) -> Self {
        self.cfg.offset_join = v;
        self
    }
    pub fn build(self) -> PackerConfig {
        self.cfg
    }
}

/// Multi-sheet production planner configuration (spec §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub packer: PackerConfig,
    /// Target sheet count. In fixed-pages mode this is also the hard cap.
    pub page_count: usize,
    /// `false` (default): honor `page_count` exactly. `true`: auto-expand until
    /// every candidate is placed or the hard cap (100 sheets) is reached.
    pub pack_all_items: bool,
    /// Optional gap-filling pass after the primary pack. Raster strategy only
    /// (spec §9 Open Question — not run for gravity/NFP in this implementation).
    pub gap_filling: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            packer: PackerConfig::default(),
            page_count: 1,
            pack_all_items: false,
            gap_filling: false,
        }
    }
}

pub const AUTO_EXPAND_HARD_CAP: usize = 100;

impl PlannerConfig {
    pub fn builder() -> PlannerConfigBuilder {
        PlannerConfigBuilder::new()
    }

    /// Parses a config from JSON, e.g. a file loaded by the CLI.
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<()> {
        self.packer.validate()?;
        if self.page_count == 0 {
            return Err(NestError::InvalidInput(
                "page_count must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct PlannerConfigBuilder {
    cfg: PlannerConfig,
}

impl PlannerConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: PlannerConfig::default(),
        }
    }
    pub fn packer(mut self, v: PackerConfig) -> Self {
        self.cfg.packer = v;
        self
    }
    pub fn page_count(mut self, v: usize) -> Self {
        self.cfg.page_count = v;
        self
    }
    pub fn pack_all_items(mut self, v: bool) -> Self {
        self.cfg.pack_all_items = v;
        self
    }
    pub fn gap_filling(mut self, v: bool) -> Self {
        self.cfg.gap_filling = v;
        self
    }
    pub fn build(self) -> PlannerConfig {
        self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packer_config_rejects_negative_spacing() {
        let cfg = PackerConfig::builder().spacing(-0.5).build();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn planner_config_rejects_zero_page_count() {
        let cfg = PlannerConfig::builder().page_count(0).build();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rotation_preset_produces_evenly_spaced_angles() {
        let angles = RotationPreset::P90.rotations();
        assert_eq!(angles, vec![0.0, 90.0, 180.0, 270.0]);
        assert_eq!(RotationPreset::P45.rotations().len(), 8);
    }

    #[test]
    fn packer_config_round_trips_through_json() {
        let cfg = PackerConfig::builder().spacing(0.2).strategy(StrategyKind::Gravity).build();
        let json = cfg.to_json().unwrap();
        let restored = PackerConfig::from_json(&json).unwrap();
        assert_eq!(restored.spacing, cfg.spacing);
        assert_eq!(restored.strategy, cfg.strategy);
    }

    #[test]
    fn planner_config_round_trips_through_json() {
        let cfg = PlannerConfig::builder().page_count(4).pack_all_items(true).build();
        let json = cfg.to_json().unwrap();
        let restored = PlannerConfig::from_json(&json).unwrap();
        assert_eq!(restored.page_count, cfg.page_count);
        assert_eq!(restored.pack_all_items, cfg.pack_all_items);
    }

    #[test]
    fn strategy_kind_parses_common_aliases() {
        assert_eq!("raster".parse::<StrategyKind>().unwrap(), StrategyKind::Raster);
        assert_eq!("bottom-left".parse::<StrategyKind>().unwrap(), StrategyKind::BottomLeft);
        assert_eq!("BL".parse::<StrategyKind>().unwrap(), StrategyKind::BottomLeft);
        assert!("unknown".parse::<StrategyKind>().is_err());
    }
}
