//! Pipeline configuration: named map sizes, rotation, export format and the
//! tunables for normalization, clustering and preview.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::binding::CarryOver;
use crate::error::{MapGenError, Result};

pub const MAX_COLORS: usize = 20;
pub const MAX_SIMPLIFICATION: u32 = 50;

/// Named map sizes offered by the scenario editor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MapSize {
    Tiny,
    Small,
    Medium,
    Normal,
    Large,
    Giant,
    #[default]
    Ludikrous,
}

impl MapSize {
    pub fn all() -> &'static [Self] {
        &[
            Self::Tiny,
            Self::Small,
            Self::Medium,
            Self::Normal,
            Self::Large,
            Self::Giant,
            Self::Ludikrous,
        ]
    }

    /// Side length in tiles
    pub fn tiles(&self) -> u32 {
        match self {
            Self::Tiny => 120,
            Self::Small => 144,
            Self::Medium => 168,
            Self::Normal => 200,
            Self::Large => 220,
            Self::Giant => 240,
            Self::Ludikrous => 480,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Tiny => "Tiny",
            Self::Small => "Small",
            Self::Medium => "Medium",
            Self::Normal => "Normal",
            Self::Large => "Large",
            Self::Giant => "Giant",
            Self::Ludikrous => "Ludikrous",
        }
    }
}

impl std::fmt::Display for MapSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.label(), self.tiles())
    }
}

/// Rotation applied after blurring, before the final resize
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    /// Keep the image axis-aligned
    #[default]
    None,
    /// Rotate 45° clockwise for a diamond-oriented map
    Diagonal,
}

impl Rotation {
    /// Counter-clockwise angle, as taken by `normalize::rotate_expand`.
    pub fn degrees(&self) -> f32 {
        match self {
            Self::None => 0.0,
            Self::Diagonal => -45.0,
        }
    }
}

/// Output written by the exporter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Write terrain ids into a scenario tile grid and save it
    #[default]
    Scenario,
    /// Write a commented map script listing every tile's terrain
    Script,
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scenario => write!(f, "scenario"),
            Self::Script => write!(f, "script"),
        }
    }
}

/// All parameters of one pipeline run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Palette size K (1-20)
    pub colors: usize,
    /// Blur radius applied before quantization (0 = none, max 50)
    pub simplification: u32,
    pub map_size: MapSize,
    /// Overrides `map_size` when set
    pub target_size: Option<u32>,
    pub rotation: Rotation,
    /// Clustering seed
    pub seed: u64,
    pub max_iterations: usize,
    /// Convergence threshold on centroid movement, colors scaled to 0..1
    pub tolerance: f64,
    /// Independent seeded k-means runs; the lowest score wins
    pub restarts: usize,
    /// Side length of the preview image in pixels
    pub display_size: u32,
    /// How long a flash highlight stays before reverting
    pub flash_millis: u64,
    pub carry_over: CarryOver,
    pub export_format: ExportFormat,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            colors: 2,
            simplification: 0,
            map_size: MapSize::default(),
            target_size: None,
            rotation: Rotation::default(),
            seed: 0,
            max_iterations: 300,
            tolerance: 1e-4,
            restarts: 4,
            display_size: 500,
            flash_millis: 500,
            carry_over: CarryOver::default(),
            export_format: ExportFormat::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file; absent fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Side length of the normalized image and of the target map.
    pub fn target_size(&self) -> u32 {
        self.target_size.unwrap_or_else(|| self.map_size.tiles())
    }

    pub fn validate(&self) -> Result<()> {
        if self.colors == 0 || self.colors > MAX_COLORS {
            return Err(MapGenError::InvalidColorCount(self.colors));
        }
        if self.simplification > MAX_SIMPLIFICATION {
            return Err(MapGenError::InvalidSimplification(self.simplification));
        }
        if self.target_size() == 0 {
            return Err(MapGenError::InvalidTargetSize(0));
        }
        Ok(())
    }
}
