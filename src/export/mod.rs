//! Grid export: quantized colors → terrain identifiers on a target map.
//!
//! Every strategy goes through [`plan_export`], which walks the region shared
//! by the grid and the map, resolves each color through the binding and the
//! catalog, and collects unbound colors into the report. A binding naming an
//! unknown terrain fails the plan before any strategy writes anything.
//!
//! Coordinates outside `min(grid, map)` are never visited.

pub mod scenario;
pub mod script;

use std::collections::HashMap;

use crate::binding::ColorTerrainBinding;
use crate::catalog::{TerrainCatalog, TerrainId};
use crate::config::ExportFormat;
use crate::error::{MapGenError, Result};
use crate::grid::Grid;
use crate::palette::Color;

pub use scenario::{ScenarioExporter, ScenarioMap, TargetMap, Tile};
pub use script::ScriptExporter;

/// One resolved tile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileAssignment<'a> {
    pub x: usize,
    pub y: usize,
    pub terrain_id: TerrainId,
    pub terrain: &'a str,
}

/// A palette color that had no terrain bound during export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Omission {
    pub color: Color,
    /// First coordinate (row-major) where the color was met
    pub first_seen: (usize, usize),
    /// Number of tiles left untouched because of this color
    pub tiles: usize,
}

/// Summary of an export run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Width of the exported region, `min(grid width, map width)`
    pub width: usize,
    /// Height of the exported region, `min(grid height, map height)`
    pub height: usize,
    pub tiles_written: usize,
    /// One entry per distinct unbound color, in order of first appearance
    pub omissions: Vec<Omission>,
}

impl ExportReport {
    pub fn is_complete(&self) -> bool {
        self.omissions.is_empty()
    }

    pub fn omitted_tiles(&self) -> usize {
        self.omissions.iter().map(|o| o.tiles).sum()
    }
}

/// Resolved assignments plus the omission report, before anything is written.
#[derive(Clone, Debug)]
pub struct ExportPlan<'a> {
    pub assignments: Vec<TileAssignment<'a>>,
    pub report: ExportReport,
}

/// Resolve every in-bounds tile of `grid` against a `map_width` × `map_height` map.
pub fn plan_export<'a>(
    grid: &Grid<Color>,
    binding: &'a ColorTerrainBinding,
    catalog: &TerrainCatalog,
    map_width: usize,
    map_height: usize,
) -> Result<ExportPlan<'a>> {
    let width = grid.width.min(map_width);
    let height = grid.height.min(map_height);

    let mut resolved: HashMap<Color, TerrainId> = HashMap::new();
    let mut omission_index: HashMap<Color, usize> = HashMap::new();
    let mut omissions: Vec<Omission> = Vec::new();
    let mut assignments = Vec::with_capacity(width * height);

    for y in 0..height {
        for x in 0..width {
            let color = *grid.get(x, y);

            let Some(terrain) = binding.get(&color) else {
                match omission_index.get(&color) {
                    Some(&i) => omissions[i].tiles += 1,
                    None => {
                        log::warn!("no terrain defined for color {} (first at {}, {})", color, x, y);
                        omission_index.insert(color, omissions.len());
                        omissions.push(Omission {
                            color,
                            first_seen: (x, y),
                            tiles: 1,
                        });
                    }
                }
                continue;
            };

            let terrain_id = match resolved.get(&color) {
                Some(&id) => id,
                None => {
                    let id = catalog.id_of(terrain).ok_or_else(|| MapGenError::UnknownTerrain {
                        name: terrain.to_string(),
                        color,
                        x,
                        y,
                    })?;
                    resolved.insert(color, id);
                    id
                }
            };

            assignments.push(TileAssignment {
                x,
                y,
                terrain_id,
                terrain,
            });
        }
    }

    let report = ExportReport {
        width,
        height,
        tiles_written: assignments.len(),
        omissions,
    };
    Ok(ExportPlan { assignments, report })
}

/// An export target. Implementations differ only in where resolved tiles go.
pub trait MapExporter {
    fn export(
        &mut self,
        grid: &Grid<Color>,
        binding: &ColorTerrainBinding,
        catalog: &TerrainCatalog,
    ) -> Result<ExportReport>;
}

/// Pick the exporter for `format`. The scenario map is only used by the
/// scenario strategy; the script strategy takes its bounds from it.
pub fn exporter_for<'m, M: TargetMap + 'm>(
    format: ExportFormat,
    map: &'m mut M,
    output: impl Into<std::path::PathBuf>,
) -> Box<dyn MapExporter + 'm> {
    let output = output.into();
    match format {
        ExportFormat::Scenario => Box::new(ScenarioExporter::new(map, output)),
        ExportFormat::Script => Box::new(ScriptExporter::new(map.width(), map.height(), output)),
    }
}
