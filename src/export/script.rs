//! Commented map-script output.
//!
//! A fixed land-generation header followed by one comment line per resolved
//! tile. The annotations describe the map; they are not commands a script
//! engine would execute.

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use crate::binding::ColorTerrainBinding;
use crate::catalog::TerrainCatalog;
use crate::error::Result;
use crate::grid::Grid;
use crate::palette::Color;

use super::{plan_export, ExportPlan, ExportReport, MapExporter};

const HEADER: &str = "\
<PLAYER_SETUP>
random_placement

<LAND_GENERATION>
base_terrain GRASS

<TERRAIN_GENERATION>
";

pub struct ScriptExporter {
    width: usize,
    height: usize,
    output: PathBuf,
}

impl ScriptExporter {
    /// Export against a map of `width` × `height` tiles.
    pub fn new(width: usize, height: usize, output: impl Into<PathBuf>) -> Self {
        Self {
            width,
            height,
            output: output.into(),
        }
    }

    /// Script text for a resolved plan.
    pub fn render(&self, plan: &ExportPlan<'_>) -> String {
        let mut out = String::with_capacity(HEADER.len() + plan.assignments.len() * 32);
        let _ = writeln!(
            out,
            "/* Map script generated from a bitmap: {}x{} tiles, {} assigned */",
            self.width, self.height, plan.report.tiles_written
        );
        out.push_str(HEADER);
        out.push('\n');

        for a in &plan.assignments {
            let _ = writeln!(out, "/* Tile ({}, {}): {} [{}] */", a.x, a.y, a.terrain, a.terrain_id);
        }
        for o in &plan.report.omissions {
            let _ = writeln!(out, "/* Unassigned color {}: {} tiles left as base terrain */", o.color, o.tiles);
        }
        out
    }
}

impl MapExporter for ScriptExporter {
    fn export(
        &mut self,
        grid: &Grid<Color>,
        binding: &ColorTerrainBinding,
        catalog: &TerrainCatalog,
    ) -> Result<ExportReport> {
        let plan = plan_export(grid, binding, catalog, self.width, self.height)?;
        fs::write(&self.output, self.render(&plan))?;
        log::info!(
            "wrote map script for {} tiles to {}",
            plan.report.tiles_written,
            self.output.display()
        );
        Ok(plan.report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_lists_every_assigned_tile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.rms");
        let catalog = TerrainCatalog::builtin();
        let water = Color::new(0, 0, 200);
        let sand = Color::new(230, 210, 150);
        let grid = Grid::from_fn(3, 3, |x, _| if x == 0 { water } else { sand });

        let mut binding = ColorTerrainBinding::new();
        binding.set(water, "Water");

        // Map is 2 wide: column 2 is never visited
        let report = ScriptExporter::new(2, 3, &path).export(&grid, &binding, &catalog).unwrap();
        assert_eq!(report.tiles_written, 3);
        assert_eq!(report.omitted_tiles(), 3);

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("<LAND_GENERATION>"));
        assert!(text.contains("/* Tile (0, 2): Water [1] */"));
        assert!(!text.contains("Tile (2, 0)"));
        assert!(text.contains("Unassigned color #e6d296: 3 tiles"));
        assert_eq!(text.lines().filter(|l| l.starts_with("/* Tile")).count(), 3);
    }

    #[test]
    fn test_script_fails_before_writing_on_unknown_terrain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.rms");
        let grid = Grid::new_with(2, 2, Color::BLACK);
        let mut binding = ColorTerrainBinding::new();
        binding.set(Color::BLACK, "Void");

        let result = ScriptExporter::new(2, 2, &path).export(&grid, &binding, &TerrainCatalog::builtin());
        assert!(result.is_err());
        assert!(!path.exists());
    }
}
