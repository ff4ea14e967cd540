//! Scenario tile grids and the strategy that writes terrain into them.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::binding::ColorTerrainBinding;
use crate::catalog::{TerrainCatalog, TerrainId};
use crate::error::Result;
use crate::grid::Grid;
use crate::palette::Color;

use super::{plan_export, ExportReport, MapExporter};

/// A single scenario tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub terrain_id: TerrainId,
    pub elevation: u8,
}

/// Tile-addressable map owned by a scenario.
///
/// Its size is configured with `set_size` before exporting; exporters write
/// tiles in place and never resize it.
pub trait TargetMap {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    /// Resize the map. Tiles inside both the old and new bounds are kept;
    /// new tiles are covered with `fill`.
    fn set_size(&mut self, width: usize, height: usize, fill: TerrainId);
    fn tile(&self, x: usize, y: usize) -> Option<&Tile>;
    fn tile_mut(&mut self, x: usize, y: usize) -> Option<&mut Tile>;
    fn save(&self, path: &Path) -> Result<()>;

    /// Set the terrain of one tile. Returns false when (x, y) is off the map.
    fn set_terrain(&mut self, x: usize, y: usize, terrain_id: TerrainId) -> bool {
        match self.tile_mut(x, y) {
            Some(tile) => {
                tile.terrain_id = terrain_id;
                true
            }
            None => false,
        }
    }
}

/// Metadata wrapper for the scenario file format.
#[derive(Serialize, Deserialize)]
struct ScenarioFile {
    /// Format version for forward compatibility
    version: u32,
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
}

const SCENARIO_VERSION: u32 = 1;

/// Square-or-rectangular scenario map persisted as JSON.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScenarioMap {
    tiles: Grid<Tile>,
}

impl ScenarioMap {
    /// A `width` × `height` map covered with `base_terrain`.
    pub fn new(width: usize, height: usize, base_terrain: TerrainId) -> Self {
        Self {
            tiles: Grid::new_with(
                width,
                height,
                Tile {
                    terrain_id: base_terrain,
                    elevation: 0,
                },
            ),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let file: ScenarioFile = serde_json::from_str(&text)?;

        if file.version > SCENARIO_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "scenario version {} is newer than supported version {}",
                    file.version, SCENARIO_VERSION
                ),
            )
            .into());
        }

        let tiles = Grid::from_vec(file.width, file.height, file.tiles).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("tile count does not match {}x{}", file.width, file.height),
            )
        })?;
        Ok(Self { tiles })
    }

    pub fn terrain_grid(&self) -> Grid<TerrainId> {
        self.tiles.map(|t| t.terrain_id)
    }
}

impl TargetMap for ScenarioMap {
    fn width(&self) -> usize {
        self.tiles.width
    }

    fn height(&self) -> usize {
        self.tiles.height
    }

    fn set_size(&mut self, width: usize, height: usize, fill: TerrainId) {
        if (width, height) == (self.tiles.width, self.tiles.height) {
            return;
        }
        let blank = Tile {
            terrain_id: fill,
            elevation: 0,
        };
        let old = &self.tiles;
        let resized = Grid::from_fn(width, height, |x, y| {
            if old.in_bounds(x, y) {
                *old.get(x, y)
            } else {
                blank
            }
        });
        log::debug!(
            "resized scenario map from {}x{} to {}x{}",
            old.width,
            old.height,
            width,
            height
        );
        self.tiles = resized;
    }

    fn tile(&self, x: usize, y: usize) -> Option<&Tile> {
        self.tiles.in_bounds(x, y).then(|| self.tiles.get(x, y))
    }

    fn tile_mut(&mut self, x: usize, y: usize) -> Option<&mut Tile> {
        if self.tiles.in_bounds(x, y) {
            Some(self.tiles.get_mut(x, y))
        } else {
            None
        }
    }

    fn save(&self, path: &Path) -> Result<()> {
        let file = ScenarioFile {
            version: SCENARIO_VERSION,
            width: self.tiles.width,
            height: self.tiles.height,
            tiles: self.tiles.as_slice().to_vec(),
        };
        fs::write(path, serde_json::to_vec(&file)?)?;
        Ok(())
    }
}

/// Writes resolved terrain into a [`TargetMap`] and saves it.
pub struct ScenarioExporter<'m, M: TargetMap> {
    map: &'m mut M,
    output: PathBuf,
}

impl<'m, M: TargetMap> ScenarioExporter<'m, M> {
    pub fn new(map: &'m mut M, output: impl Into<PathBuf>) -> Self {
        Self {
            map,
            output: output.into(),
        }
    }
}

impl<M: TargetMap> MapExporter for ScenarioExporter<'_, M> {
    fn export(
        &mut self,
        grid: &Grid<Color>,
        binding: &ColorTerrainBinding,
        catalog: &TerrainCatalog,
    ) -> Result<ExportReport> {
        let plan = plan_export(grid, binding, catalog, self.map.width(), self.map.height())?;

        for a in &plan.assignments {
            self.map.set_terrain(a.x, a.y, a.terrain_id);
            log::trace!("tile ({}, {}) -> {} ({})", a.x, a.y, a.terrain, a.terrain_id);
        }

        self.map.save(&self.output)?;
        log::info!(
            "exported {} tiles to {} ({} colors unbound)",
            plan.report.tiles_written,
            self.output.display(),
            plan.report.omissions.len()
        );
        Ok(plan.report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLUE: Color = Color::new(0, 0, 255);
    const GREEN: Color = Color::new(0, 200, 0);
    const BASE: TerrainId = 0;

    fn checker(size: usize) -> Grid<Color> {
        Grid::from_fn(size, size, |x, y| if (x + y) % 2 == 0 { BLUE } else { GREEN })
    }

    fn bound_all() -> ColorTerrainBinding {
        let mut binding = ColorTerrainBinding::new();
        binding.set(BLUE, "Water");
        binding.set(GREEN, "Forest (Oak)");
        binding
    }

    #[test]
    fn test_export_only_touches_overlap() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = TerrainCatalog::builtin();
        // Grid larger than the map: only the map's 5x5 is written
        let mut map = ScenarioMap::new(5, 5, BASE);
        let report = ScenarioExporter::new(&mut map, dir.path().join("out.json"))
            .export(&checker(8), &bound_all(), &catalog)
            .unwrap();
        assert_eq!(report.tiles_written, 25);

        // Map larger than the grid: tiles past the grid stay at base terrain
        let mut big = ScenarioMap::new(12, 12, 77);
        ScenarioExporter::new(&mut big, dir.path().join("big.json"))
            .export(&checker(8), &bound_all(), &catalog)
            .unwrap();
        for (x, y, tile) in big.tiles.iter() {
            if x >= 8 || y >= 8 {
                assert_eq!(tile.terrain_id, 77, "({}, {}) should be untouched", x, y);
            } else {
                let expected = if (x + y) % 2 == 0 { 1 } else { 10 };
                assert_eq!(tile.terrain_id, expected);
            }
        }
    }

    #[test]
    fn test_export_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = TerrainCatalog::builtin();
        let mut map = ScenarioMap::new(6, 6, BASE);
        let path = dir.path().join("scenario.json");

        ScenarioExporter::new(&mut map, &path).export(&checker(6), &bound_all(), &catalog).unwrap();
        let first = map.clone();
        ScenarioExporter::new(&mut map, &path).export(&checker(6), &bound_all(), &catalog).unwrap();
        assert_eq!(map, first);
    }

    #[test]
    fn test_unbound_tiles_keep_previous_terrain() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = TerrainCatalog::builtin();
        let mut binding = ColorTerrainBinding::new();
        binding.set(BLUE, "Water");

        let mut map = ScenarioMap::new(4, 4, 42);
        let report = ScenarioExporter::new(&mut map, dir.path().join("s.json"))
            .export(&checker(4), &binding, &catalog)
            .unwrap();

        assert_eq!(report.omissions.len(), 1);
        assert_eq!(report.omissions[0].color, GREEN);
        assert_eq!(report.omissions[0].tiles, 8);
        assert_eq!(map.tile(1, 0).unwrap().terrain_id, 42);
        assert_eq!(map.tile(0, 0).unwrap().terrain_id, 1);
    }

    #[test]
    fn test_every_unbound_color_reported_once() {
        const SAND: Color = Color::new(230, 210, 140);
        let dir = tempfile::tempdir().unwrap();
        let catalog = TerrainCatalog::builtin();
        let grid = Grid::from_fn(4, 4, |x, _| match x {
            0 => BLUE,
            1 => GREEN,
            _ => SAND,
        });

        let mut map = ScenarioMap::new(4, 4, 42);
        let before = map.clone();
        let report = ScenarioExporter::new(&mut map, dir.path().join("bare.json"))
            .export(&grid, &ColorTerrainBinding::new(), &catalog)
            .unwrap();

        assert_eq!(report.tiles_written, 0);
        let counts: Vec<_> = report.omissions.iter().map(|o| (o.color, o.tiles)).collect();
        assert_eq!(counts, vec![(BLUE, 4), (GREEN, 4), (SAND, 8)]);
        assert_eq!(map, before);
    }

    #[test]
    fn test_unknown_terrain_aborts_without_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = TerrainCatalog::builtin();
        let mut binding = bound_all();
        binding.set(GREEN, "Not A Terrain");

        let mut map = ScenarioMap::new(4, 4, 5);
        let before = map.clone();
        let path = dir.path().join("never.json");
        let result = ScenarioExporter::new(&mut map, &path).export(&checker(4), &binding, &catalog);

        assert!(result.is_err());
        assert_eq!(map, before);
        assert!(!path.exists());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.json");
        let mut map = ScenarioMap::new(3, 2, 4);
        assert!(map.set_terrain(2, 1, 22));
        assert!(!map.set_terrain(3, 0, 22));
        map.save(&path).unwrap();

        let loaded = ScenarioMap::load(&path).unwrap();
        assert_eq!(loaded, map);
        assert_eq!(loaded.terrain_grid().as_slice(), &[4, 4, 4, 4, 4, 22]);
    }

    #[test]
    fn test_set_size_keeps_overlap() {
        let mut map = ScenarioMap::new(4, 4, 3);
        map.set_terrain(1, 1, 22);
        map.set_terrain(3, 3, 22);

        map.set_size(2, 6, 9);
        assert_eq!((map.width(), map.height()), (2, 6));
        assert_eq!(map.tile(1, 1).unwrap().terrain_id, 22);
        assert_eq!(map.tile(0, 3).unwrap().terrain_id, 3);
        assert_eq!(map.tile(1, 5).unwrap().terrain_id, 9);
        assert!(map.tile(3, 3).is_none());
    }

    #[test]
    fn test_resized_map_bounds_the_export() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = TerrainCatalog::builtin();
        let mut map = ScenarioMap::new(10, 10, BASE);
        map.set_size(3, 3, BASE);

        let report = ScenarioExporter::new(&mut map, dir.path().join("small.json"))
            .export(&checker(8), &bound_all(), &catalog)
            .unwrap();
        assert_eq!((report.width, report.height), (3, 3));
        assert_eq!(report.tiles_written, 9);
        assert_eq!(ScenarioMap::load(&dir.path().join("small.json")).unwrap().width(), 3);
    }

    #[test]
    fn test_load_rejects_mismatched_tiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"version":1,"width":2,"height":2,"tiles":[]}"#).unwrap();
        assert!(ScenarioMap::load(&path).is_err());

        let huge = format!(r#"{{"version":1,"width":{},"height":2,"tiles":[]}}"#, usize::MAX);
        fs::write(&path, huge).unwrap();
        assert!(ScenarioMap::load(&path).is_err());
    }
}
