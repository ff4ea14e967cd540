//! Palette binder: which terrain each palette color should become.
//!
//! A plain map from exact `Color` to terrain name. Colors may be present but
//! unbound (`None`), which is how a freshly generated palette starts out.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::TerrainCatalog;
use crate::error::Result;
use crate::palette::{Color, Palette};

/// What happens to existing bindings when the palette is regenerated
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CarryOver {
    /// Start every regeneration unbound
    Reset,
    /// Keep bindings for colors that reappear exactly
    #[default]
    Exact,
    /// Each new color inherits the binding of the closest previously bound color
    Nearest,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorTerrainBinding {
    entries: BTreeMap<Color, Option<String>>,
}

impl ColorTerrainBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// One unbound entry per distinct palette color.
    pub fn for_palette(palette: &Palette) -> Self {
        Self {
            entries: palette.iter().map(|&c| (c, None)).collect(),
        }
    }

    /// Bind `color` to `terrain`, returning the previous terrain if any.
    pub fn set(&mut self, color: Color, terrain: impl Into<String>) -> Option<String> {
        self.entries.insert(color, Some(terrain.into())).flatten()
    }

    /// Mark `color` as unbound, keeping its entry.
    pub fn clear(&mut self, color: Color) -> Option<String> {
        self.entries.get_mut(&color).and_then(Option::take)
    }

    /// Terrain bound to exactly this color.
    pub fn get(&self, color: &Color) -> Option<&str> {
        self.entries.get(color).and_then(|t| t.as_deref())
    }

    pub fn is_bound(&self, color: &Color) -> bool {
        self.get(color).is_some()
    }

    pub fn bound_count(&self) -> usize {
        self.entries.values().filter(|t| t.is_some()).count()
    }

    /// Palette colors without a terrain, in palette order, deduplicated.
    pub fn unbound_colors(&self, palette: &Palette) -> Vec<Color> {
        palette
            .distinct()
            .into_iter()
            .filter(|c| !self.is_bound(c))
            .collect()
    }

    /// All entries, bound or not, in color order.
    pub fn iter(&self) -> impl Iterator<Item = (&Color, Option<&str>)> {
        self.entries.iter().map(|(c, t)| (c, t.as_deref()))
    }

    /// Bindings whose terrain name the catalog does not contain.
    pub fn validate(&self, catalog: &TerrainCatalog) -> Vec<(Color, String)> {
        self.entries
            .iter()
            .filter_map(|(c, t)| t.as_ref().map(|t| (*c, t)))
            .filter(|(_, t)| !catalog.contains(t))
            .map(|(c, t)| (c, t.clone()))
            .collect()
    }

    /// Build the binding for a regenerated `palette` from this one.
    pub fn carry_over(&self, palette: &Palette, policy: CarryOver) -> Self {
        let mut next = Self::for_palette(palette);
        if policy == CarryOver::Reset {
            return next;
        }

        let bound = Palette::new(
            self.entries
                .iter()
                .filter(|(_, t)| t.is_some())
                .map(|(c, _)| *c)
                .collect(),
        );

        for (color, terrain) in next.entries.iter_mut() {
            let inherited = match policy {
                CarryOver::Reset => None,
                CarryOver::Exact => self.get(color),
                CarryOver::Nearest => bound.nearest(color).and_then(|c| self.get(&c)),
            };
            *terrain = inherited.map(str::to_string);
        }

        log::debug!(
            "carried over {} of {} bindings ({:?})",
            next.bound_count(),
            bound.len(),
            policy
        );
        next
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palette() -> Palette {
        Palette::new(vec![Color::new(0, 0, 255), Color::new(0, 200, 0), Color::new(250, 250, 250)])
    }

    #[test]
    fn test_fresh_binding_is_unbound() {
        let binding = ColorTerrainBinding::for_palette(&palette());
        assert_eq!(binding.bound_count(), 0);
        assert_eq!(binding.unbound_colors(&palette()).len(), 3);
        assert_eq!(binding.iter().count(), 3);
    }

    #[test]
    fn test_lookup_is_exact() {
        let mut binding = ColorTerrainBinding::for_palette(&palette());
        binding.set(Color::new(0, 0, 255), "Water");

        assert_eq!(binding.get(&Color::new(0, 0, 255)), Some("Water"));
        assert_eq!(binding.get(&Color::new(0, 0, 254)), None);
    }

    #[test]
    fn test_set_and_clear() {
        let mut binding = ColorTerrainBinding::new();
        let c = Color::new(1, 2, 3);
        assert_eq!(binding.set(c, "Snow"), None);
        assert_eq!(binding.set(c, "Ice (Solid)"), Some("Snow".to_string()));
        assert_eq!(binding.clear(c), Some("Ice (Solid)".to_string()));
        assert!(!binding.is_bound(&c));
        assert_eq!(binding.iter().count(), 1);
    }

    #[test]
    fn test_validate_against_catalog() {
        let catalog = TerrainCatalog::builtin();
        let mut binding = ColorTerrainBinding::for_palette(&palette());
        binding.set(Color::new(0, 0, 255), "Water");
        binding.set(Color::new(0, 200, 0), "Lava Field");

        let bad = binding.validate(&catalog);
        assert_eq!(bad, vec![(Color::new(0, 200, 0), "Lava Field".to_string())]);
    }

    #[test]
    fn test_carry_over_policies() {
        let mut old = ColorTerrainBinding::for_palette(&palette());
        old.set(Color::new(0, 0, 255), "Water");
        old.set(Color::new(250, 250, 250), "Snow");

        let regenerated = Palette::new(vec![Color::new(0, 0, 255), Color::new(245, 245, 245)]);

        let reset = old.carry_over(&regenerated, CarryOver::Reset);
        assert_eq!(reset.bound_count(), 0);

        let exact = old.carry_over(&regenerated, CarryOver::Exact);
        assert_eq!(exact.get(&Color::new(0, 0, 255)), Some("Water"));
        assert_eq!(exact.get(&Color::new(245, 245, 245)), None);

        let nearest = old.carry_over(&regenerated, CarryOver::Nearest);
        assert_eq!(nearest.get(&Color::new(245, 245, 245)), Some("Snow"));
        assert_eq!(nearest.iter().count(), 2);
    }

    #[test]
    fn test_json_round_trip_keeps_unbound_entries() {
        let mut binding = ColorTerrainBinding::for_palette(&palette());
        binding.set(Color::new(0, 200, 0), "Grass 1");

        let file = tempfile::NamedTempFile::new().unwrap();
        binding.save(file.path()).unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();
        assert!(text.contains("\"#00c800\": \"Grass 1\""));
        assert!(text.contains("\"#0000ff\": null"));

        assert_eq!(ColorTerrainBinding::load(file.path()).unwrap(), binding);
    }
}
