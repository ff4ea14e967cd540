//! Pipeline session: the state a control surface works against.
//!
//! Owns the source image, the current generation (normalized image, palette
//! and grid), the terrain binding and the preview. Each `generate` builds a
//! complete new generation before swapping it in, so readers never see a
//! palette from one run next to a grid from another.

use std::path::Path;
use std::time::{Duration, Instant};

use image::RgbImage;

use crate::binding::ColorTerrainBinding;
use crate::catalog::TerrainCatalog;
use crate::config::PipelineConfig;
use crate::error::{MapGenError, Result};
use crate::export::{ExportReport, MapExporter};
use crate::grid::Grid;
use crate::normalize::{self, NormalizeParams};
use crate::palette::{Color, Palette};
use crate::quantize::{self, QuantizeParams, Quantized};
use crate::render::{CancelToken, Preview};

/// Output of one `generate` call.
#[derive(Clone, Debug)]
pub struct Generation {
    /// Increases by one per successful `generate`
    pub id: u64,
    pub normalized: RgbImage,
    pub quantized: Quantized,
}

impl Generation {
    pub fn palette(&self) -> &Palette {
        &self.quantized.palette
    }

    pub fn grid(&self) -> &Grid<Color> {
        &self.quantized.grid
    }
}

/// Owned, consistent copy of what an export needs.
#[derive(Clone, Debug)]
pub struct ExportSnapshot {
    pub generation: u64,
    pub grid: Grid<Color>,
    pub binding: ColorTerrainBinding,
}

impl ExportSnapshot {
    pub fn export(&self, exporter: &mut dyn MapExporter, catalog: &TerrainCatalog) -> Result<ExportReport> {
        exporter.export(&self.grid, &self.binding, catalog)
    }
}

pub struct Session {
    config: PipelineConfig,
    catalog: TerrainCatalog,
    source: Option<RgbImage>,
    generation: Option<Generation>,
    binding: ColorTerrainBinding,
    preview: Option<Preview>,
    generations: u64,
}

impl Session {
    pub fn new(config: PipelineConfig, catalog: TerrainCatalog) -> Self {
        Self {
            config,
            catalog,
            source: None,
            generation: None,
            binding: ColorTerrainBinding::new(),
            preview: None,
            generations: 0,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Parameters take effect on the next `generate`.
    pub fn config_mut(&mut self) -> &mut PipelineConfig {
        &mut self.config
    }

    pub fn catalog(&self) -> &TerrainCatalog {
        &self.catalog
    }

    /// Load a new source image from disk. See [`Session::set_source`].
    pub fn open_image(&mut self, path: &Path) -> Result<()> {
        let img = normalize::load_source(path)?;
        self.set_source(img);
        Ok(())
    }

    /// Replace the source image. The previous generation and preview are
    /// dropped; the binding is kept for carry-over into the next generate.
    pub fn set_source(&mut self, img: RgbImage) {
        self.source = Some(img);
        self.generation = None;
        self.drop_preview();
    }

    /// Normalize and quantize the source with the current configuration.
    pub fn generate(&mut self) -> Result<&Generation> {
        self.config.validate()?;
        let source = self.source.as_ref().ok_or(MapGenError::NoSourceImage)?;

        let normalized = normalize::normalize(source, &NormalizeParams::from(&self.config))?;
        let quantized = quantize::quantize(&normalized, &QuantizeParams::from(&self.config))?;

        let binding = self.binding.carry_over(&quantized.palette, self.config.carry_over);
        let preview = Preview::new(&quantized.grid, self.config.display_size);

        self.generations += 1;
        log::info!(
            "generation {}: {} colors on a {}x{} grid",
            self.generations,
            quantized.palette.len(),
            quantized.grid.width,
            quantized.grid.height
        );

        self.drop_preview();
        self.binding = binding;
        self.preview = Some(preview);
        Ok(self.generation.insert(Generation {
            id: self.generations,
            normalized,
            quantized,
        }))
    }

    pub fn generation(&self) -> Option<&Generation> {
        self.generation.as_ref()
    }

    pub fn palette(&self) -> Option<&Palette> {
        self.generation.as_ref().map(Generation::palette)
    }

    pub fn binding(&self) -> &ColorTerrainBinding {
        &self.binding
    }

    /// Replace the binding wholesale, e.g. from a saved file. Names are not
    /// checked here; an unknown name fails the export instead.
    pub fn set_binding(&mut self, binding: ColorTerrainBinding) {
        self.binding = binding;
    }

    /// Bind a palette color to a catalog terrain.
    pub fn bind(&mut self, color: Color, terrain: &str) -> Result<()> {
        let palette = self.palette().ok_or(MapGenError::NotGenerated)?;
        if !palette.contains(&color) {
            return Err(MapGenError::ColorNotInPalette(color));
        }
        if !self.catalog.contains(terrain) {
            return Err(MapGenError::NotInCatalog(terrain.to_string()));
        }
        self.binding.set(color, terrain);
        Ok(())
    }

    pub fn unbind(&mut self, color: Color) -> Option<String> {
        self.binding.clear(color)
    }

    /// The frame a preview surface should currently show.
    pub fn preview_frame(&self) -> Option<&RgbImage> {
        self.preview.as_ref().map(Preview::frame)
    }

    /// Highlight every pixel of `color` and schedule the revert.
    pub fn flash(&mut self, color: Color, now: Instant) -> Result<CancelToken> {
        let generation = self.generation.as_ref().ok_or(MapGenError::NotGenerated)?;
        let preview = self.preview.as_mut().ok_or(MapGenError::NotGenerated)?;
        let delay = Duration::from_millis(self.config.flash_millis);
        preview.flash(&generation.quantized.grid, color, now, delay)
    }

    /// Apply a due flash revert. Returns true if the preview changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        self.preview.as_mut().map_or(false, |p| p.poll(now))
    }

    /// Owned copy of the grid and binding of the current generation.
    pub fn snapshot(&self) -> Result<ExportSnapshot> {
        let generation = self.generation.as_ref().ok_or(MapGenError::NotGenerated)?;
        Ok(ExportSnapshot {
            generation: generation.id,
            grid: generation.quantized.grid.clone(),
            binding: self.binding.clone(),
        })
    }

    /// Export the current generation through `exporter`.
    pub fn export(&self, exporter: &mut dyn MapExporter) -> Result<ExportReport> {
        let generation = self.generation.as_ref().ok_or(MapGenError::NotGenerated)?;
        exporter.export(&generation.quantized.grid, &self.binding, &self.catalog)
    }

    fn drop_preview(&mut self) {
        if let Some(mut preview) = self.preview.take() {
            preview.cancel_pending();
        }
    }
}
