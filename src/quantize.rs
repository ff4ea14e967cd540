//! Palette quantization with seeded k-means.
//!
//! Clustering runs in sRGB space through `kmeans_colors`. Each restart is an
//! independent run seeded with `seed + restart`; restarts execute on rayon
//! and the lowest score wins, the earliest restart on ties. The same image,
//! K and seed therefore always produce the same palette and grid.

use std::collections::BTreeSet;

use ::palette::Srgb;
use image::RgbImage;
use kmeans_colors::{get_kmeans, Kmeans};
use rayon::prelude::*;

use crate::config::{PipelineConfig, MAX_COLORS};
use crate::error::{MapGenError, Result};
use crate::grid::Grid;
use crate::palette::{Color, Palette};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuantizeParams {
    /// Number of palette entries K (1-20)
    pub colors: usize,
    pub seed: u64,
    pub max_iterations: usize,
    /// Convergence threshold on centroid movement (colors scaled to 0..1)
    pub tolerance: f64,
    /// Number of seeded runs; at least one always runs
    pub restarts: usize,
}

impl Default for QuantizeParams {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for QuantizeParams {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            colors: config.colors,
            seed: config.seed,
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
            restarts: config.restarts,
        }
    }
}

/// Result of quantizing one image.
#[derive(Clone, Debug, PartialEq)]
pub struct Quantized {
    /// Exactly `colors` entries, in cluster order
    pub palette: Palette,
    /// Per-pixel palette color; every cell is a member of `palette`
    pub grid: Grid<Color>,
    /// Per-pixel palette index
    pub labels: Grid<u8>,
    /// Convergence score of the winning run
    pub score: f32,
}

/// Cluster the pixels of `img` into `params.colors` representative colors.
///
/// When the image has fewer distinct colors than K, clustering runs with one
/// cluster per distinct color and the palette is padded by repeating the last
/// centroid.
pub fn quantize(img: &RgbImage, params: &QuantizeParams) -> Result<Quantized> {
    if params.colors == 0 || params.colors > MAX_COLORS {
        return Err(MapGenError::InvalidColorCount(params.colors));
    }
    if img.width() == 0 || img.height() == 0 {
        return Err(MapGenError::NoSourceImage);
    }

    let distinct = img.pixels().map(|px| px.0).collect::<BTreeSet<[u8; 3]>>().len();
    let k = params.colors.min(distinct);
    log::debug!(
        "quantizing {}x{} image: {} distinct colors into {}",
        img.width(),
        img.height(),
        distinct,
        params.colors
    );

    let pixels: Vec<Srgb> = img
        .pixels()
        .map(|px| Srgb::new(to_unit(px[0]), to_unit(px[1]), to_unit(px[2])))
        .collect();

    let first = cluster(&pixels, k, params, 0);
    let others: Vec<Kmeans<Srgb>> = (1..params.restarts.max(1))
        .into_par_iter()
        .map(|restart| cluster(&pixels, k, params, restart))
        .collect();
    // Strict comparison keeps the earliest run on ties
    let best = others
        .into_iter()
        .fold(first, |best, run| if run.score < best.score { run } else { best });

    let mut entries: Vec<Color> = best.centroids.iter().map(|&c| to_color(c)).collect();
    if let Some(&last) = entries.last() {
        entries.resize(params.colors, last);
    }
    let palette = Palette::new(entries);

    let (w, h) = (img.width() as usize, img.height() as usize);
    let labels = Grid::from_fn(w, h, |x, y| best.indices[y * w + x]);
    let grid = labels.map(|&label| palette.as_slice()[label as usize]);

    Ok(Quantized {
        palette,
        grid,
        labels,
        score: best.score,
    })
}

fn cluster(pixels: &[Srgb], k: usize, params: &QuantizeParams, restart: usize) -> Kmeans<Srgb> {
    let seed = params.seed.wrapping_add(restart as u64);
    let run = get_kmeans(
        k,
        params.max_iterations,
        params.tolerance as f32,
        false,
        pixels,
        seed,
    );
    log::debug!("k-means restart {} (seed {}): score {:.6}", restart, seed, run.score);
    run
}

fn to_unit(channel: u8) -> f32 {
    channel as f32 / 255.0
}

/// Centroids are rounded to the nearest channel value, not truncated.
fn to_color(c: Srgb) -> Color {
    let channel = |v: f32| (v * 255.0).round().clamp(0.0, 255.0) as u8;
    Color::new(channel(c.red), channel(c.green), channel(c.blue))
}
