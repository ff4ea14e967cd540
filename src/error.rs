//! Error taxonomy for the image → terrain pipeline.
//!
//! Precondition and data-integrity errors abort the operation that raised
//! them. Unbound palette colors are not errors: the exporter collects them
//! into its report instead.

use thiserror::Error;

use crate::palette::Color;

#[derive(Debug, Error)]
pub enum MapGenError {
    /// A pipeline stage ran before any source image was opened.
    #[error("no source image loaded")]
    NoSourceImage,

    /// Export or flash ran before any palette/grid was generated.
    #[error("no quantized data available; generate the bitmap first")]
    NotGenerated,

    /// A binding names a terrain the catalog does not know.
    #[error("terrain {name:?} bound to color {color} (first seen at {x}, {y}) is not in the terrain catalog")]
    UnknownTerrain {
        name: String,
        color: Color,
        x: usize,
        y: usize,
    },

    #[error("terrain {0:?} is not in the terrain catalog")]
    NotInCatalog(String),

    #[error("color {0} is not in the current palette")]
    ColorNotInPalette(Color),

    #[error("no pixels found with color {0} to flash")]
    NoPixelsForColor(Color),

    #[error("color count must be between 1 and 20, got {0}")]
    InvalidColorCount(usize),

    #[error("simplification level must be between 0 and 50, got {0}")]
    InvalidSimplification(u32),

    #[error("target map size must be positive, got {0}")]
    InvalidTargetSize(u32),

    #[error("invalid color {0:?}; expected #rrggbb or r,g,b")]
    InvalidColor(String),

    #[error("terrain catalog line {line}: {message}")]
    CatalogParse { line: usize, message: String },

    #[error("terrain catalog is missing the {0:?} column")]
    MissingColumn(&'static str),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MapGenError>;
