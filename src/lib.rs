//! Bitmap to terrain map conversion library
//!
//! Turns an arbitrary image into a square terrain grid for a strategy-game
//! scenario: normalize → quantize → bind palette colors to terrains → export.

pub mod binding;
pub mod catalog;
pub mod config;
pub mod error;
pub mod export;
pub mod grid;
pub mod normalize;
pub mod palette;
pub mod quantize;
pub mod render;
pub mod session;

pub use error::{MapGenError, Result};
