//! Image normalization: square-stretch, blur, rotate, resize to map size.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

use crate::config::{PipelineConfig, Rotation};
use crate::error::{MapGenError, Result};

/// Resampling filter used for both resize steps
const RESAMPLE: FilterType = FilterType::Lanczos3;

/// Fill color for the corners uncovered by a diagonal rotation
const ROTATION_FILL: Rgb<u8> = Rgb([0, 0, 0]);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NormalizeParams {
    /// Blur radius; 0 disables smoothing
    pub simplification: u32,
    pub rotation: Rotation,
    /// Side length of the output image
    pub target_size: u32,
}

impl From<&PipelineConfig> for NormalizeParams {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            simplification: config.simplification,
            rotation: config.rotation,
            target_size: config.target_size(),
        }
    }
}

/// Open any supported raster image, dropping alpha and extra channels.
pub fn load_source(path: &Path) -> Result<RgbImage> {
    let img = image::open(path)?;
    log::debug!("opened {} ({}x{})", path.display(), img.width(), img.height());
    Ok(img.to_rgb8())
}

/// Produce a `target_size` × `target_size` image from `source`.
///
/// The source is first stretched to a square on its longer side so no content
/// is cropped, then optionally blurred and rotated, then resized to the map
/// size.
pub fn normalize(source: &RgbImage, params: &NormalizeParams) -> Result<RgbImage> {
    if source.width() == 0 || source.height() == 0 {
        return Err(MapGenError::NoSourceImage);
    }
    if params.target_size == 0 {
        return Err(MapGenError::InvalidTargetSize(0));
    }

    let side = source.width().max(source.height());
    let mut img = if source.width() == source.height() {
        source.clone()
    } else {
        imageops::resize(source, side, side, RESAMPLE)
    };

    if params.simplification > 0 {
        img = imageops::blur(&img, params.simplification as f32);
    }

    if params.rotation != Rotation::None {
        img = rotate_expand(&img, params.rotation.degrees());
    }

    let out = imageops::resize(&img, params.target_size, params.target_size, RESAMPLE);
    log::debug!(
        "normalized {}x{} -> {}x{} (blur {}, rotation {:?})",
        source.width(),
        source.height(),
        out.width(),
        out.height(),
        params.simplification,
        params.rotation
    );
    Ok(out)
}

/// Rotate counter-clockwise by `degrees`, growing the canvas so no source
/// pixel is lost. Uncovered areas are filled with `ROTATION_FILL`.
pub fn rotate_expand(img: &RgbImage, degrees: f32) -> RgbImage {
    let theta = degrees.to_radians();
    let (sin, cos) = theta.sin_cos();
    let (w, h) = (img.width() as f32, img.height() as f32);

    let new_w = (w * cos.abs() + h * sin.abs()).round().max(1.0) as u32;
    let new_h = (w * sin.abs() + h * cos.abs()).round().max(1.0) as u32;

    let (cx, cy) = (w / 2.0, h / 2.0);
    let (ncx, ncy) = (new_w as f32 / 2.0, new_h as f32 / 2.0);

    let mut out = RgbImage::from_pixel(new_w, new_h, ROTATION_FILL);
    for (px, py, pixel) in out.enumerate_pixels_mut() {
        // Inverse-map the destination pixel center back into the source.
        // Image y grows downward, so a counter-clockwise turn flips the sign of sin.
        let dx = px as f32 + 0.5 - ncx;
        let dy = py as f32 + 0.5 - ncy;
        let sx = dx * cos - dy * sin + cx - 0.5;
        let sy = dx * sin + dy * cos + cy - 0.5;

        if let Some(sampled) = sample_bilinear(img, sx, sy) {
            *pixel = sampled;
        }
    }
    out
}

/// Bilinear sample at fractional coordinates; `None` outside the image.
fn sample_bilinear(img: &RgbImage, x: f32, y: f32) -> Option<Rgb<u8>> {
    let (w, h) = (img.width() as f32, img.height() as f32);
    if x < -0.5 || y < -0.5 || x > w - 0.5 || y > h - 0.5 {
        return None;
    }

    let x = x.clamp(0.0, w - 1.0);
    let y = y.clamp(0.0, h - 1.0);
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(img.width() - 1);
    let y1 = (y0 + 1).min(img.height() - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = img.get_pixel(x0, y0).0;
    let p10 = img.get_pixel(x1, y0).0;
    let p01 = img.get_pixel(x0, y1).0;
    let p11 = img.get_pixel(x1, y1).0;

    let mut out = [0u8; 3];
    for c in 0..3 {
        let v0 = p00[c] as f32 * (1.0 - fx) + p10[c] as f32 * fx;
        let v1 = p01[c] as f32 * (1.0 - fx) + p11[c] as f32 * fx;
        out[c] = (v0 * (1.0 - fy) + v1 * fy).round().clamp(0.0, 255.0) as u8;
    }
    Some(Rgb(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(target_size: u32) -> NormalizeParams {
        NormalizeParams {
            simplification: 0,
            rotation: Rotation::None,
            target_size,
        }
    }

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([(x * 7 % 256) as u8, (y * 3 % 256) as u8, 90]))
    }

    #[test]
    fn test_output_is_always_target_square() {
        for &(w, h) in &[(1, 1), (300, 7), (5, 640), (64, 64), (2, 1)] {
            for &size in &[1, 10, 120] {
                let out = normalize(&gradient(w, h), &params(size)).unwrap();
                assert_eq!((out.width(), out.height()), (size, size), "source {}x{}", w, h);
            }
        }
    }

    #[test]
    fn test_blur_and_rotation_keep_target_size() {
        let p = NormalizeParams {
            simplification: 3,
            rotation: Rotation::Diagonal,
            target_size: 40,
        };
        let out = normalize(&gradient(90, 30), &p).unwrap();
        assert_eq!((out.width(), out.height()), (40, 40));
    }

    #[test]
    fn test_uniform_image_stays_uniform() {
        let src = RgbImage::from_pixel(37, 12, Rgb([30, 120, 200]));
        let p = NormalizeParams {
            simplification: 2,
            rotation: Rotation::None,
            target_size: 16,
        };
        let out = normalize(&src, &p).unwrap();
        // Filters may drift by one step from float rounding, never more
        for px in out.pixels() {
            for (got, want) in px.0.iter().zip([30u8, 120, 200]) {
                assert!((*got as i32 - want as i32).abs() <= 1, "{:?}", px);
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let src = gradient(50, 20);
        let p = NormalizeParams {
            simplification: 4,
            rotation: Rotation::Diagonal,
            target_size: 24,
        };
        assert_eq!(normalize(&src, &p).unwrap(), normalize(&src, &p).unwrap());
    }

    #[test]
    fn test_rotate_expand_grows_canvas_and_fills_corners() {
        let src = RgbImage::from_pixel(10, 10, Rgb([200, 200, 200]));
        let out = rotate_expand(&src, 45.0);
        assert_eq!(out.width(), 14);
        assert_eq!(out.height(), 14);
        assert_eq!(*out.get_pixel(0, 0), ROTATION_FILL);
        assert_eq!(*out.get_pixel(7, 7), Rgb([200, 200, 200]));
    }

    #[test]
    fn test_diagonal_turns_clockwise() {
        let mut src = RgbImage::from_pixel(21, 21, Rgb([0, 0, 0]));
        for y in 9..12 {
            for x in 16..19 {
                src.put_pixel(x, y, Rgb([255, 0, 0]));
            }
        }
        let out = rotate_expand(&src, Rotation::Diagonal.degrees());

        let (mut sx, mut sy, mut n) = (0u32, 0u32, 0u32);
        for (x, y, px) in out.enumerate_pixels() {
            if px[0] > 128 {
                sx += x;
                sy += y;
                n += 1;
            }
        }
        assert!(n > 0);
        let (mx, my) = (sx / n, sy / n);
        let (cx, cy) = (out.width() / 2, out.height() / 2);
        // Right of center ends up below center and still right of it
        assert!(my > cy, "marker at ({}, {}), center ({}, {})", mx, my, cx, cy);
        assert!(mx > cx);
    }

    #[test]
    fn test_rejects_empty_input() {
        let empty = RgbImage::new(0, 0);
        assert!(matches!(normalize(&empty, &params(8)), Err(MapGenError::NoSourceImage)));
        assert!(matches!(
            normalize(&gradient(4, 4), &params(0)),
            Err(MapGenError::InvalidTargetSize(0))
        ));
    }
}
