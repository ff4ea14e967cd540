//! Preview rendering of quantized grids.
//!
//! Previews are nearest-neighbor scaled to a fixed display size so hard
//! terrain boundaries stay hard. A flash temporarily paints one palette color
//! white; the revert is a scheduled task carrying its own snapshot and a
//! cancellation token, so a superseded flash never brings back stale pixels.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::error::{MapGenError, Result};
use crate::grid::Grid;
use crate::palette::Color;

/// Color used to highlight flashed pixels
pub const HIGHLIGHT: Color = Color::WHITE;

/// Convert a color grid into an image of the same size.
pub fn grid_to_image(grid: &Grid<Color>) -> RgbImage {
    let mut img = RgbImage::new(grid.width as u32, grid.height as u32);
    for (x, y, &c) in grid.iter() {
        img.put_pixel(x as u32, y as u32, c.into());
    }
    img
}

/// Render `grid` at `display_size` × `display_size` with nearest-neighbor sampling.
pub fn render_preview(grid: &Grid<Color>, display_size: u32) -> RgbImage {
    let img = grid_to_image(grid);
    if img.width() == display_size && img.height() == display_size {
        return img;
    }
    imageops::resize(&img, display_size, display_size, FilterType::Nearest)
}

/// Copy of `grid` with every cell equal to `target` replaced by `highlight`.
pub fn highlight(grid: &Grid<Color>, target: Color, highlight: Color) -> Result<Grid<Color>> {
    let mut hits = 0usize;
    let out = grid.map(|&c| {
        if c == target {
            hits += 1;
            highlight
        } else {
            c
        }
    });
    if hits == 0 {
        return Err(MapGenError::NoPixelsForColor(target));
    }
    Ok(out)
}

/// Shared flag that cancels a scheduled revert.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A one-shot revert due at `due`.
#[derive(Debug)]
struct PendingRevert {
    due: Instant,
    snapshot: RgbImage,
    token: CancelToken,
}

/// What the preview surface currently shows.
#[derive(Debug)]
pub struct Preview {
    frame: RgbImage,
    display_size: u32,
    pending: Option<PendingRevert>,
}

impl Preview {
    pub fn new(grid: &Grid<Color>, display_size: u32) -> Self {
        Self {
            frame: render_preview(grid, display_size),
            display_size,
            pending: None,
        }
    }

    /// The frame that should currently be displayed.
    pub fn frame(&self) -> &RgbImage {
        &self.frame
    }

    pub fn has_pending_revert(&self) -> bool {
        self.pending.is_some()
    }

    /// Show `grid` with `color` highlighted and schedule a revert to the
    /// current frame after `delay`. Any earlier pending revert is cancelled
    /// and its snapshot reused, so the revert always lands on the un-flashed
    /// frame.
    pub fn flash(&mut self, grid: &Grid<Color>, color: Color, now: Instant, delay: Duration) -> Result<CancelToken> {
        let flashed = highlight(grid, color, HIGHLIGHT)?;

        let snapshot = match self.pending.take() {
            Some(previous) => {
                previous.token.cancel();
                previous.snapshot
            }
            None => self.frame.clone(),
        };

        self.frame = render_preview(&flashed, self.display_size);
        let token = CancelToken::new();
        self.pending = Some(PendingRevert {
            due: now + delay,
            snapshot,
            token: token.clone(),
        });
        log::debug!("flashing {} for {:?}", color, delay);
        Ok(token)
    }

    /// Run the scheduled revert if it is due. Returns true when the frame
    /// changed. A cancelled revert is dropped without touching the frame.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(pending) = self.pending.as_ref() else {
            return false;
        };
        if pending.token.is_cancelled() {
            self.pending = None;
            return false;
        }
        if now < pending.due {
            return false;
        }
        if let Some(pending) = self.pending.take() {
            self.frame = pending.snapshot;
            return true;
        }
        false
    }

    /// Cancel any scheduled revert, leaving the current frame as is.
    pub fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.token.cancel();
        }
    }

    /// Time until the pending revert is due, if any.
    pub fn next_deadline(&self, now: Instant) -> Option<Duration> {
        self.pending
            .as_ref()
            .filter(|p| !p.token.is_cancelled())
            .map(|p| p.due.saturating_duration_since(now))
    }
}
