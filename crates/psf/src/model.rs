//! The PSF model interface.

use sky_common::{ImageF32, PixelBox, Point2D, StampError, StampResult};

/// A point-spread-function model bound to one tile.
///
/// `compute_image` returns an image normalized to unit total flux whose
/// centre pixel is the pixel nearest `position` (`floor(position + 0.5)`).
/// The image's `xy0` places it in the tile's pixel frame.
pub trait PsfModel: Send + Sync + std::fmt::Debug {
    /// Evaluate the model at a tile pixel position.
    fn compute_image(&self, position: Point2D) -> StampResult<ImageF32>;

    /// Width and height of the images this model produces.
    fn kernel_dims(&self) -> (usize, usize);
}

/// Sample a radial profile on a `width`×`height` grid centred on `position`.
///
/// `profile(dx, dy)` receives the offset of a pixel centre from the exact
/// (sub-pixel) position. The result is normalized to unit sum.
pub fn render_profile<F>(position: Point2D, width: usize, height: usize, profile: F) -> StampResult<ImageF32>
where
    F: Fn(f64, f64) -> f64,
{
    if width == 0 || height == 0 {
        return Err(StampError::invalid_parameter("size", "PSF image must be at least 1x1"));
    }
    if !position.is_finite() {
        return Err(StampError::invalid_parameter("position", "PSF position is not finite"));
    }

    let (cx, cy) = position.nearest_pixel();
    let (fx, fy) = position.subpixel_offset();
    let half_w = (width / 2) as f64;
    let half_h = (height / 2) as f64;

    let mut values = Vec::with_capacity(width * height);
    for row in 0..height {
        let dy = row as f64 - half_h - fy;
        for col in 0..width {
            let dx = col as f64 - half_w - fx;
            values.push(profile(dx, dy));
        }
    }

    let total: f64 = values.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return Err(StampError::invalid_parameter(
            "psf",
            format!("profile sums to {} and cannot be normalized", total),
        ));
    }

    let data = values.iter().map(|v| (v / total) as f32).collect();
    let bbox = PixelBox::new(cx - (width / 2) as i64, cy - (height / 2) as i64, width, height);
    ImageF32::new(bbox, data)
}
