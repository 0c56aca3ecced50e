//! Synthetic image generators.
//!
//! These create predictable, verifiable pixel patterns that can be used
//! across the test suite.

use sky_common::{ImageF32, PixelBox, Point2D};

/// Creates an image whose pixel values encode their position.
///
/// Each pixel holds `col * 1000 + row` (local indices), which makes it easy
/// to check that sub-images and reads land on the right pixels.
///
/// # Example
///
/// ```
/// use sky_common::PixelBox;
/// use test_utils::position_image;
///
/// let image = position_image(PixelBox::new(5, 5, 10, 4));
/// assert_eq!(image.get(0, 0), Some(0.0));
/// assert_eq!(image.get(1, 0), Some(1000.0));
/// assert_eq!(image.get(0, 1), Some(1.0));
/// ```
pub fn position_image(bbox: PixelBox) -> ImageF32 {
    let mut data = Vec::with_capacity(bbox.area());
    for row in 0..bbox.height {
        for col in 0..bbox.width {
            data.push((col * 1000 + row) as f32);
        }
    }
    ImageF32::new(bbox, data).expect("data matches bbox")
}

/// Round Gaussian star of total `flux` at `center` (parent frame) on a flat
/// `background`, sampled at pixel centres.
///
/// The flux is normalized over an infinite plane, so stars far from the box
/// edges sum to `flux` plus the background.
pub fn gaussian_star_image(bbox: PixelBox, center: Point2D, sigma: f64, flux: f64, background: f32) -> ImageF32 {
    let norm = flux / (2.0 * std::f64::consts::PI * sigma * sigma);
    let mut data = Vec::with_capacity(bbox.area());
    for y in bbox.y0..bbox.y1() {
        for x in bbox.x0..bbox.x1() {
            let dx = x as f64 - center.x;
            let dy = y as f64 - center.y;
            let value = norm * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp();
            data.push(background + value as f32);
        }
    }
    ImageF32::new(bbox, data).expect("data matches bbox")
}

/// Image with a single non-zero pixel.
pub fn impulse_image(bbox: PixelBox, col: usize, row: usize, value: f32) -> ImageF32 {
    let mut image = ImageF32::filled(bbox, 0.0);
    image.set(col, row, value);
    image
}
