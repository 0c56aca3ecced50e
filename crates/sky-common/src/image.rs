//! Single-precision pixel arrays positioned in a parent pixel frame.

use crate::{PixelBox, StampError, StampResult};

/// A 2D array of `f32` pixels (row-major, row 0 first).
///
/// The image occupies `bbox` in its parent frame; `bbox.x0`/`bbox.y0` is the
/// parent coordinate of the first pixel (`xy0`).
#[derive(Debug, Clone, PartialEq)]
pub struct ImageF32 {
    bbox: PixelBox,
    data: Vec<f32>,
}

impl ImageF32 {
    /// Wrap existing pixel data. The data length must match the box area.
    pub fn new(bbox: PixelBox, data: Vec<f32>) -> StampResult<Self> {
        if data.len() != bbox.area() {
            return Err(StampError::ShapeMismatch(format!(
                "{} pixels for a {}x{} image",
                data.len(),
                bbox.width,
                bbox.height
            )));
        }
        Ok(Self { bbox, data })
    }

    /// Image with every pixel set to `value`.
    pub fn filled(bbox: PixelBox, value: f32) -> Self {
        Self {
            bbox,
            data: vec![value; bbox.area()],
        }
    }

    /// Image with the origin at (0, 0).
    pub fn from_vec(width: usize, height: usize, data: Vec<f32>) -> StampResult<Self> {
        Self::new(PixelBox::new(0, 0, width, height), data)
    }

    pub fn bbox(&self) -> PixelBox {
        self.bbox
    }

    pub fn width(&self) -> usize {
        self.bbox.width
    }

    pub fn height(&self) -> usize {
        self.bbox.height
    }

    /// Parent coordinate of the first pixel.
    pub fn xy0(&self) -> (i64, i64) {
        (self.bbox.x0, self.bbox.y0)
    }

    /// Move the image to a new origin without touching the pixels.
    pub fn with_xy0(mut self, x0: i64, y0: i64) -> Self {
        self.bbox.x0 = x0;
        self.bbox.y0 = y0;
        self
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Value at local (col, row).
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.width() || row >= self.height() {
            return None;
        }
        self.data.get(row * self.width() + col).copied()
    }

    /// Value at a parent-frame pixel.
    pub fn get_parent(&self, x: i64, y: i64) -> Option<f32> {
        if !self.bbox.contains_pixel(x, y) {
            return None;
        }
        self.get((x - self.bbox.x0) as usize, (y - self.bbox.y0) as usize)
    }

    pub fn set(&mut self, col: usize, row: usize, value: f32) {
        let width = self.width();
        if col < width && row < self.height() {
            self.data[row * width + col] = value;
        }
    }

    /// One local row of pixels.
    pub fn row(&self, row: usize) -> Option<&[f32]> {
        if row >= self.height() {
            return None;
        }
        let start = row * self.width();
        Some(&self.data[start..start + self.width()])
    }

    /// Sum of all pixels, accumulated in f64.
    pub fn sum(&self) -> f64 {
        self.data.iter().map(|&v| v as f64).sum()
    }

    /// Minimum and maximum over finite pixels.
    pub fn finite_min_max(&self) -> Option<(f32, f32)> {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Copy out the pixels inside `bbox` (parent coordinates).
    pub fn subimage(&self, bbox: &PixelBox) -> StampResult<ImageF32> {
        if !self.bbox.contains_box(bbox) {
            return Err(StampError::OutOfBounds {
                requested: bbox.to_string(),
                available: self.bbox.to_string(),
            });
        }
        let mut out = Vec::with_capacity(bbox.area());
        let col0 = (bbox.x0 - self.bbox.x0) as usize;
        for y in bbox.y0..bbox.y1() {
            let row = (y - self.bbox.y0) as usize;
            let start = row * self.width() + col0;
            out.extend_from_slice(&self.data[start..start + bbox.width]);
        }
        ImageF32::new(*bbox, out)
    }

    /// Copy the overlapping pixels of `src` into this image.
    pub fn paste(&mut self, src: &ImageF32) {
        let Some(overlap) = self.bbox.intersection(&src.bbox) else {
            return;
        };
        let width = self.width();
        for y in overlap.y0..overlap.y1() {
            let dst_start = (y - self.bbox.y0) as usize * width + (overlap.x0 - self.bbox.x0) as usize;
            let src_start =
                (y - src.bbox.y0) as usize * src.width() + (overlap.x0 - src.bbox.x0) as usize;
            self.data[dst_start..dst_start + overlap.width]
                .copy_from_slice(&src.data[src_start..src_start + overlap.width]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(bbox: PixelBox) -> ImageF32 {
        let data = (0..bbox.area()).map(|i| i as f32).collect();
        ImageF32::new(bbox, data).unwrap()
    }

    #[test]
    fn test_new_rejects_bad_length() {
        assert!(ImageF32::new(PixelBox::new(0, 0, 3, 3), vec![0.0; 8]).is_err());
    }

    #[test]
    fn test_subimage_parent_coords() {
        let img = ramp(PixelBox::new(100, 200, 10, 10));
        let sub = img.subimage(&PixelBox::new(102, 203, 3, 2)).unwrap();
        assert_eq!(sub.xy0(), (102, 203));
        assert_eq!(sub.data(), &[32.0, 33.0, 34.0, 42.0, 43.0, 44.0]);
        assert_eq!(sub.get_parent(104, 204), Some(44.0));
    }

    #[test]
    fn test_subimage_out_of_bounds() {
        let img = ramp(PixelBox::new(0, 0, 10, 10));
        let err = img.subimage(&PixelBox::new(8, 8, 4, 4)).unwrap_err();
        assert!(matches!(err, StampError::OutOfBounds { .. }));
    }

    #[test]
    fn test_paste_partial_overlap() {
        let mut dst = ImageF32::filled(PixelBox::new(0, 0, 4, 4), f32::NAN);
        let src = ImageF32::filled(PixelBox::new(2, 2, 4, 4), 1.0);
        dst.paste(&src);
        assert_eq!(dst.get(3, 3), Some(1.0));
        assert!(dst.get(1, 1).unwrap().is_nan());
        assert_eq!(dst.finite_min_max(), Some((1.0, 1.0)));
    }
}
