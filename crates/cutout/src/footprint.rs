//! Detection footprints: connected regions of a mask plane.

use serde::Serialize;

use sky_common::{ImageF32, Mask, MaskPlane, PixelBox, StampError, StampResult};

/// Pixels attributed to one detected object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Footprint {
    /// Position in scan order of the first pixel, starting at 0.
    pub id: usize,
    pub npix: usize,
    /// Bounding box in the parent frame.
    pub bbox: PixelBox,
    /// Brightest finite pixel, parent frame.
    pub peak: (i64, i64),
    pub peak_value: f32,
    #[serde(skip)]
    pixels: Vec<(i64, i64)>,
}

impl Footprint {
    /// Whether parent pixel (x, y) belongs to this footprint.
    pub fn contains(&self, x: i64, y: i64) -> bool {
        self.bbox.contains_pixel(x, y) && self.pixels.contains(&(x, y))
    }

    /// Parent-frame pixels in visiting order.
    pub fn pixels(&self) -> &[(i64, i64)] {
        &self.pixels
    }
}

const NEIGHBOURS: [(i64, i64); 8] = [(-1, -1), (0, -1), (1, -1), (-1, 0), (1, 0), (-1, 1), (0, 1), (1, 1)];

/// 8-connected components of the pixels where `plane` is set.
pub fn find_footprints(image: &ImageF32, mask: &Mask, plane: MaskPlane) -> StampResult<Vec<Footprint>> {
    if image.bbox() != mask.bbox() {
        return Err(StampError::ShapeMismatch(format!(
            "image {} vs mask {}",
            image.bbox(),
            mask.bbox()
        )));
    }
    let (width, height) = (image.width(), image.height());
    let (x0, y0) = image.xy0();
    let mut visited = vec![false; width * height];
    let mut footprints = Vec::new();
    let mut stack = Vec::new();

    for start in 0..width * height {
        if visited[start] || !mask.is_set(start % width, start / width, plane) {
            continue;
        }
        visited[start] = true;
        stack.push(start);

        let mut pixels = Vec::new();
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (usize::MAX, usize::MAX, 0, 0);
        let mut peak = (start % width, start / width);
        let mut peak_value = f32::NAN;

        while let Some(idx) = stack.pop() {
            let (col, row) = (idx % width, idx / width);
            pixels.push((x0 + col as i64, y0 + row as i64));
            min_x = min_x.min(col);
            min_y = min_y.min(row);
            max_x = max_x.max(col);
            max_y = max_y.max(row);

            let value = image.data()[idx];
            if value.is_finite() && (peak_value.is_nan() || value > peak_value) {
                peak_value = value;
                peak = (col, row);
            }

            for (dx, dy) in NEIGHBOURS {
                let (nx, ny) = (col as i64 + dx, row as i64 + dy);
                if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                    continue;
                }
                let (nx, ny) = (nx as usize, ny as usize);
                let n = ny * width + nx;
                if !visited[n] && mask.is_set(nx, ny, plane) {
                    visited[n] = true;
                    stack.push(n);
                }
            }
        }

        footprints.push(Footprint {
            id: footprints.len(),
            npix: pixels.len(),
            bbox: PixelBox::new(
                x0 + min_x as i64,
                y0 + min_y as i64,
                max_x - min_x + 1,
                max_y - min_y + 1,
            ),
            peak: (x0 + peak.0 as i64, y0 + peak.1 as i64),
            peak_value,
            pixels,
        });
    }

    Ok(footprints)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(marked: &[(usize, usize)]) -> (ImageF32, Mask) {
        let bbox = PixelBox::new(100, 200, 6, 5);
        let mut image = test_utils::position_image(bbox);
        image.set(4, 4, f32::NAN);
        let mut mask = Mask::clear(bbox);
        for &(c, r) in marked {
            mask.set_plane(c, r, MaskPlane::Detected);
        }
        (image, mask)
    }

    #[test]
    fn test_diagonal_pixels_connect() {
        let (image, mask) = setup(&[(0, 0), (1, 1), (2, 2), (5, 0)]);
        let footprints = find_footprints(&image, &mask, MaskPlane::Detected).unwrap();
        assert_eq!(footprints.len(), 2);

        let first = &footprints[0];
        assert_eq!(first.npix, 3);
        assert_eq!(first.bbox, PixelBox::new(100, 200, 3, 3));
        assert_eq!(first.peak, (102, 202));
        assert_eq!(first.peak_value, 2002.0);
        assert!(first.contains(101, 201));
        assert!(!first.contains(101, 200));

        assert_eq!(footprints[1].id, 1);
        assert_eq!(footprints[1].npix, 1);
    }

    #[test]
    fn test_other_planes_ignored() {
        let (image, mut mask) = setup(&[]);
        mask.set_plane(2, 2, MaskPlane::Sat);
        assert!(find_footprints(&image, &mask, MaskPlane::Detected).unwrap().is_empty());
        assert_eq!(find_footprints(&image, &mask, MaskPlane::Sat).unwrap().len(), 1);
    }

    #[test]
    fn test_peak_skips_nan() {
        let (image, mask) = setup(&[(4, 4), (3, 3)]);
        let footprints = find_footprints(&image, &mask, MaskPlane::Detected).unwrap();
        assert_eq!(footprints.len(), 1);
        assert_eq!(footprints[0].peak, (103, 203));
    }
}
