//! Mask planes: named bit flags co-registered with an image.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{PixelBox, StampError, StampResult};

/// Named mask plane and its bit position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaskPlane {
    Bad,
    Sat,
    Intrp,
    Cr,
    Edge,
    Detected,
    DetectedNegative,
    Suspect,
    NoData,
}

impl MaskPlane {
    pub const ALL: [MaskPlane; 9] = [
        MaskPlane::Bad,
        MaskPlane::Sat,
        MaskPlane::Intrp,
        MaskPlane::Cr,
        MaskPlane::Edge,
        MaskPlane::Detected,
        MaskPlane::DetectedNegative,
        MaskPlane::Suspect,
        MaskPlane::NoData,
    ];

    /// Bit index of this plane.
    pub fn bit(&self) -> u32 {
        match self {
            MaskPlane::Bad => 0,
            MaskPlane::Sat => 1,
            MaskPlane::Intrp => 2,
            MaskPlane::Cr => 3,
            MaskPlane::Edge => 4,
            MaskPlane::Detected => 5,
            MaskPlane::DetectedNegative => 6,
            MaskPlane::Suspect => 7,
            MaskPlane::NoData => 8,
        }
    }

    pub fn bitmask(&self) -> u32 {
        1 << self.bit()
    }

    pub fn name(&self) -> &'static str {
        match self {
            MaskPlane::Bad => "BAD",
            MaskPlane::Sat => "SAT",
            MaskPlane::Intrp => "INTRP",
            MaskPlane::Cr => "CR",
            MaskPlane::Edge => "EDGE",
            MaskPlane::Detected => "DETECTED",
            MaskPlane::DetectedNegative => "DETECTED_NEGATIVE",
            MaskPlane::Suspect => "SUSPECT",
            MaskPlane::NoData => "NO_DATA",
        }
    }
}

impl FromStr for MaskPlane {
    type Err = StampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        MaskPlane::ALL
            .iter()
            .copied()
            .find(|p| p.name() == upper)
            .ok_or_else(|| StampError::invalid_parameter("mask_plane", format!("unknown plane '{}'", s)))
    }
}

/// Integer mask array positioned like its image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    bbox: PixelBox,
    data: Vec<u32>,
}

impl Mask {
    pub fn new(bbox: PixelBox, data: Vec<u32>) -> StampResult<Self> {
        if data.len() != bbox.area() {
            return Err(StampError::ShapeMismatch(format!(
                "{} mask pixels for a {}x{} mask",
                data.len(),
                bbox.width,
                bbox.height
            )));
        }
        Ok(Self { bbox, data })
    }

    /// Mask with no bits set.
    pub fn clear(bbox: PixelBox) -> Self {
        Self {
            bbox,
            data: vec![0; bbox.area()],
        }
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

    pub fn data(&self) -> &[u32] {
        &self.data
    }

    /// Raw bits at local (col, row).
    pub fn get(&self, col: usize, row: usize) -> Option<u32> {
        if col >= self.width() || row >= self.height() {
            return None;
        }
        self.data.get(row * self.width() + col).copied()
    }

    pub fn is_set(&self, col: usize, row: usize, plane: MaskPlane) -> bool {
        self.get(col, row).is_some_and(|bits| bits & plane.bitmask() != 0)
    }

    pub fn set_plane(&mut self, col: usize, row: usize, plane: MaskPlane) {
        let width = self.width();
        if col < width && row < self.height() {
            self.data[row * width + col] |= plane.bitmask();
        }
    }

    /// Set `plane` on every pixel.
    pub fn set_plane_all(&mut self, plane: MaskPlane) {
        self.data.iter_mut().for_each(|bits| *bits |= plane.bitmask());
    }

    /// Number of pixels with `plane` set.
    pub fn count(&self, plane: MaskPlane) -> usize {
        self.data.iter().filter(|&&bits| bits & plane.bitmask() != 0).count()
    }

    /// Copy out the mask bits inside `bbox` (parent coordinates).
    pub fn subimage(&self, bbox: &PixelBox) -> StampResult<Mask> {
        if !self.bbox.contains_box(bbox) {
            return Err(StampError::OutOfBounds {
                requested: bbox.to_string(),
                available: self.bbox.to_string(),
            });
        }
        let mut out = Vec::with_capacity(bbox.area());
        let col0 = (bbox.x0 - self.bbox.x0) as usize;
        for y in bbox.y0..bbox.y1() {
            let start = (y - self.bbox.y0) as usize * self.width() + col0;
            out.extend_from_slice(&self.data[start..start + bbox.width]);
        }
        Mask::new(*bbox, out)
    }

    /// Copy the overlapping bits of `src` into this mask.
    pub fn paste(&mut self, src: &Mask) {
        let Some(overlap) = self.bbox.intersection(&src.bbox) else {
            return;
        };
        let width = self.width();
        for y in overlap.y0..overlap.y1() {
            let dst = (y - self.bbox.y0) as usize * width + (overlap.x0 - self.bbox.x0) as usize;
            let srci = (y - src.bbox.y0) as usize * src.width() + (overlap.x0 - src.bbox.x0) as usize;
            self.data[dst..dst + overlap.width].copy_from_slice(&src.data[srci..srci + overlap.width]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_lookup() {
        assert_eq!("detected".parse::<MaskPlane>().unwrap(), MaskPlane::Detected);
        assert_eq!(MaskPlane::Detected.bitmask(), 32);
        assert!("SHINY".parse::<MaskPlane>().is_err());
    }

    #[test]
    fn test_set_and_count() {
        let mut mask = Mask::clear(PixelBox::new(0, 0, 4, 4));
        mask.set_plane(1, 1, MaskPlane::Detected);
        mask.set_plane(1, 1, MaskPlane::Sat);
        mask.set_plane(2, 1, MaskPlane::Detected);
        assert_eq!(mask.count(MaskPlane::Detected), 2);
        assert!(mask.is_set(1, 1, MaskPlane::Sat));
        assert!(!mask.is_set(2, 1, MaskPlane::Sat));
        assert_eq!(mask.get(1, 1), Some(0b10_0010));
    }
}
