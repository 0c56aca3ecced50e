//! Integer pixel boxes.

use serde::{Deserialize, Serialize};

use crate::Point2D;

/// An axis-aligned integer rectangle in a pixel grid.
///
/// Half-open: covers columns `x0..x0 + width` and rows `y0..y0 + height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelBox {
    pub x0: i64,
    pub y0: i64,
    pub width: usize,
    pub height: usize,
}

impl PixelBox {
    /// Create a new box from its origin and dimensions.
    pub fn new(x0: i64, y0: i64, width: usize, height: usize) -> Self {
        Self {
            x0,
            y0,
            width,
            height,
        }
    }

    /// Square box of side `side` centred on the pixel nearest to `center`.
    ///
    /// The centre pixel `c` is `floor(center + 0.5)` and the origin is
    /// `c - side / 2`. For even sides the centre pixel sits at local index
    /// `side / 2`.
    pub fn centered(center: Point2D, side: usize) -> Self {
        let (cx, cy) = center.nearest_pixel();
        Self::centered_on_pixel(cx, cy, side)
    }

    /// Square box of side `side` centred on an integer pixel.
    pub fn centered_on_pixel(cx: i64, cy: i64, side: usize) -> Self {
        let half = (side / 2) as i64;
        Self::new(cx - half, cy - half, side, side)
    }

    /// Exclusive end column.
    pub fn x1(&self) -> i64 {
        self.x0 + self.width as i64
    }

    /// Exclusive end row.
    pub fn y1(&self) -> i64 {
        self.y0 + self.height as i64
    }

    pub fn area(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Check if an integer pixel is inside this box.
    pub fn contains_pixel(&self, x: i64, y: i64) -> bool {
        x >= self.x0 && x < self.x1() && y >= self.y0 && y < self.y1()
    }

    /// Check if a continuous position falls on a pixel of this box.
    pub fn contains_point(&self, point: Point2D) -> bool {
        let (x, y) = point.nearest_pixel();
        self.contains_pixel(x, y)
    }

    /// Check if `other` lies entirely within this box.
    pub fn contains_box(&self, other: &PixelBox) -> bool {
        other.x0 >= self.x0 && other.y0 >= self.y0 && other.x1() <= self.x1() && other.y1() <= self.y1()
    }

    /// Check if this box overlaps another.
    pub fn intersects(&self, other: &PixelBox) -> bool {
        self.x0 < other.x1() && self.x1() > other.x0 && self.y0 < other.y1() && self.y1() > other.y0
    }

    /// Compute the overlap of two boxes.
    pub fn intersection(&self, other: &PixelBox) -> Option<PixelBox> {
        if !self.intersects(other) {
            return None;
        }
        let x0 = self.x0.max(other.x0);
        let y0 = self.y0.max(other.y0);
        let x1 = self.x1().min(other.x1());
        let y1 = self.y1().min(other.y1());
        Some(PixelBox::new(x0, y0, (x1 - x0) as usize, (y1 - y0) as usize))
    }

    /// Grow the box by `border` pixels on every side.
    pub fn grow(&self, border: usize) -> PixelBox {
        let b = border as i64;
        PixelBox::new(self.x0 - b, self.y0 - b, self.width + 2 * border, self.height + 2 * border)
    }

    /// Continuous centre of the box (pixel centres at integers).
    pub fn center(&self) -> Point2D {
        Point2D::new(
            self.x0 as f64 + (self.width as f64 - 1.0) / 2.0,
            self.y0 as f64 + (self.height as f64 - 1.0) / 2.0,
        )
    }
}

impl std::fmt::Display for PixelBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}:{}, {}:{}]", self.x0, self.x1(), self.y0, self.y1())
    }
}
