//! Sky and pixel coordinates.

use serde::{Deserialize, Serialize};

use crate::{StampError, StampResult};

/// A celestial coordinate (ICRS), in degrees.
///
/// Right ascension is normalized into [0, 360); declination must lie in
/// [-90, 90].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyCoord {
    ra: f64,
    dec: f64,
}

impl SkyCoord {
    /// Create a coordinate from right ascension and declination in degrees.
    pub fn new(ra_deg: f64, dec_deg: f64) -> StampResult<Self> {
        if !ra_deg.is_finite() {
            return Err(StampError::invalid_parameter("ra", format!("{} is not finite", ra_deg)));
        }
        if !dec_deg.is_finite() || !(-90.0..=90.0).contains(&dec_deg) {
            return Err(StampError::invalid_parameter(
                "dec",
                format!("{} is outside [-90, 90]", dec_deg),
            ));
        }
        Ok(Self {
            ra: normalize_ra(ra_deg),
            dec: dec_deg,
        })
    }

    /// Create a coordinate from radians.
    pub fn from_radians(ra: f64, dec: f64) -> StampResult<Self> {
        Self::new(ra.to_degrees(), dec.to_degrees())
    }

    /// Right ascension in degrees, within [0, 360).
    pub fn ra(&self) -> f64 {
        self.ra
    }

    /// Declination in degrees.
    pub fn dec(&self) -> f64 {
        self.dec
    }

    pub fn ra_rad(&self) -> f64 {
        self.ra.to_radians()
    }

    pub fn dec_rad(&self) -> f64 {
        self.dec.to_radians()
    }

    /// Great-circle separation to another coordinate, in degrees (haversine).
    pub fn separation(&self, other: &SkyCoord) -> f64 {
        let dra = other.ra_rad() - self.ra_rad();
        let ddec = other.dec_rad() - self.dec_rad();
        let a = (ddec / 2.0).sin().powi(2)
            + self.dec_rad().cos() * other.dec_rad().cos() * (dra / 2.0).sin().powi(2);
        (2.0 * a.sqrt().min(1.0).asin()).to_degrees()
    }
}

impl std::fmt::Display for SkyCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:+.6})", self.ra, self.dec)
    }
}

fn normalize_ra(ra: f64) -> f64 {
    let wrapped = ra.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// A continuous position in a pixel frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Nearest integer pixel, using `floor(v + 0.5)` on each axis.
    pub fn nearest_pixel(&self) -> (i64, i64) {
        ((self.x + 0.5).floor() as i64, (self.y + 0.5).floor() as i64)
    }

    /// Offset from the nearest integer pixel, in [-0.5, 0.5).
    pub fn subpixel_offset(&self) -> (f64, f64) {
        let (ix, iy) = self.nearest_pixel();
        (self.x - ix as f64, self.y - iy as f64)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}
