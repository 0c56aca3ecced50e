//! Gnomonic (TAN) projection with a CD matrix.
//!
//! The world-coordinate transform of a coadd tract:
//! - Reference sky position (CRVAL): the tangent point
//! - Reference pixel (CRPIX): the pixel at the tangent point, 0-based, in the
//!   tract frame
//! - CD matrix: degrees of tangent-plane offset per pixel, including rotation
//!   and the RA axis flip

use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

use sky_common::{Point2D, SkyCoord, StampError, StampResult};

/// TAN world-coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TanWcs {
    crval: SkyCoord,
    crpix: Point2D,
    cd: [[f64; 2]; 2],
}

impl TanWcs {
    /// Create a transform from its reference point, reference pixel and CD matrix.
    pub fn new(crval: SkyCoord, crpix: Point2D, cd: [[f64; 2]; 2]) -> StampResult<Self> {
        let det = cd[0][0] * cd[1][1] - cd[0][1] * cd[1][0];
        if !det.is_finite() || det.abs() < 1e-30 {
            return Err(StampError::invalid_parameter("cd", "CD matrix is singular"));
        }
        if !crpix.is_finite() {
            return Err(StampError::invalid_parameter("crpix", "reference pixel is not finite"));
        }
        Ok(Self { crval, crpix, cd })
    }

    /// North-up, east-left transform with a square pixel scale.
    pub fn north_up(crval: SkyCoord, crpix: Point2D, pixel_scale_arcsec: f64) -> StampResult<Self> {
        if !(pixel_scale_arcsec > 0.0) {
            return Err(StampError::invalid_parameter(
                "pixel_scale_arcsec",
                format!("{} must be positive", pixel_scale_arcsec),
            ));
        }
        let scale = pixel_scale_arcsec / 3600.0;
        // RA increases to the left
        Self::new(crval, crpix, [[-scale, 0.0], [0.0, scale]])
    }

    pub fn crval(&self) -> SkyCoord {
        self.crval
    }

    pub fn crpix(&self) -> Point2D {
        self.crpix
    }

    pub fn cd(&self) -> [[f64; 2]; 2] {
        self.cd
    }

    /// Mean pixel scale in arcseconds.
    pub fn pixel_scale_arcsec(&self) -> f64 {
        let det = self.cd[0][0] * self.cd[1][1] - self.cd[0][1] * self.cd[1][0];
        det.abs().sqrt() * 3600.0
    }

    fn cd_matrix(&self) -> Matrix2<f64> {
        Matrix2::new(self.cd[0][0], self.cd[0][1], self.cd[1][0], self.cd[1][1])
    }

    /// Convert a sky position to a pixel position.
    ///
    /// Returns `None` when the position is on or behind the tangent plane.
    pub fn sky_to_pixel(&self, coord: &SkyCoord) -> Option<Point2D> {
        let (xi, eta) = tan_project(
            coord.ra_rad(),
            coord.dec_rad(),
            self.crval.ra_rad(),
            self.crval.dec_rad(),
        )?;
        let inv = self.cd_matrix().try_inverse()?;
        let offset = inv * Vector2::new(xi.to_degrees(), eta.to_degrees());
        Some(Point2D::new(self.crpix.x + offset.x, self.crpix.y + offset.y))
    }

    /// Convert a pixel position to a sky position.
    pub fn pixel_to_sky(&self, pixel: Point2D) -> StampResult<SkyCoord> {
        let plane = self.cd_matrix() * Vector2::new(pixel.x - self.crpix.x, pixel.y - self.crpix.y);
        let (ra, dec) = inverse_tan_project(
            plane.x.to_radians(),
            plane.y.to_radians(),
            self.crval.ra_rad(),
            self.crval.dec_rad(),
        );
        SkyCoord::from_radians(ra, dec)
    }

    /// Same sky mapping expressed for an image whose first pixel sits at
    /// `(x0, y0)` of this frame.
    pub fn shifted(&self, x0: i64, y0: i64) -> TanWcs {
        TanWcs {
            crval: self.crval,
            crpix: Point2D::new(self.crpix.x - x0 as f64, self.crpix.y - y0 as f64),
            cd: self.cd,
        }
    }
}

/// Forward gnomonic projection onto the plane tangent at `(ra0, dec0)`.
///
/// All angles in radians. Returns `(ξ, η)` in radians, or `None` if the point
/// is on or behind the tangent plane.
pub fn tan_project(ra: f64, dec: f64, ra0: f64, dec0: f64) -> Option<(f64, f64)> {
    let da = ra - ra0;
    let (sin_dec, cos_dec) = dec.sin_cos();
    let (sin_dec0, cos_dec0) = dec0.sin_cos();
    let cos_da = da.cos();

    let denom = sin_dec * sin_dec0 + cos_dec * cos_dec0 * cos_da;
    if denom <= 1e-12 {
        return None;
    }

    let xi = cos_dec * da.sin() / denom;
    let eta = (sin_dec * cos_dec0 - cos_dec * sin_dec0 * cos_da) / denom;
    Some((xi, eta))
}

/// Inverse gnomonic projection. Angles in radians.
pub fn inverse_tan_project(xi: f64, eta: f64, ra0: f64, dec0: f64) -> (f64, f64) {
    let (sin_dec0, cos_dec0) = dec0.sin_cos();
    let rho_sq = xi * xi + eta * eta;

    if rho_sq < 1e-30 {
        return (ra0, dec0);
    }

    let rho = rho_sq.sqrt();
    let c = rho.atan();
    let (sin_c, cos_c) = c.sin_cos();

    let dec = (cos_c * sin_dec0 + eta * sin_c * cos_dec0 / rho).clamp(-1.0, 1.0).asin();
    let ra = ra0 + (xi * sin_c).atan2(rho * cos_dec0 * cos_c - eta * sin_dec0 * sin_c);
    (ra, dec)
}
