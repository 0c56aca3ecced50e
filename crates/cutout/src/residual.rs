//! PSF scaling and subtraction.
//!
//! The PSF is scaled by the ratio of the central-row sums of the cutout and
//! the (uncropped) PSF image, centre-cropped to the cutout shape and
//! subtracted pixel by pixel:
//!
//! ```text
//! scale    = sum(cutout[m/2, :]) / sum(psf[p/2, :])
//! residual = cutout - scale * crop(psf)
//! ```
//!
//! The crop keeps `m` pixels starting at `(p - m) / 2` on each axis, so an
//! odd size difference drops the extra pixel on the high-index side.

use tracing::debug;

use sky_common::{ImageF32, PixelBox, StampError, StampResult};

/// Output of [`composite`].
#[derive(Debug, Clone, PartialEq)]
pub struct Residual {
    pub scale: f64,
    /// PSF cropped to the cutout shape, before scaling.
    pub cropped_psf: ImageF32,
    /// `cutout - scale * cropped_psf`, on the cutout's pixel grid.
    pub image: ImageF32,
}

/// Sum of the middle row (`floor(height / 2)`), skipping non-finite pixels.
pub fn central_row_sum(image: &ImageF32) -> f64 {
    image
        .row(image.height() / 2)
        .map(|row| row.iter().filter(|v| v.is_finite()).map(|&v| v as f64).sum())
        .unwrap_or(0.0)
}

/// Ratio of the cutout and PSF central-row sums.
///
/// Fails with `DivideByZero` when the PSF row sums to zero or the ratio is
/// not finite.
pub fn compute_scale(cutout: &ImageF32, psf: &ImageF32) -> StampResult<f64> {
    let psf_sum = central_row_sum(psf);
    let cutout_sum = central_row_sum(cutout);
    if psf_sum == 0.0 {
        return Err(StampError::DivideByZero(
            "PSF central row sums to zero".to_string(),
        ));
    }
    let scale = cutout_sum / psf_sum;
    if !scale.is_finite() {
        return Err(StampError::DivideByZero(format!(
            "scale {} / {} is not finite",
            cutout_sum, psf_sum
        )));
    }
    Ok(scale)
}

/// Per-axis crop offsets `((p - m) / 2, (q - n) / 2)` for fitting a PSF of
/// `psf_dims` to a cutout of `cutout_dims`, both `(width, height)`.
pub fn crop_offsets(psf_dims: (usize, usize), cutout_dims: (usize, usize)) -> StampResult<(usize, usize)> {
    let (pw, ph) = psf_dims;
    let (cw, ch) = cutout_dims;
    if pw < cw || ph < ch {
        return Err(StampError::ShapeMismatch(format!(
            "PSF {}x{} is smaller than cutout {}x{}",
            pw, ph, cw, ch
        )));
    }
    Ok(((pw - cw) / 2, (ph - ch) / 2))
}

/// Centre-crop `psf` to `width`×`height`. The crop keeps its parent-frame
/// origin.
pub fn center_crop(psf: &ImageF32, width: usize, height: usize) -> StampResult<ImageF32> {
    let (ox, oy) = crop_offsets((psf.width(), psf.height()), (width, height))?;
    let (x0, y0) = psf.xy0();
    psf.subimage(&PixelBox::new(x0 + ox as i64, y0 + oy as i64, width, height))
}

/// `cutout - scale * psf`, elementwise. The result takes the cutout's
/// bounding box.
pub fn subtract_scaled(cutout: &ImageF32, psf: &ImageF32, scale: f64) -> StampResult<ImageF32> {
    if (cutout.width(), cutout.height()) != (psf.width(), psf.height()) {
        return Err(StampError::ShapeMismatch(format!(
            "cutout {}x{} vs PSF {}x{}",
            cutout.width(),
            cutout.height(),
            psf.width(),
            psf.height()
        )));
    }
    let data = cutout
        .data()
        .iter()
        .zip(psf.data())
        .map(|(&c, &p)| (c as f64 - scale * p as f64) as f32)
        .collect();
    ImageF32::new(cutout.bbox(), data)
}

/// Scale, crop and subtract `psf` from `cutout`.
pub fn composite(cutout: &ImageF32, psf: &ImageF32) -> StampResult<Residual> {
    let scale = compute_scale(cutout, psf)?;
    let cropped_psf = center_crop(psf, cutout.width(), cutout.height())?;
    let image = subtract_scaled(cutout, &cropped_psf, scale)?;
    debug!(
        scale,
        cutout = %cutout.bbox(),
        psf = %psf.bbox(),
        "Composited residual"
    );
    Ok(Residual {
        scale,
        cropped_psf,
        image,
    })
}
