//! PSF images at a target position.

use tracing::debug;

use sky_common::{ImageF32, Point2D, SkyCoord, StampError, StampResult};
use storage::Exposure;

/// Evaluates the PSF model carried by a cutout's source tile.
#[derive(Debug, Clone, Copy, Default)]
pub struct PsfEvaluator {
    expected_size: Option<usize>,
}

impl PsfEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log when the model's kernel differs from `size`×`size`.
    pub fn expecting(size: usize) -> Self {
        Self {
            expected_size: Some(size),
        }
    }

    /// Unit-sum PSF image at the pixel position of `coord` in the cutout's
    /// tract frame.
    ///
    /// Fails with `ModelUnavailable` when the tile has no PSF model.
    pub fn evaluate(&self, exposure: &Exposure, coord: &SkyCoord) -> StampResult<ImageF32> {
        let position = exposure.wcs().sky_to_pixel(coord).ok_or(StampError::Lookup {
            ra: coord.ra(),
            dec: coord.dec(),
        })?;
        self.evaluate_at(exposure, position)
    }

    /// Unit-sum PSF image at a tract-frame pixel position.
    pub fn evaluate_at(&self, exposure: &Exposure, position: Point2D) -> StampResult<ImageF32> {
        let model = exposure
            .psf()
            .ok_or_else(|| StampError::ModelUnavailable(exposure.data_id().to_string()))?;
        let image = model.compute_image(position)?;

        if let Some(size) = self.expected_size {
            if (image.width(), image.height()) != (size, size) {
                debug!(
                    expected = size,
                    width = image.width(),
                    height = image.height(),
                    "PSF kernel size differs from configuration"
                );
            }
        }
        debug!(x = position.x, y = position.y, bbox = %image.bbox(), "Evaluated PSF");
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use projection::SkyMap;
    use psf::PsfModel;
    use sky_common::{Band, Mask, PatchIndex, PixelBox, TileIndex};
    use storage::DataId;
    use test_utils::{assert_approx_eq, gaussian_psf, single_tract_config};

    fn exposure(with_psf: bool) -> (Exposure, SkyMap) {
        let sky_map = SkyMap::from_config(single_tract_config(40.0, -20.0, 1, 200, 0)).unwrap();
        let wcs = sky_map.tract(0).unwrap().wcs;
        let bbox = PixelBox::new(50, 50, 51, 51);
        let exposure = Exposure::new(
            DataId::coadd(TileIndex::new(0, PatchIndex::new(0, 0)), Band::I),
            ImageF32::filled(bbox, 0.0),
            Mask::clear(bbox),
            ImageF32::filled(bbox, 1.0),
            wcs,
        )
        .unwrap();
        let psf: Option<Arc<dyn PsfModel>> = if with_psf {
            Some(Arc::new(gaussian_psf(2.5)))
        } else {
            None
        };
        (exposure.with_psf(psf), sky_map)
    }

    #[test]
    fn test_psf_at_target_is_normalized() {
        let (exposure, sky_map) = exposure(true);
        let target = sky_map
            .tract(0)
            .unwrap()
            .wcs
            .pixel_to_sky(Point2D::new(75.3, 74.8))
            .unwrap();
        let image = PsfEvaluator::expecting(61).evaluate(&exposure, &target).unwrap();
        assert_eq!((image.width(), image.height()), (61, 61));
        assert_approx_eq!(image.sum(), 1.0, 1e-6);
        // centre pixel (75, 75) sits at local index 30
        assert_eq!(image.xy0(), (45, 45));
    }

    #[test]
    fn test_missing_model_is_surfaced() {
        let (exposure, _) = exposure(false);
        let err = PsfEvaluator::new()
            .evaluate_at(&exposure, Point2D::new(75.0, 75.0))
            .unwrap_err();
        assert!(matches!(err, StampError::ModelUnavailable(_)));
    }
}
