//! Exposures: pixels, mask and variance with their WCS and PSF.

use std::fmt;
use std::sync::Arc;

use projection::TanWcs;
use psf::PsfModel;
use sky_common::{Band, ImageF32, ImageKind, Mask, MaskPlane, PixelBox, StampError, StampResult, TileIndex};

/// Key of one stored image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataId {
    pub tile: TileIndex,
    pub band: Band,
    pub kind: ImageKind,
}

impl DataId {
    pub fn coadd(tile: TileIndex, band: Band) -> Self {
        Self {
            tile,
            band,
            kind: ImageKind::Coadd,
        }
    }
}

impl fmt::Display for DataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} band={}", self.kind.dataset_name(), self.tile, self.band)
    }
}

/// Image, mask and variance planes sharing one bounding box, plus the
/// tract WCS (parent frame) and the tile's PSF model.
#[derive(Debug, Clone)]
pub struct Exposure {
    image: ImageF32,
    mask: Mask,
    variance: ImageF32,
    wcs: TanWcs,
    psf: Option<Arc<dyn PsfModel>>,
    data_id: DataId,
}

impl Exposure {
    pub fn new(
        data_id: DataId,
        image: ImageF32,
        mask: Mask,
        variance: ImageF32,
        wcs: TanWcs,
    ) -> StampResult<Self> {
        if mask.bbox() != image.bbox() || variance.bbox() != image.bbox() {
            return Err(StampError::ShapeMismatch(format!(
                "image {}, mask {}, variance {}",
                image.bbox(),
                mask.bbox(),
                variance.bbox()
            )));
        }
        Ok(Self {
            image,
            mask,
            variance,
            wcs,
            psf: None,
            data_id,
        })
    }

    /// Exposure with no data: NaN pixels and variance, `NO_DATA` everywhere.
    pub fn blank(data_id: DataId, bbox: PixelBox, wcs: TanWcs) -> Self {
        let mut mask = Mask::clear(bbox);
        mask.set_plane_all(MaskPlane::NoData);
        Self {
            image: ImageF32::filled(bbox, f32::NAN),
            mask,
            variance: ImageF32::filled(bbox, f32::NAN),
            wcs,
            psf: None,
            data_id,
        }
    }

    pub fn with_psf(mut self, psf: Option<Arc<dyn PsfModel>>) -> Self {
        self.psf = psf;
        self
    }

    pub fn image(&self) -> &ImageF32 {
        &self.image
    }

    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    pub fn variance(&self) -> &ImageF32 {
        &self.variance
    }

    /// Tract WCS in the parent pixel frame.
    pub fn wcs(&self) -> &TanWcs {
        &self.wcs
    }

    pub fn psf(&self) -> Option<&Arc<dyn PsfModel>> {
        self.psf.as_ref()
    }

    pub fn data_id(&self) -> DataId {
        self.data_id
    }

    pub fn bbox(&self) -> PixelBox {
        self.image.bbox()
    }

    /// Copy of the region `bbox`, which must lie inside this exposure.
    pub fn subset(&self, bbox: &PixelBox) -> StampResult<Exposure> {
        Ok(Exposure {
            image: self.image.subimage(bbox)?,
            mask: self.mask.subimage(bbox)?,
            variance: self.variance.subimage(bbox)?,
            wcs: self.wcs,
            psf: self.psf.clone(),
            data_id: self.data_id,
        })
    }

    /// Overwrite the overlapping region with `other`'s planes.
    pub fn paste(&mut self, other: &Exposure) {
        self.image.paste(&other.image);
        self.mask.paste(&other.mask);
        self.variance.paste(&other.variance);
        if self.psf.is_none() {
            self.psf = other.psf.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psf::PsfDescriptor;
    use sky_common::{PatchIndex, Point2D, SkyCoord};

    fn wcs() -> TanWcs {
        TanWcs::north_up(SkyCoord::new(10.0, -5.0).unwrap(), Point2D::new(50.0, 50.0), 0.2).unwrap()
    }

    fn data_id() -> DataId {
        DataId::coadd(TileIndex::new(7, PatchIndex::new(1, 2)), Band::I)
    }

    fn exposure(bbox: PixelBox) -> Exposure {
        Exposure::new(
            data_id(),
            ImageF32::filled(bbox, 3.0),
            Mask::clear(bbox),
            ImageF32::filled(bbox, 0.5),
            wcs(),
        )
        .unwrap()
    }

    #[test]
    fn test_mismatched_planes_rejected() {
        let bbox = PixelBox::new(0, 0, 4, 4);
        let result = Exposure::new(
            data_id(),
            ImageF32::filled(bbox, 0.0),
            Mask::clear(PixelBox::new(0, 0, 4, 3)),
            ImageF32::filled(bbox, 0.0),
            wcs(),
        );
        assert!(matches!(result, Err(StampError::ShapeMismatch(_))));
    }

    #[test]
    fn test_subset_keeps_psf_and_wcs() {
        let exp = exposure(PixelBox::new(0, 0, 20, 20))
            .with_psf(Some(Arc::new(PsfDescriptor::gaussian(1.0)) as Arc<dyn PsfModel>));
        let sub = exp.subset(&PixelBox::new(5, 5, 3, 3)).unwrap();
        assert_eq!(sub.bbox(), PixelBox::new(5, 5, 3, 3));
        assert!(sub.psf().is_some());
        assert_eq!(sub.wcs(), exp.wcs());
        assert!(exp.subset(&PixelBox::new(18, 18, 3, 3)).is_err());
    }

    #[test]
    fn test_blank_then_paste() {
        let mut blank = Exposure::blank(data_id(), PixelBox::new(-2, -2, 5, 5), wcs());
        blank.paste(&exposure(PixelBox::new(0, 0, 10, 10)));
        assert!(blank.image().get(0, 0).unwrap().is_nan());
        assert!(blank.mask().is_set(0, 0, MaskPlane::NoData));
        assert_eq!(blank.image().get(4, 4), Some(3.0));
        assert!(!blank.mask().is_set(4, 4, MaskPlane::NoData));
        assert_eq!(blank.variance().get(2, 2), Some(0.5));
    }

    #[test]
    fn test_data_id_display() {
        assert_eq!(data_id().to_string(), "deepCoadd 7:1,2 band=i");
    }
}
