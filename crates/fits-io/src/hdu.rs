//! Image extensions: shape, parent-frame origin and data extent.

use std::fmt;

use fitsio::hdu::{FitsHdu, HduInfo};
use fitsio::images::ImageType;

use sky_common::PixelBox;

use crate::{FitsError, FitsResult};

/// Pixel layouts the stamp files use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelType {
    /// `BITPIX = -32`: pixels and variance
    F32,
    /// `BITPIX = 32`: mask planes
    I32,
}

impl PixelType {
    pub fn bytes(&self) -> usize {
        4
    }

    pub(crate) fn image_type(&self) -> ImageType {
        match self {
            PixelType::F32 => ImageType::Float,
            PixelType::I32 => ImageType::Long,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            PixelType::F32 => "FLOAT_IMG",
            PixelType::I32 => "LONG_IMG",
        }
    }

    fn of(image_type: &ImageType) -> Option<Self> {
        match image_type {
            ImageType::Float => Some(PixelType::F32),
            ImageType::Long => Some(PixelType::I32),
            _ => None,
        }
    }
}

/// A named 2D image extension of an open file.
pub struct ImageHdu {
    pub(crate) hdu: FitsHdu,
    name: String,
    pixel_type: PixelType,
    bbox: PixelBox,
}

impl fmt::Debug for ImageHdu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHdu")
            .field("name", &self.name)
            .field("pixel_type", &self.pixel_type)
            .field("bbox", &self.bbox)
            .finish()
    }
}

impl ImageHdu {
    /// Describe `hdu`, placing it at the origin given by its `LTV1`/`LTV2`.
    pub(crate) fn new(name: &str, hdu: FitsHdu, ltv: (f64, f64)) -> FitsResult<Self> {
        let (shape, image_type) = match &hdu.info {
            HduInfo::ImageInfo { shape, image_type } => (shape.clone(), image_type),
            _ => {
                return Err(FitsError::UnsupportedType {
                    name: name.to_string(),
                    found: "table".to_string(),
                    expected: "image",
                })
            }
        };
        // shape is [NAXIS2, NAXIS1]
        if shape.len() != 2 {
            return Err(FitsError::UnsupportedNaxis {
                name: name.to_string(),
                naxis: shape.len(),
            });
        }
        let pixel_type = PixelType::of(image_type).ok_or_else(|| FitsError::UnsupportedType {
            name: name.to_string(),
            found: format!("{:?}", image_type),
            expected: "FLOAT_IMG or LONG_IMG",
        })?;

        let (x0, y0) = (-ltv.0, -ltv.1);
        if x0.fract() != 0.0 || y0.fract() != 0.0 || !x0.is_finite() || !y0.is_finite() {
            return Err(FitsError::invalid("LTV1", "origin offsets must be whole pixels"));
        }

        Ok(Self {
            bbox: PixelBox::new(x0 as i64, y0 as i64, shape[1], shape[0]),
            hdu,
            name: name.to_string(),
            pixel_type,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    /// Parent-frame box covered by the extension.
    pub fn bbox(&self) -> PixelBox {
        self.bbox
    }

    pub(crate) fn expect_type(&self, expected: PixelType) -> FitsResult<()> {
        if self.pixel_type != expected {
            return Err(FitsError::UnsupportedType {
                name: self.name.clone(),
                found: self.pixel_type.name().to_string(),
                expected: expected.name(),
            });
        }
        Ok(())
    }

    /// Local rows and columns covering `bbox`.
    pub(crate) fn region(&self, bbox: &PixelBox) -> FitsResult<Region> {
        if bbox.is_empty() || !self.bbox.contains_box(bbox) {
            return Err(FitsError::OutsideImage {
                requested: bbox.to_string(),
                available: self.bbox.to_string(),
            });
        }
        Ok(Region {
            col0: (bbox.x0 - self.bbox.x0) as usize,
            row0: (bbox.y0 - self.bbox.y0) as usize,
            width: bbox.width,
            height: bbox.height,
        })
    }

    /// Bytes of pixel data up to the end of `region`'s last row.
    pub(crate) fn bytes_through(&self, region: &Region) -> FitsResult<u64> {
        data_bytes(self.bbox.width, region.row0 + region.height, self.pixel_type.bytes())
    }
}

/// Rows and columns of an extension, relative to its first pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Region {
    pub col0: usize,
    pub row0: usize,
    pub width: usize,
    pub height: usize,
}

/// `width * rows * bytes_per_pixel`, failing instead of overflowing.
pub fn data_bytes(width: usize, rows: usize, bytes_per_pixel: usize) -> FitsResult<u64> {
    width
        .checked_mul(rows)
        .and_then(|pixels| pixels.checked_mul(bytes_per_pixel))
        .and_then(|bytes| u64::try_from(bytes).ok())
        .ok_or_else(|| {
            FitsError::invalid(
                "NAXIS",
                format!("{} x {} pixels of {} bytes overflows", width, rows, bytes_per_pixel),
            )
        })
}
