//! On-disk formats for stamp products.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use fits_io::{write_tan_wcs, Card, FitsReader, FitsWriter, Header};
use projection::TanWcs;
use sky_common::ImageF32;

use crate::error::{RenderError, RenderResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Fits,
    Png,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Fits => "fits",
            OutputFormat::Png => "png",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fits" | "fit" => Ok(OutputFormat::Fits),
            "png" => Ok(OutputFormat::Png),
            _ => Err(RenderError::UnknownName {
                kind: "output format",
                value: s.to_string(),
            }),
        }
    }
}

/// Write `image` as a single `IMAGE` extension after an empty primary HDU.
///
/// The extension keeps the parent-frame origin and, when given, the WCS
/// expressed for the image's own pixel grid. `cards` are appended to the
/// extension header.
pub fn write_fits_image(path: &Path, image: &ImageF32, wcs: Option<&TanWcs>, cards: &[Card]) -> RenderResult<()> {
    let mut header = Header::new();
    if let Some(wcs) = wcs {
        write_tan_wcs(&mut header, wcs, image.xy0());
    }
    for card in cards {
        header.push(card.clone());
    }
    FitsWriter::create(path)?.write_image("IMAGE", image, &header)?;
    debug!(path = %path.display(), bbox = %image.bbox(), "Wrote FITS image");
    Ok(())
}

/// Read back an image written by [`write_fits_image`].
pub fn read_fits_image(path: &Path) -> RenderResult<(ImageF32, Option<TanWcs>)> {
    let mut reader = FitsReader::open(path)?;
    let ext = reader.extension("IMAGE")?;
    let image = reader.read_full_image(&ext)?;
    let wcs = reader.read_tan_wcs(&ext)?;
    Ok((image, wcs))
}
