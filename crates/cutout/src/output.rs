//! Writing stamp products to a directory.
//!
//! For each target three images are written in every requested format:
//! `<stem>_cutout`, `<stem>_psf` and `<stem>_residual`. FITS files keep the
//! numeric pixels (cutout and residual with the tract WCS); PNG files are
//! drawn on one reused [`Canvas`].

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use fits_io::{Card, FitsValue};
use renderer::{
    write_fits_image, Canvas, Color, Colormap, DisplayRange, DrawOptions, MaskOverlay,
    OutputFormat, Stretch,
};
use sky_common::{MaskPlane, StampResult};

use crate::pipeline::StampProducts;

/// How stamps are drawn for PNG output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
    /// Integer enlargement of each pixel.
    pub zoom: u32,
    pub colormap: Colormap,
    pub residual_colormap: Colormap,
    pub stretch: Stretch,
    pub low_percentile: f32,
    pub high_percentile: f32,
    /// Fixed cutout range; both ends must be set to take effect.
    pub vmin: Option<f32>,
    pub vmax: Option<f32>,
    /// Mark the target position on the cutout and residual.
    pub mark_target: bool,
    /// Tint this mask plane on the cutout.
    pub mask_overlay: Option<MaskPlane>,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            zoom: 4,
            colormap: Colormap::Gray,
            residual_colormap: Colormap::Coolwarm,
            stretch: Stretch::Linear,
            low_percentile: renderer::scale::DEFAULT_LOW_PERCENTILE,
            high_percentile: renderer::scale::DEFAULT_HIGH_PERCENTILE,
            vmin: None,
            vmax: None,
            mark_target: true,
            mask_overlay: None,
        }
    }
}

impl DisplayOptions {
    fn fixed_range(&self) -> StampResult<Option<DisplayRange>> {
        match (self.vmin, self.vmax) {
            (Some(vmin), Some(vmax)) => Ok(Some(DisplayRange::new(vmin, vmax)?)),
            _ => Ok(None),
        }
    }
}

const OVERLAY_COLOR: Color = Color::new(0, 200, 255, 110);

/// Writes stamp products, reusing a single canvas.
#[derive(Debug)]
pub struct ProductWriter {
    dir: PathBuf,
    formats: Vec<OutputFormat>,
    display: DisplayOptions,
    canvas: Canvas,
}

impl ProductWriter {
    pub fn new(dir: impl Into<PathBuf>, formats: Vec<OutputFormat>, display: DisplayOptions) -> StampResult<Self> {
        let dir = dir.into();
        display.stretch.validate()?;
        display.fixed_range()?;
        fs::create_dir_all(&dir)?;
        Ok(Self {
            canvas: Canvas::new(display.zoom)?,
            dir,
            formats,
            display,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Path of one product: `<dir>/<stem>_<product>.<ext>`.
    pub fn product_path(&self, stem: &str, product: &str, format: OutputFormat) -> PathBuf {
        self.dir.join(format!("{}_{}.{}", stem, product, format.extension()))
    }

    /// Write all products of one target. Returns the written paths.
    pub fn write(&mut self, products: &StampProducts) -> StampResult<Vec<PathBuf>> {
        let stem = products.target.file_stem();
        let mut written = Vec::with_capacity(self.formats.len() * 3);
        for format in self.formats.clone() {
            match format {
                OutputFormat::Fits => self.write_fits(products, &stem, &mut written)?,
                OutputFormat::Png => self.write_png(products, &stem, &mut written)?,
            }
        }
        debug!(target = %products.target.name, files = written.len(), "Wrote products");
        Ok(written)
    }

    fn write_fits(&self, products: &StampProducts, stem: &str, written: &mut Vec<PathBuf>) -> StampResult<()> {
        let wcs = products.cutout.wcs();
        let mut cards = target_cards(products);

        let path = self.product_path(stem, "cutout", OutputFormat::Fits);
        write_fits_image(&path, products.cutout.image(), Some(wcs), &cards)?;
        written.push(path);

        let path = self.product_path(stem, "psf", OutputFormat::Fits);
        write_fits_image(&path, &products.psf, None, &cards)?;
        written.push(path);

        cards.push(Card::new("PSFSCALE", FitsValue::Float(products.residual.scale)));
        let path = self.product_path(stem, "residual", OutputFormat::Fits);
        write_fits_image(&path, &products.residual.image, Some(wcs), &cards)?;
        written.push(path);
        Ok(())
    }

    fn write_png(&mut self, products: &StampProducts, stem: &str, written: &mut Vec<PathBuf>) -> StampResult<()> {
        let marker = self
            .display
            .mark_target
            .then(|| products.target_in_cutout());
        let base = DrawOptions {
            range: self.display.fixed_range()?,
            percentiles: (self.display.low_percentile, self.display.high_percentile),
            stretch: self.display.stretch,
            colormap: self.display.colormap,
            ..DrawOptions::default()
        };

        let cutout = DrawOptions {
            marker,
            mask_overlay: self.display.mask_overlay.map(|plane| MaskOverlay {
                mask: products.cutout.mask(),
                plane,
                color: OVERLAY_COLOR,
            }),
            ..base.clone()
        };
        let range = self.canvas.draw(products.cutout.image(), &cutout)?;
        written.push(self.save(stem, "cutout")?);

        let psf = DrawOptions {
            range: None,
            ..base.clone()
        };
        self.canvas.draw(&products.psf, &psf)?;
        written.push(self.save(stem, "psf")?);

        // residuals share the cutout's range, centred on zero
        let residual = DrawOptions {
            range: Some(range),
            symmetric: true,
            stretch: Stretch::Linear,
            colormap: self.display.residual_colormap,
            marker,
            ..base
        };
        self.canvas.draw(&products.residual.image, &residual)?;
        written.push(self.save(stem, "residual")?);
        Ok(())
    }

    fn save(&self, stem: &str, product: &str) -> StampResult<PathBuf> {
        let path = self.product_path(stem, product, OutputFormat::Png);
        self.canvas.save_png(&path)?;
        Ok(path)
    }
}

fn target_cards(products: &StampProducts) -> Vec<Card> {
    let id = products.cutout.data_id();
    vec![
        Card::new("OBJECT", FitsValue::String(products.target.name.clone())),
        Card::new("RA_TARG", FitsValue::Float(products.target.ra)),
        Card::new("DEC_TARG", FitsValue::Float(products.target.dec)),
        Card::new("BAND", FitsValue::String(id.band.to_string())),
        Card::new("TRACT", FitsValue::Integer(id.tile.tract as i64)),
        Card::new("PATCH", FitsValue::String(id.tile.patch.to_string())),
    ]
}
