//! An explicit drawing surface for stamps.
//!
//! A [`Canvas`] is owned by the caller and reused across draws. Every draw
//! starts from a cleared surface, so nothing from a previous stamp survives
//! into the next one. Images are drawn with row 0 at the bottom (lower
//! origin), optionally enlarged by an integer zoom with nearest-neighbour
//! sampling.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::RgbaImage;
use imageproc::drawing::{draw_cross_mut, draw_hollow_circle_mut};
use tracing::debug;

use sky_common::{ImageF32, Mask, MaskPlane, Point2D};

use crate::colormap::{Color, Colormap};
use crate::error::{RenderError, RenderResult};
use crate::png;
use crate::scale::{DisplayRange, Stretch, DEFAULT_HIGH_PERCENTILE, DEFAULT_LOW_PERCENTILE};

const MAX_ZOOM: u32 = 32;

/// Tint applied where a mask plane is set.
#[derive(Debug, Clone, Copy)]
pub struct MaskOverlay<'a> {
    pub mask: &'a Mask,
    pub plane: MaskPlane,
    /// Blended over the colormap using its alpha.
    pub color: Color,
}

/// How one image is turned into pixels.
#[derive(Debug, Clone)]
pub struct DrawOptions<'a> {
    /// Fixed range; when `None` the range comes from `percentiles`.
    pub range: Option<DisplayRange>,
    pub percentiles: (f32, f32),
    /// Force the range to be symmetric about zero.
    pub symmetric: bool,
    pub stretch: Stretch,
    pub colormap: Colormap,
    /// Color of non-finite pixels.
    pub nan_color: Color,
    /// Point to mark, in pixel coordinates relative to the image origin.
    pub marker: Option<Point2D>,
    pub marker_color: Color,
    pub mask_overlay: Option<MaskOverlay<'a>>,
}

impl Default for DrawOptions<'_> {
    fn default() -> Self {
        Self {
            range: None,
            percentiles: (DEFAULT_LOW_PERCENTILE, DEFAULT_HIGH_PERCENTILE),
            symmetric: false,
            stretch: Stretch::Linear,
            colormap: Colormap::Gray,
            nan_color: Color::transparent(),
            marker: None,
            marker_color: Color::rgb(255, 64, 64),
            mask_overlay: None,
        }
    }
}

#[derive(Debug)]
pub struct Canvas {
    zoom: u32,
    buffer: RgbaImage,
    draws: u64,
}

impl Canvas {
    pub fn new(zoom: u32) -> RenderResult<Self> {
        if zoom == 0 || zoom > MAX_ZOOM {
            return Err(RenderError::InvalidDimensions(format!(
                "zoom {} outside 1..={}",
                zoom, MAX_ZOOM
            )));
        }
        Ok(Self {
            zoom,
            buffer: RgbaImage::new(0, 0),
            draws: 0,
        })
    }

    pub fn zoom(&self) -> u32 {
        self.zoom
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Number of completed draws since creation.
    pub fn draw_count(&self) -> u64 {
        self.draws
    }

    pub fn is_blank(&self) -> bool {
        self.buffer.width() == 0 || self.buffer.height() == 0
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.buffer
    }

    /// Color at canvas position (x, y), y counted from the top.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let p = self.buffer.get_pixel(x, y);
        Some(Color::new(p[0], p[1], p[2], p[3]))
    }

    /// Drop whatever is currently drawn.
    pub fn clear(&mut self) {
        self.buffer = RgbaImage::new(0, 0);
    }

    /// Clear, then draw `image`. Returns the display range used.
    pub fn draw(&mut self, image: &ImageF32, options: &DrawOptions<'_>) -> RenderResult<DisplayRange> {
        self.clear();

        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions(format!("{}x{} image", width, height)));
        }
        options.stretch.validate()?;
        if let Some(overlay) = &options.mask_overlay {
            if overlay.mask.bbox() != image.bbox() {
                return Err(RenderError::InvalidDimensions(format!(
                    "mask {} does not match image {}",
                    overlay.mask.bbox(),
                    image.bbox()
                )));
            }
        }

        let range = match options.range {
            Some(range) => range,
            None => {
                let (low, high) = options.percentiles;
                DisplayRange::from_percentiles(image.data(), low, high)
                    .unwrap_or(DisplayRange { vmin: 0.0, vmax: 1.0 })
            }
        };
        let range = if options.symmetric { range.symmetric() } else { range };

        let mut base = RgbaImage::new(width as u32, height as u32);
        for (row, values) in image.data().chunks_exact(width).enumerate() {
            let out_y = (height - 1 - row) as u32;
            for (col, &value) in values.iter().enumerate() {
                let mut color = match range.normalize(value) {
                    Some(t) => options.colormap.color_at(options.stretch.apply(t)),
                    None => options.nan_color,
                };
                if let Some(overlay) = &options.mask_overlay {
                    if overlay.mask.is_set(col, row, overlay.plane) {
                        color = color.blend(overlay.color);
                    }
                }
                base.put_pixel(col as u32, out_y, color.to_rgba());
            }
        }

        let mut buffer = if self.zoom > 1 {
            imageops::resize(&base, base.width() * self.zoom, base.height() * self.zoom, FilterType::Nearest)
        } else {
            base
        };

        if let Some(marker) = options.marker.filter(|p| p.is_finite()) {
            let zoom = self.zoom as f64;
            let cx = ((marker.x + 0.5) * zoom).floor() as i32;
            let cy = ((height as f64 - 0.5 - marker.y) * zoom).floor() as i32;
            let radius = (3 * self.zoom).max(4) as i32;
            let color = options.marker_color.to_rgba();
            draw_hollow_circle_mut(&mut buffer, (cx, cy), radius, color);
            draw_cross_mut(&mut buffer, color, cx, cy);
        }

        self.buffer = buffer;
        self.draws += 1;
        debug!(
            width = self.buffer.width(),
            height = self.buffer.height(),
            vmin = range.vmin,
            vmax = range.vmax,
            colormap = %options.colormap,
            "Drew stamp"
        );
        Ok(range)
    }

    /// PNG bytes of the current drawing.
    pub fn encode_png(&self) -> RenderResult<Vec<u8>> {
        if self.is_blank() {
            return Err(RenderError::InvalidDimensions("nothing drawn".into()));
        }
        png::encode_auto(self.buffer.as_raw(), self.width() as usize, self.height() as usize)
    }

    pub fn save_png(&self, path: &Path) -> RenderResult<()> {
        let bytes = self.encode_png()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}
