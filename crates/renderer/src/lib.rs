//! Rendering of postage stamps.
//!
//! - Display scaling (percentile ranges, linear and asinh stretches)
//! - Colormaps built from color stops
//! - An explicit, reusable [`Canvas`] that is cleared before every draw
//! - PNG encoding and FITS output of single images

pub mod canvas;
pub mod colormap;
pub mod error;
pub mod output;
pub mod png;
pub mod scale;

pub use canvas::{Canvas, DrawOptions, MaskOverlay};
pub use colormap::{Color, Colormap};
pub use error::{RenderError, RenderResult};
pub use output::{read_fits_image, write_fits_image, OutputFormat};
pub use scale::{DisplayRange, Stretch};
