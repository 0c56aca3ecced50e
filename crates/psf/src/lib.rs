//! Point-spread-function models.
//!
//! A PSF model is bound to one tile and produces a normalized image of the
//! instrument response at any pixel position of that tile.
//!
//! # Example
//!
//! ```
//! use psf::{PsfDescriptor, PsfModel};
//! use sky_common::Point2D;
//!
//! let model = PsfDescriptor::gaussian(2.0);
//! let image = model.compute_image(Point2D::new(1020.3, 998.7)).unwrap();
//! assert_eq!((image.width(), image.height()), (61, 61));
//! assert!((image.sum() - 1.0).abs() < 1e-6);
//! ```

pub mod descriptor;
pub mod model;

pub use descriptor::{PsfDescriptor, DEFAULT_PSF_SIZE};
pub use model::{render_profile, PsfModel};
