//! Common types and utilities shared across all dc2-stamps crates.

pub mod band;
pub mod coord;
pub mod error;
pub mod image;
pub mod mask;
pub mod pixel_box;
pub mod tile;

pub use band::{Band, ImageKind};
pub use coord::{Point2D, SkyCoord};
pub use error::{StampError, StampResult};
pub use image::ImageF32;
pub use mask::{Mask, MaskPlane};
pub use pixel_box::PixelBox;
pub use tile::{PatchIndex, TileIndex};
