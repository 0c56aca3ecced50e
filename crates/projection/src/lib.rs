//! World-coordinate transforms and sky tiling.
//!
//! Implements the gnomonic (TAN) projection used by coadd tracts and the
//! ring-based tract/patch sky map without external astronomy libraries.

pub mod skymap;
pub mod tan;

pub use skymap::{LayoutConfig, SkyMap, SkyMapConfig, TractInfo, TractSpec};
pub use tan::TanWcs;
