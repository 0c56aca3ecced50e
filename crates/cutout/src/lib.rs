//! Postage-stamp extraction and PSF subtraction.
//!
//! For each target sky coordinate the pipeline:
//! 1. resolves the tract/patch and pixel position ([`CoordinateResolver`]),
//! 2. reads a square cutout from the repository ([`CutoutFetcher`]),
//! 3. evaluates the tile's PSF at the target ([`PsfEvaluator`]),
//! 4. scales and subtracts the PSF ([`residual::composite`]),
//! 5. hands the products to a sink, e.g. a [`ProductWriter`].

pub mod config;
pub mod fetcher;
pub mod footprint;
pub mod output;
pub mod pipeline;
pub mod psf_eval;
pub mod residual;
pub mod resolver;
pub mod target;

pub use config::{BatchPolicy, EdgePolicy, StampConfig};
pub use fetcher::{CutoutFetcher, CutoutRequest};
pub use footprint::{find_footprints, Footprint};
pub use output::{DisplayOptions, ProductWriter};
pub use pipeline::{BatchFailure, BatchReport, StampPipeline, StampProducts};
pub use psf_eval::PsfEvaluator;
pub use residual::Residual;
pub use resolver::{CoordinateResolver, Resolved};
pub use target::Target;
