//! Storage abstractions for the stamp toolkit.
//!
//! Provides:
//! - The `ImageRepository` capability: sky map lookup and bounded reads of
//!   stored coadd tiles
//! - An in-memory repository for tests and embedding
//! - An on-disk repository of multi-extension FITS tiles
//! - A synthetic star-field generator that populates a repository

pub mod exposure;
pub mod fs;
pub mod memory;
pub mod repository;
pub mod synthetic;

pub use exposure::{DataId, Exposure};
pub use fs::{FsRepository, RepoManifest};
pub use memory::MemoryRepository;
pub use repository::ImageRepository;
pub use synthetic::{Star, SyntheticReport, SyntheticSky};
