//! Catalog access for object tables and light curves.
//!
//! A catalog is a set of partitions sharing one column schema. Each partition
//! carries native (storage-level) values such as `tract`, which native
//! filters test before any row is read. Row filters and selected columns may
//! name stored or derived quantities. Light curves are iterated lazily, one
//! object at a time.
//!
//! Filters use a small predicate language, `<column> <op> <literal>`, and are
//! always combined with AND.

pub mod catalog;
pub mod error;
pub mod predicate;
pub mod registry;
pub mod table;
pub mod value;

pub use catalog::{Catalog, CatalogFile, Derived, LightCurve, MemoryCatalog};
pub use error::{CatalogError, CatalogResult};
pub use predicate::{Op, Predicate};
pub use registry::CatalogRegistry;
pub use table::Table;
pub use value::Value;
