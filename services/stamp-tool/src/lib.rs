//! Stamp tool library.
//!
//! The command implementations behind the `stamp-tool` binary: run files,
//! stamp batches, coordinate lookup, synthetic repositories and catalog
//! queries.

pub mod commands;
pub mod run_file;
