//! Command implementations.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use catalog::{Catalog, CatalogRegistry, LightCurve, MemoryCatalog, Predicate, Table};
use cutout::{BatchReport, CoordinateResolver, ProductWriter, StampPipeline};
use sky_common::{Band, ImageKind, SkyCoord};
use storage::synthetic::demo_sky_map_config;
use storage::{FsRepository, RepoManifest, SyntheticReport, SyntheticSky};

use crate::run_file::RunFile;

/// Name of the batch report written next to the products.
pub const REPORT_FILE: &str = "report.json";

/// Run a stamp batch and write its products and report.
pub fn stamps(run: &RunFile) -> Result<BatchReport> {
    let repo = FsRepository::open(&run.repository)
        .with_context(|| format!("Failed to open repository {:?}", run.repository))?;
    let pipeline = StampPipeline::new(Arc::new(repo), run.stamp.clone())?;
    let mut writer = ProductWriter::new(&run.output_dir, run.formats.clone(), run.display.clone())?;

    info!(
        targets = run.targets.len(),
        output_dir = %run.output_dir.display(),
        "Starting stamp batch"
    );
    let report = pipeline.run(&run.targets, |products| writer.write(products).map(|_| ()))?;

    let report_path = run.output_dir.join(REPORT_FILE);
    fs::write(&report_path, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("Failed to write {:?}", report_path))?;
    Ok(report)
}

/// Where a coordinate lands in a repository's tiling.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub ra: f64,
    pub dec: f64,
    pub tract: u32,
    pub patch: String,
    pub x: f64,
    pub y: f64,
}

pub fn resolve(repository: &Path, ra: f64, dec: f64) -> Result<Resolution> {
    let repo = FsRepository::open(repository)
        .with_context(|| format!("Failed to open repository {:?}", repository))?;
    let resolver = CoordinateResolver::from_repository(&repo, ImageKind::Coadd)?;
    let resolved = resolver.resolve(&SkyCoord::new(ra, dec)?)?;
    Ok(Resolution {
        ra: resolved.coord.ra(),
        dec: resolved.coord.dec(),
        tract: resolved.tile.tract,
        patch: resolved.tile.patch.to_string(),
        x: resolved.pixel.x,
        y: resolved.pixel.y,
    })
}

/// Settings for `simulate`.
#[derive(Debug, Clone)]
pub struct SimulateOptions {
    pub name: String,
    pub ra: f64,
    pub dec: f64,
    pub patches: u32,
    pub sky: SyntheticSky,
}

/// Name of the star list written by `simulate`.
pub const STARS_FILE: &str = "stars.json";

/// Create a single-tract synthetic repository in `dir`.
pub fn simulate(dir: &Path, options: &SimulateOptions) -> Result<SyntheticReport> {
    anyhow::ensure!(options.patches > 0, "Need at least one patch per side");
    let mut manifest = RepoManifest::new(
        &options.name,
        demo_sky_map_config(options.ra, options.dec, options.patches),
    );
    manifest.bands = options.sky.bands.clone();

    let repo = FsRepository::create(dir, manifest)
        .with_context(|| format!("Failed to create repository {:?}", dir))?;
    let report = options.sky.populate(&repo)?;
    fs::write(dir.join(STARS_FILE), serde_json::to_string_pretty(&report.stars)?)?;
    Ok(report)
}

/// Parse a comma separated band list such as `g,r,i`.
pub fn parse_bands(list: &str) -> Result<Vec<Band>> {
    list.split(',')
        .map(|b| b.trim().parse::<Band>().map_err(anyhow::Error::from))
        .collect()
}

/// Open a catalog given as a JSON file path, or by name from `catalog_dir`.
pub fn open_catalog(name_or_path: &str, catalog_dir: Option<&Path>) -> Result<Arc<dyn Catalog>> {
    let path = PathBuf::from(name_or_path);
    if path.is_file() {
        let catalog = MemoryCatalog::load(&path).with_context(|| format!("Failed to load catalog {:?}", path))?;
        return Ok(Arc::new(catalog));
    }
    let dir = catalog_dir.with_context(|| format!("{} is not a file and no catalog directory is set", name_or_path))?;
    let mut registry = CatalogRegistry::new();
    registry
        .load_dir(dir)
        .with_context(|| format!("Failed to load catalogs from {:?}", dir))?;
    Ok(registry.get(name_or_path)?)
}

/// Column query with row and native filters.
pub fn query(catalog: &dyn Catalog, columns: &[String], filters: &[String], native_filters: &[String]) -> Result<Table> {
    let columns = if columns.is_empty() {
        catalog.list_quantities()
    } else {
        columns.to_vec()
    };
    let filters = Predicate::parse_all(filters)?;
    let native_filters = Predicate::parse_all(native_filters)?;
    Ok(catalog.get_quantities(&columns, &filters, &native_filters)?)
}

/// Up to `limit` light curves.
pub fn light_curves(
    catalog: &dyn Catalog,
    object_filters: &[String],
    row_filters: &[String],
    limit: Option<usize>,
) -> Result<Vec<LightCurve>> {
    let object_filters = Predicate::parse_all(object_filters)?;
    let row_filters = Predicate::parse_all(row_filters)?;
    let curves = catalog.light_curves(&object_filters, &row_filters)?;
    let curves = curves.take(limit.unwrap_or(usize::MAX));
    Ok(curves.collect::<Result<Vec<_>, _>>()?)
}

/// Tab separated rendering with a header line.
pub fn format_table(table: &Table) -> String {
    let mut out = table.names().join("\t");
    out.push('\n');
    for i in 0..table.num_rows() {
        if let Some(row) = table.row(i) {
            let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            out.push_str(&cells.join("\t"));
            out.push('\n');
        }
    }
    out
}

/// Light curve as a `#` comment line of object values followed by its table.
pub fn format_light_curve(curve: &LightCurve) -> String {
    let mut out = String::from("#");
    for (key, value) in &curve.object {
        let _ = write!(out, " {}={}", key, value);
    }
    out.push('\n');
    out.push_str(&format_table(&curve.table));
    out
}
