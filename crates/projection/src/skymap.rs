//! Tract/patch tiling of the sky.
//!
//! The sky is partitioned into tracts, each with its own TAN pixel grid, and
//! every tract is subdivided into a regular grid of patches. Two layouts are
//! supported:
//! - **Rings**: polar cap tracts plus rings of constant declination, each
//!   ring holding evenly spaced tracts in right ascension
//! - **Explicit**: a listed set of tracts (small surveys and tests)

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use tracing::debug;

use sky_common::{PatchIndex, PixelBox, Point2D, SkyCoord, StampError, StampResult, TileIndex};

use crate::TanWcs;

/// Configuration of a sky map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkyMapConfig {
    /// Tract layout.
    pub layout: LayoutConfig,
    /// Pixel scale of every tract, arcseconds per pixel.
    pub pixel_scale_arcsec: f64,
    /// Side of a patch inner region, pixels.
    pub patch_inner_dim: usize,
    /// Border added around each patch inner region, pixels.
    pub patch_border: usize,
    /// Overlap between adjacent tracts, degrees.
    #[serde(default)]
    pub tract_overlap_deg: f64,
    /// Restrict lookups to these tract ids.
    #[serde(default)]
    pub tract_subset: Option<Vec<u32>>,
}

impl Default for SkyMapConfig {
    fn default() -> Self {
        // DC2 coadd geometry
        Self {
            layout: LayoutConfig::Rings {
                num_rings: 120,
                ra_start_deg: 0.0,
            },
            pixel_scale_arcsec: 0.2,
            patch_inner_dim: 4000,
            patch_border: 100,
            tract_overlap_deg: 1.0 / 60.0,
            tract_subset: None,
        }
    }
}

/// Tract layout variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayoutConfig {
    Rings { num_rings: u32, ra_start_deg: f64 },
    Explicit { tracts: Vec<TractSpec> },
}

/// One tract of an explicit layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TractSpec {
    pub id: u32,
    pub ra: f64,
    pub dec: f64,
    pub num_patches_x: u32,
    pub num_patches_y: u32,
}

/// Geometry of one tract.
#[derive(Debug, Clone, PartialEq)]
pub struct TractInfo {
    pub id: u32,
    pub center: SkyCoord,
    pub wcs: TanWcs,
    /// Pixel extent, origin at (0, 0).
    pub bbox: PixelBox,
    /// Patch grid dimensions (x, y).
    pub num_patches: (u32, u32),
    pub patch_inner_dim: usize,
    pub patch_border: usize,
}

impl TractInfo {
    fn new(
        id: u32,
        center: SkyCoord,
        num_patches: (u32, u32),
        config: &SkyMapConfig,
    ) -> StampResult<Self> {
        let width = num_patches.0 as usize * config.patch_inner_dim;
        let height = num_patches.1 as usize * config.patch_inner_dim;
        let crpix = Point2D::new((width as f64 - 1.0) / 2.0, (height as f64 - 1.0) / 2.0);
        let wcs = TanWcs::north_up(center, crpix, config.pixel_scale_arcsec)?;
        Ok(Self {
            id,
            center,
            wcs,
            bbox: PixelBox::new(0, 0, width, height),
            num_patches,
            patch_inner_dim: config.patch_inner_dim,
            patch_border: config.patch_border,
        })
    }

    /// Pixel position of a sky coordinate, if it lands inside this tract.
    pub fn pixel_of(&self, coord: &SkyCoord) -> Option<Point2D> {
        self.wcs
            .sky_to_pixel(coord)
            .filter(|p| self.bbox.contains_point(*p))
    }

    /// Patch containing a pixel position.
    pub fn find_patch(&self, pixel: Point2D) -> Option<PatchIndex> {
        let (x, y) = pixel.nearest_pixel();
        if !self.bbox.contains_pixel(x, y) {
            return None;
        }
        let inner = self.patch_inner_dim as i64;
        Some(PatchIndex::new(
            ((x - self.bbox.x0) / inner) as u32,
            ((y - self.bbox.y0) / inner) as u32,
        ))
    }

    /// Inner (non-overlapping) region of a patch.
    pub fn patch_inner_bbox(&self, patch: PatchIndex) -> Option<PixelBox> {
        if patch.x >= self.num_patches.0 || patch.y >= self.num_patches.1 {
            return None;
        }
        let inner = self.patch_inner_dim;
        Some(PixelBox::new(
            self.bbox.x0 + (patch.x as usize * inner) as i64,
            self.bbox.y0 + (patch.y as usize * inner) as i64,
            inner,
            inner,
        ))
    }

    /// Stored region of a patch: the inner box grown by the border and
    /// clipped to the tract.
    pub fn patch_outer_bbox(&self, patch: PatchIndex) -> Option<PixelBox> {
        self.patch_inner_bbox(patch)?
            .grow(self.patch_border)
            .intersection(&self.bbox)
    }

    /// All patches of the tract, row by row.
    pub fn patches(&self) -> impl Iterator<Item = PatchIndex> + '_ {
        (0..self.num_patches.1).flat_map(move |y| (0..self.num_patches.0).map(move |x| PatchIndex::new(x, y)))
    }
}

/// Ring bookkeeping for the rings layout.
#[derive(Debug, Clone, PartialEq)]
struct RingLayout {
    ring_size: f64,
    ra_start: f64,
    /// Number of tracts in each ring, south to north.
    ring_counts: Vec<u32>,
}

/// A complete tiling of (part of) the sky.
#[derive(Debug, Clone, PartialEq)]
pub struct SkyMap {
    config: SkyMapConfig,
    tracts: Vec<TractInfo>,
    rings: Option<RingLayout>,
}

impl SkyMap {
    /// Build the sky map described by `config`.
    pub fn from_config(config: SkyMapConfig) -> StampResult<Self> {
        if config.patch_inner_dim == 0 {
            return Err(StampError::invalid_parameter("patch_inner_dim", "must be > 0"));
        }
        if !(config.pixel_scale_arcsec > 0.0) {
            return Err(StampError::invalid_parameter("pixel_scale_arcsec", "must be > 0"));
        }

        let (tracts, rings) = match &config.layout {
            LayoutConfig::Rings {
                num_rings,
                ra_start_deg,
            } => {
                let (tracts, rings) = build_rings(&config, *num_rings, ra_start_deg.to_radians())?;
                (tracts, Some(rings))
            }
            LayoutConfig::Explicit { tracts } => {
                let built = tracts
                    .iter()
                    .map(|spec| {
                        let center = SkyCoord::new(spec.ra, spec.dec)?;
                        TractInfo::new(spec.id, center, (spec.num_patches_x, spec.num_patches_y), &config)
                    })
                    .collect::<StampResult<Vec<_>>>()?;
                (built, None)
            }
        };

        debug!(tracts = tracts.len(), "Built sky map");

        Ok(Self {
            config,
            tracts,
            rings,
        })
    }

    pub fn config(&self) -> &SkyMapConfig {
        &self.config
    }

    /// Number of tracts in the full layout.
    pub fn len(&self) -> usize {
        self.tracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracts.is_empty()
    }

    /// Look up a tract by id.
    pub fn tract(&self, id: u32) -> Option<&TractInfo> {
        match &self.rings {
            Some(_) => self.tracts.get(id as usize).filter(|t| t.id == id),
            None => self.tracts.iter().find(|t| t.id == id),
        }
    }

    /// Tracts available for lookup (respecting `tract_subset`).
    pub fn tracts(&self) -> impl Iterator<Item = &TractInfo> {
        self.tracts.iter().filter(move |t| self.is_available(t.id))
    }

    fn is_available(&self, id: u32) -> bool {
        match &self.config.tract_subset {
            Some(subset) => subset.contains(&id),
            None => true,
        }
    }

    /// Tract containing a sky coordinate.
    pub fn find_tract(&self, coord: &SkyCoord) -> Option<&TractInfo> {
        let tract = match &self.rings {
            Some(rings) => {
                let id = rings.tract_id(coord);
                self.tracts.get(id as usize).filter(|t| t.pixel_of(coord).is_some())
            }
            None => self
                .tracts
                .iter()
                .filter(|t| t.pixel_of(coord).is_some())
                .min_by(|a, b| {
                    coord
                        .separation(&a.center)
                        .total_cmp(&coord.separation(&b.center))
                }),
        };
        tract.filter(|t| self.is_available(t.id))
    }

    /// Tile index and tract pixel position of a sky coordinate.
    pub fn find_tile(&self, coord: &SkyCoord) -> StampResult<(TileIndex, Point2D)> {
        let lookup_error = || StampError::Lookup {
            ra: coord.ra(),
            dec: coord.dec(),
        };
        let tract = self.find_tract(coord).ok_or_else(lookup_error)?;
        let pixel = tract.pixel_of(coord).ok_or_else(lookup_error)?;
        let patch = tract.find_patch(pixel).ok_or_else(lookup_error)?;
        Ok((TileIndex::new(tract.id, patch), pixel))
    }
}

impl RingLayout {
    /// Id of the tract whose cell holds `coord`.
    fn tract_id(&self, coord: &SkyCoord) -> u32 {
        let ring_pos = (coord.dec_rad() + PI / 2.0) / self.ring_size - 0.5;
        if ring_pos < 0.0 {
            return 0;
        }
        let ring = ring_pos.floor() as usize;
        if ring >= self.ring_counts.len() {
            return 1 + self.ring_counts.iter().sum::<u32>();
        }
        let n = self.ring_counts[ring];
        let step = 2.0 * PI / n as f64;
        let offset = (coord.ra_rad() - self.ra_start).rem_euclid(2.0 * PI);
        let in_ring = ((offset / step).round() as u32) % n;
        1 + self.ring_counts[..ring].iter().sum::<u32>() + in_ring
    }
}

fn build_rings(
    config: &SkyMapConfig,
    num_rings: u32,
    ra_start: f64,
) -> StampResult<(Vec<TractInfo>, RingLayout)> {
    if num_rings == 0 {
        return Err(StampError::invalid_parameter("num_rings", "must be > 0"));
    }
    let ring_size = PI / (num_rings as f64 + 1.0);
    let overlap = config.tract_overlap_deg.to_radians();
    let mut tracts = Vec::new();

    // South polar cap
    let cap_radius = ring_size / 2.0 + overlap;
    let south = SkyCoord::new(0.0, -90.0)?;
    tracts.push(TractInfo::new(0, south, cap_patches(cap_radius, config), config)?);

    let mut ring_counts = Vec::with_capacity(num_rings as usize);
    for ring in 0..num_rings {
        let start_dec = ring_size * (ring as f64 + 0.5) - PI / 2.0;
        let stop_dec = start_dec + ring_size;
        let edge_dec = start_dec.abs().min(stop_dec.abs());
        let n = (2.0 * PI * edge_dec.cos() / ring_size).floor() as u32 + 1;
        ring_counts.push(n);

        let center_dec = start_dec + ring_size / 2.0;
        let half_width = PI / n as f64;
        for j in 0..n {
            let ra = ra_start + 2.0 * PI * j as f64 / n as f64;
            let center = SkyCoord::from_radians(ra, center_dec)?;
            let patches = cell_patches(&center, half_width, start_dec, stop_dec, overlap, config)?;
            let id = tracts.len() as u32;
            tracts.push(TractInfo::new(id, center, patches, config)?);
        }
    }

    // North polar cap
    let north = SkyCoord::new(0.0, 90.0)?;
    let id = tracts.len() as u32;
    tracts.push(TractInfo::new(id, north, cap_patches(cap_radius, config), config)?);

    Ok((
        tracts,
        RingLayout {
            ring_size,
            ra_start,
            ring_counts,
        },
    ))
}

/// Patches needed to cover `half_extent` tangent-plane radians on each side.
fn patches_for_extent(half_extent: f64, config: &SkyMapConfig) -> u32 {
    let half_pixels = half_extent.to_degrees() * 3600.0 / config.pixel_scale_arcsec;
    ((2.0 * half_pixels) / config.patch_inner_dim as f64).ceil().max(1.0) as u32
}

fn cap_patches(radius: f64, config: &SkyMapConfig) -> (u32, u32) {
    let n = patches_for_extent(radius.tan(), config);
    (n, n)
}

/// Patch grid covering one ring cell plus overlap, measured in the tract's
/// own tangent plane.
fn cell_patches(
    center: &SkyCoord,
    half_width: f64,
    start_dec: f64,
    stop_dec: f64,
    overlap: f64,
    config: &SkyMapConfig,
) -> StampResult<(u32, u32)> {
    let mut max_xi: f64 = 0.0;
    let mut max_eta: f64 = 0.0;
    let low = (start_dec - overlap).max(-PI / 2.0);
    let high = (stop_dec + overlap).min(PI / 2.0);
    for dec in [low, center.dec_rad(), high] {
        let widen = overlap / dec.cos().max(1e-6);
        for dra in [-(half_width + widen), 0.0, half_width + widen] {
            let (xi, eta) = crate::tan::tan_project(center.ra_rad() + dra, dec, center.ra_rad(), center.dec_rad())
                .ok_or_else(|| {
                    StampError::invalid_parameter("num_rings", "ring cell too wide for a tangent-plane tract")
                })?;
            max_xi = max_xi.max(xi.abs());
            max_eta = max_eta.max(eta.abs());
        }
    }
    Ok((patches_for_extent(max_xi, config), patches_for_extent(max_eta, config)))
}
