//! Deterministic synthetic star fields.
//!
//! Used to populate repositories for demos and tests: every patch gets a set
//! of point sources rendered through a PSF descriptor, a flat background,
//! seeded Gaussian noise and a `DETECTED` mask above a threshold.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use projection::{LayoutConfig, SkyMap, SkyMapConfig, TractInfo, TractSpec};
use psf::{PsfDescriptor, PsfModel};
use sky_common::{
    Band, ImageF32, ImageKind, Mask, MaskPlane, PatchIndex, Point2D, StampError, StampResult, TileIndex,
};

use crate::exposure::{DataId, Exposure};
use crate::fs::FsRepository;
use crate::memory::MemoryRepository;
use crate::repository::ImageRepository;

/// Parameters of a synthetic sky.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticSky {
    pub seed: u64,
    pub stars_per_patch: usize,
    pub min_flux: f64,
    pub max_flux: f64,
    pub background: f32,
    pub noise_sigma: f32,
    pub psf: PsfDescriptor,
    /// Detection threshold in units of `noise_sigma` above background.
    pub detection_sigma: f32,
    pub bands: Vec<Band>,
}

impl Default for SyntheticSky {
    fn default() -> Self {
        Self {
            seed: 42,
            stars_per_patch: 20,
            min_flux: 1_000.0,
            max_flux: 50_000.0,
            background: 0.0,
            noise_sigma: 1.0,
            psf: PsfDescriptor::gaussian(2.0),
            detection_sigma: 5.0,
            bands: vec![Band::R],
        }
    }
}

/// A rendered point source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Star {
    pub id: u64,
    pub tract: u32,
    pub patch: PatchIndex,
    pub ra: f64,
    pub dec: f64,
    /// Tract-frame pixel position.
    pub x: f64,
    pub y: f64,
    pub flux: f64,
}

/// Outcome of populating a repository.
#[derive(Debug, Clone, Default)]
pub struct SyntheticReport {
    pub tiles_written: usize,
    /// One entry per star (shared by all bands).
    pub stars: Vec<Star>,
}

/// Single-tract explicit sky map of `patches`×`patches` small patches.
pub fn demo_sky_map_config(ra: f64, dec: f64, patches: u32) -> SkyMapConfig {
    SkyMapConfig {
        layout: LayoutConfig::Explicit {
            tracts: vec![TractSpec {
                id: 0,
                ra,
                dec,
                num_patches_x: patches,
                num_patches_y: patches,
            }],
        },
        pixel_scale_arcsec: 0.2,
        patch_inner_dim: 400,
        patch_border: 50,
        tract_overlap_deg: 0.0,
        tract_subset: None,
    }
}

impl SyntheticSky {
    fn validate(&self) -> StampResult<()> {
        if !(self.min_flux > 0.0 && self.max_flux >= self.min_flux) {
            return Err(StampError::invalid_parameter(
                "flux",
                format!("need 0 < min_flux <= max_flux, got {}..{}", self.min_flux, self.max_flux),
            ));
        }
        if !(self.noise_sigma >= 0.0) {
            return Err(StampError::invalid_parameter("noise_sigma", "must be >= 0"));
        }
        if self.bands.is_empty() {
            return Err(StampError::invalid_parameter("bands", "at least one band is required"));
        }
        self.psf.validate()
    }

    fn tile_rng(&self, tile: TileIndex) -> StdRng {
        let key = (tile.tract as u64) << 32 | (tile.patch.x as u64) << 16 | tile.patch.y as u64;
        StdRng::seed_from_u64(self.seed ^ key.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    /// Star list of one patch, placed in its inner region.
    pub fn stars_for(&self, tract: &TractInfo, patch: PatchIndex) -> StampResult<Vec<Star>> {
        let inner = tract
            .patch_inner_bbox(patch)
            .ok_or_else(|| StampError::invalid_parameter("patch", format!("{} not in tract {}", patch, tract.id)))?;
        let tile = TileIndex::new(tract.id, patch);
        let mut rng = self.tile_rng(tile);

        let mut stars = Vec::with_capacity(self.stars_per_patch);
        for i in 0..self.stars_per_patch {
            let x = inner.x0 as f64 + rng.gen::<f64>() * (inner.width - 1) as f64;
            let y = inner.y0 as f64 + rng.gen::<f64>() * (inner.height - 1) as f64;
            let flux = self.min_flux + rng.gen::<f64>() * (self.max_flux - self.min_flux);
            let sky = tract.wcs.pixel_to_sky(Point2D::new(x, y))?;
            stars.push(Star {
                id: (tract.id as u64) << 32 | (patch.x as u64) << 24 | (patch.y as u64) << 16 | i as u64,
                tract: tract.id,
                patch,
                ra: sky.ra(),
                dec: sky.dec(),
                x,
                y,
                flux,
            });
        }
        Ok(stars)
    }

    /// Render one tile (the patch outer region) in one band.
    pub fn render_tile(&self, tract: &TractInfo, patch: PatchIndex, band: Band) -> StampResult<(Exposure, Vec<Star>)> {
        let bbox = tract
            .patch_outer_bbox(patch)
            .ok_or_else(|| StampError::invalid_parameter("patch", format!("{} not in tract {}", patch, tract.id)))?;
        let stars = self.stars_for(tract, patch)?;

        let mut image = ImageF32::filled(bbox, 0.0);
        for star in &stars {
            let stamp = self.psf.compute_image(Point2D::new(star.x, star.y))?;
            add_scaled(&mut image, &stamp, star.flux as f32);
        }

        // noise differs per band, stars do not
        let tile = TileIndex::new(tract.id, patch);
        let mut rng = self.tile_rng(tile);
        for _ in 0..=(band as u64) {
            rng.gen::<u64>();
        }

        let threshold = self.detection_sigma * self.noise_sigma;
        let mut mask = Mask::clear(bbox);
        for (i, value) in image.data_mut().iter_mut().enumerate() {
            if *value > threshold {
                let (col, row) = (i % bbox.width, i / bbox.width);
                mask.set_plane(col, row, MaskPlane::Detected);
            }
            *value += self.background + self.noise_sigma * gaussian(&mut rng) as f32;
        }
        let variance = ImageF32::filled(bbox, self.noise_sigma * self.noise_sigma);

        let exposure = Exposure::new(DataId::coadd(tile, band), image, mask, variance, tract.wcs)?;
        debug!(tile = %tile, band = %band, stars = stars.len(), "Rendered synthetic tile");
        Ok((exposure, stars))
    }

    /// Render every tile of every available tract, handing each to `store`.
    pub fn generate<F>(&self, sky_map: &SkyMap, mut store: F) -> StampResult<SyntheticReport>
    where
        F: FnMut(&Exposure) -> StampResult<()>,
    {
        self.validate()?;
        let mut report = SyntheticReport::default();
        for tract in sky_map.tracts() {
            for patch in tract.patches() {
                for (i, &band) in self.bands.iter().enumerate() {
                    let (exposure, stars) = self.render_tile(tract, patch, band)?;
                    store(&exposure)?;
                    report.tiles_written += 1;
                    if i == 0 {
                        report.stars.extend(stars);
                    }
                }
            }
        }
        info!(
            tiles = report.tiles_written,
            stars = report.stars.len(),
            "Generated synthetic sky"
        );
        Ok(report)
    }

    /// Write a synthetic sky into an on-disk repository, with PSF descriptors.
    pub fn populate(&self, repo: &FsRepository) -> StampResult<SyntheticReport> {
        let sky_map = repo.sky_map(ImageKind::Coadd)?;
        self.generate(&sky_map, |exposure| repo.write(exposure, Some(&self.psf)).map(|_| ()))
    }

    /// Fill an in-memory repository. Tiles carry the PSF model.
    pub fn populate_memory(&self, repo: &MemoryRepository) -> StampResult<SyntheticReport> {
        let sky_map = repo.sky_map(ImageKind::Coadd)?;
        let psf: std::sync::Arc<dyn PsfModel> = std::sync::Arc::new(self.psf.clone());
        self.generate(&sky_map, |exposure| {
            repo.insert(exposure.clone().with_psf(Some(psf.clone())))
        })
    }
}

/// Add `scale * stamp` to the overlapping pixels of `target`.
fn add_scaled(target: &mut ImageF32, stamp: &ImageF32, scale: f32) {
    let Some(overlap) = target.bbox().intersection(&stamp.bbox()) else {
        return;
    };
    let (tx0, ty0) = target.xy0();
    let width = target.width();
    let data = target.data_mut();
    for y in overlap.y0..overlap.y1() {
        for x in overlap.x0..overlap.x1() {
            if let Some(v) = stamp.get_parent(x, y) {
                data[(y - ty0) as usize * width + (x - tx0) as usize] += scale * v;
            }
        }
    }
}

/// Standard normal deviate (Box-Muller).
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sky_map() -> SkyMap {
        SkyMap::from_config(demo_sky_map_config(150.0, 2.0, 1)).unwrap()
    }

    #[test]
    fn test_stars_are_deterministic() {
        let map = sky_map();
        let tract = map.tract(0).unwrap();
        let sky = SyntheticSky::default();
        let a = sky.stars_for(tract, PatchIndex::new(0, 0)).unwrap();
        let b = sky.stars_for(tract, PatchIndex::new(0, 0)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 20);

        let other = SyntheticSky { seed: 7, ..SyntheticSky::default() };
        assert_ne!(other.stars_for(tract, PatchIndex::new(0, 0)).unwrap(), a);
    }

    #[test]
    fn test_star_pixels_are_detected() {
        let map = sky_map();
        let tract = map.tract(0).unwrap();
        let sky = SyntheticSky {
            noise_sigma: 0.0,
            detection_sigma: 1.0,
            ..SyntheticSky::default()
        };
        let (exposure, stars) = sky.render_tile(tract, PatchIndex::new(0, 0), Band::R).unwrap();
        let bbox = exposure.bbox();
        for star in &stars {
            let (x, y) = Point2D::new(star.x, star.y).nearest_pixel();
            let (col, row) = ((x - bbox.x0) as usize, (y - bbox.y0) as usize);
            assert!(exposure.mask().is_set(col, row, MaskPlane::Detected));
        }
        // total flux is conserved for stars well inside the tile
        let total: f64 = stars.iter().map(|s| s.flux).sum();
        assert!(exposure.image().sum() <= total * 1.000_01);
    }

    #[test]
    fn test_rejects_bad_flux_range() {
        let sky = SyntheticSky {
            min_flux: 10.0,
            max_flux: 1.0,
            ..SyntheticSky::default()
        };
        assert!(sky.generate(&sky_map(), |_| Ok(())).is_err());
    }
}
