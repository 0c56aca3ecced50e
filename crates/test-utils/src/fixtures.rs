//! Common test fixtures: sky positions, sky maps and PSF descriptors.

use projection::{LayoutConfig, SkyMap, SkyMapConfig, TractSpec};
use psf::PsfDescriptor;

/// Sky positions used across the test suite, in degrees.
pub mod sky {
    /// Near the centre of the DC2 footprint.
    pub const DC2_CENTER: (f64, f64) = (61.863, -35.79);

    /// A field well away from the poles and RA wrap.
    pub const EQUATORIAL: (f64, f64) = (150.0, 2.2);

    /// Just east of RA = 0, for wrap-around cases.
    pub const RA_WRAP: (f64, f64) = (0.05, -10.0);
}

/// Single-tract explicit sky map config, id 0, 0.2"/px.
///
/// The tract has `patches`×`patches` patches of `patch_dim` inner pixels and
/// a `border`-pixel overlap.
pub fn single_tract_config(ra: f64, dec: f64, patches: u32, patch_dim: usize, border: usize) -> SkyMapConfig {
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
        patch_inner_dim: patch_dim,
        patch_border: border,
        tract_overlap_deg: 0.0,
        tract_subset: None,
    }
}

/// 2×2 patches of 200 pixels with a 20-pixel border.
pub fn single_tract_sky_map(ra: f64, dec: f64) -> SkyMap {
    SkyMap::from_config(single_tract_config(ra, dec, 2, 200, 20)).expect("fixture sky map is valid")
}

/// Round Gaussian PSF of the default 61×61 size.
pub fn gaussian_psf(sigma: f64) -> PsfDescriptor {
    PsfDescriptor::gaussian(sigma)
}

/// Round Gaussian PSF with an explicit kernel size.
pub fn gaussian_psf_sized(sigma: f64, size: usize) -> PsfDescriptor {
    PsfDescriptor::gaussian(sigma).with_size(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_tract_sky_map() {
        let map = single_tract_sky_map(sky::EQUATORIAL.0, sky::EQUATORIAL.1);
        assert_eq!(map.len(), 1);
        let tract = map.tract(0).unwrap();
        assert_eq!(tract.bbox.width, 400);
        assert_eq!(tract.patches().count(), 4);
    }

    #[test]
    fn test_psf_sizes() {
        assert_eq!(gaussian_psf(2.0).size(), 61);
        assert_eq!(gaussian_psf_sized(2.0, 25).size(), 25);
    }
}
