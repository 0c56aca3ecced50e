//! Sky coordinate to tract/patch and pixel position.

use std::sync::Arc;

use tracing::debug;

use projection::SkyMap;
use sky_common::{ImageKind, Point2D, SkyCoord, StampResult, TileIndex};
use storage::ImageRepository;

/// Where a coordinate lands in the tiling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved {
    pub coord: SkyCoord,
    pub tile: TileIndex,
    /// Position in the tract pixel frame.
    pub pixel: Point2D,
}

/// Resolves sky coordinates against an injected, read-only sky map.
#[derive(Debug, Clone)]
pub struct CoordinateResolver {
    sky_map: Arc<SkyMap>,
}

impl CoordinateResolver {
    pub fn new(sky_map: Arc<SkyMap>) -> Self {
        Self { sky_map }
    }

    /// Resolver over the tiling a repository uses for `kind`.
    pub fn from_repository(repo: &dyn ImageRepository, kind: ImageKind) -> StampResult<Self> {
        Ok(Self::new(repo.sky_map(kind)?))
    }

    pub fn sky_map(&self) -> &SkyMap {
        &self.sky_map
    }

    /// Tile and pixel position of `coord`; `Lookup` when it falls outside
    /// every available tract.
    pub fn resolve(&self, coord: &SkyCoord) -> StampResult<Resolved> {
        let (tile, pixel) = self.sky_map.find_tile(coord)?;
        debug!(
            ra = coord.ra(),
            dec = coord.dec(),
            tile = %tile,
            x = pixel.x,
            y = pixel.y,
            "Resolved coordinate"
        );
        Ok(Resolved {
            coord: *coord,
            tile,
            pixel,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sky_common::{PatchIndex, StampError};
    use test_utils::single_tract_sky_map;

    fn resolver() -> CoordinateResolver {
        CoordinateResolver::new(Arc::new(single_tract_sky_map(150.0, 2.0)))
    }

    #[test]
    fn test_tract_centre_resolves() {
        let resolved = resolver().resolve(&SkyCoord::new(150.0, 2.0).unwrap()).unwrap();
        assert_eq!(resolved.tile.tract, 0);
        assert!((resolved.pixel.x - 199.5).abs() < 1e-6);
        assert!((resolved.pixel.y - 199.5).abs() < 1e-6);
        // 199.5 rounds up into the upper-right patch
        assert_eq!(resolved.tile.patch, PatchIndex::new(1, 1));
    }

    #[test]
    fn test_resolution_is_repeatable() {
        let resolver = resolver();
        let coord = SkyCoord::new(149.995, 1.99).unwrap();
        let a = resolver.resolve(&coord).unwrap();
        let b = resolver.resolve(&coord).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_outside_all_tracts_is_lookup_error() {
        let err = resolver().resolve(&SkyCoord::new(10.0, -40.0).unwrap()).unwrap_err();
        assert!(matches!(err, StampError::Lookup { .. }));
        assert_eq!(err.kind(), "LookupError");
    }
}
