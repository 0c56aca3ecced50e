//! In-process repository.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use projection::SkyMap;
use sky_common::{Band, ImageKind, PixelBox, StampError, StampResult, TileIndex};

use crate::exposure::{DataId, Exposure};
use crate::repository::ImageRepository;

/// Repository holding whole coadd tiles in memory.
#[derive(Debug)]
pub struct MemoryRepository {
    sky_map: Arc<SkyMap>,
    tiles: RwLock<HashMap<(TileIndex, Band), Exposure>>,
}

impl MemoryRepository {
    pub fn new(sky_map: SkyMap) -> Self {
        Self {
            sky_map: Arc::new(sky_map),
            tiles: RwLock::new(HashMap::new()),
        }
    }

    /// Store a tile, replacing any previous image for the same tile and band.
    pub fn insert(&self, exposure: Exposure) -> StampResult<()> {
        let id = exposure.data_id();
        if id.kind != ImageKind::Coadd {
            return Err(StampError::UnsupportedKind(id.kind.to_string()));
        }
        let mut tiles = self
            .tiles
            .write()
            .map_err(|_| StampError::Io("repository lock poisoned".into()))?;
        tiles.insert((id.tile, id.band), exposure);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tiles.read().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_tile<T>(&self, id: &DataId, f: impl FnOnce(&Exposure) -> StampResult<T>) -> StampResult<T> {
        if id.kind != ImageKind::Coadd {
            return Err(StampError::UnsupportedKind(id.kind.to_string()));
        }
        let tiles = self
            .tiles
            .read()
            .map_err(|_| StampError::Io("repository lock poisoned".into()))?;
        let exposure = tiles
            .get(&(id.tile, id.band))
            .ok_or_else(|| StampError::NotFound(id.to_string()))?;
        f(exposure)
    }
}

impl ImageRepository for MemoryRepository {
    fn sky_map(&self, kind: ImageKind) -> StampResult<Arc<SkyMap>> {
        match kind {
            ImageKind::Coadd => Ok(self.sky_map.clone()),
            other => Err(StampError::UnsupportedKind(other.to_string())),
        }
    }

    fn image_bbox(&self, id: &DataId) -> StampResult<PixelBox> {
        self.with_tile(id, |exposure| Ok(exposure.bbox()))
    }

    fn read(&self, id: &DataId, bbox: &PixelBox) -> StampResult<Exposure> {
        debug!(data_id = %id, bbox = %bbox, "Reading from memory repository");
        self.with_tile(id, |exposure| exposure.subset(bbox))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use projection::{LayoutConfig, SkyMapConfig, TractSpec};
    use sky_common::{ImageF32, Mask, PatchIndex};

    fn repo() -> MemoryRepository {
        let config = SkyMapConfig {
            layout: LayoutConfig::Explicit {
                tracts: vec![TractSpec {
                    id: 1,
                    ra: 30.0,
                    dec: 0.0,
                    num_patches_x: 1,
                    num_patches_y: 1,
                }],
            },
            pixel_scale_arcsec: 1.0,
            patch_inner_dim: 100,
            patch_border: 0,
            ..SkyMapConfig::default()
        };
        let sky_map = SkyMap::from_config(config).unwrap();
        let tract = sky_map.tract(1).unwrap().clone();
        let repo = MemoryRepository::new(sky_map);
        let bbox = tract.bbox;
        let id = DataId::coadd(TileIndex::new(1, PatchIndex::new(0, 0)), Band::R);
        let exposure = Exposure::new(
            id,
            ImageF32::filled(bbox, 1.0),
            Mask::clear(bbox),
            ImageF32::filled(bbox, 1.0),
            tract.wcs,
        )
        .unwrap();
        repo.insert(exposure).unwrap();
        repo
    }

    #[test]
    fn test_read_and_errors() {
        let repo = repo();
        let tile = TileIndex::new(1, PatchIndex::new(0, 0));

        let exp = repo
            .read(&DataId::coadd(tile, Band::R), &PixelBox::new(10, 10, 5, 5))
            .unwrap();
        assert_eq!(exp.bbox(), PixelBox::new(10, 10, 5, 5));

        let missing = repo.read(&DataId::coadd(tile, Band::G), &PixelBox::new(0, 0, 1, 1));
        assert!(matches!(missing, Err(StampError::NotFound(_))));

        let outside = repo.read(&DataId::coadd(tile, Band::R), &PixelBox::new(98, 0, 5, 5));
        assert!(matches!(outside, Err(StampError::OutOfBounds { .. })));
    }

    #[test]
    fn test_calexp_unsupported() {
        let repo = repo();
        assert!(matches!(repo.sky_map(ImageKind::Calexp), Err(StampError::UnsupportedKind(_))));
        let id = DataId {
            kind: ImageKind::Calexp,
            ..DataId::coadd(TileIndex::new(1, PatchIndex::new(0, 0)), Band::R)
        };
        assert!(matches!(repo.image_bbox(&id), Err(StampError::UnsupportedKind(_))));
    }
}
