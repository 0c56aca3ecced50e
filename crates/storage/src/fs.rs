//! On-disk repository of FITS coadd tiles.
//!
//! Layout under the repository root:
//!
//! ```text
//! repo.json                                   manifest (name, sky map)
//! deepCoadd/<band>/<tract>/<px>,<py>/coadd.fits  IMAGE, MASK, VARIANCE
//! deepCoadd/<band>/<tract>/<px>,<py>/psf.json    PSF descriptor
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use fits_io::{write_tan_wcs, FitsError, FitsReader, FitsWriter, Header};
use projection::{SkyMap, SkyMapConfig};
use psf::{PsfDescriptor, PsfModel};
use sky_common::{Band, ImageKind, PixelBox, StampError, StampResult};

use crate::exposure::{DataId, Exposure};
use crate::repository::ImageRepository;

const MANIFEST: &str = "repo.json";
const IMAGE_FILE: &str = "coadd.fits";
const PSF_FILE: &str = "psf.json";

/// Contents of `repo.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoManifest {
    pub name: String,
    pub created: DateTime<Utc>,
    pub sky_map: SkyMapConfig,
    /// Bands the repository was populated with.
    #[serde(default)]
    pub bands: Vec<Band>,
}

impl RepoManifest {
    pub fn new(name: &str, sky_map: SkyMapConfig) -> Self {
        Self {
            name: name.to_string(),
            created: Utc::now(),
            sky_map,
            bands: Vec::new(),
        }
    }
}

/// Repository rooted at a directory.
#[derive(Debug)]
pub struct FsRepository {
    root: PathBuf,
    manifest: RepoManifest,
    sky_map: Arc<SkyMap>,
}

impl FsRepository {
    /// Create a repository, writing its manifest.
    pub fn create(root: impl Into<PathBuf>, manifest: RepoManifest) -> StampResult<Self> {
        let root = root.into();
        let sky_map = SkyMap::from_config(manifest.sky_map.clone())?;
        fs::create_dir_all(&root)?;
        fs::write(root.join(MANIFEST), serde_json::to_string_pretty(&manifest)?)?;
        info!(root = %root.display(), name = %manifest.name, "Created repository");
        Ok(Self {
            root,
            manifest,
            sky_map: Arc::new(sky_map),
        })
    }

    /// Open an existing repository.
    pub fn open(root: impl Into<PathBuf>) -> StampResult<Self> {
        let root = root.into();
        let manifest_path = root.join(MANIFEST);
        let text = fs::read_to_string(&manifest_path).map_err(|e| {
            StampError::Io(format!("cannot read {}: {}", manifest_path.display(), e))
        })?;
        let manifest: RepoManifest = serde_json::from_str(&text)?;
        let sky_map = SkyMap::from_config(manifest.sky_map.clone())?;
        debug!(root = %root.display(), tracts = sky_map.len(), "Opened repository");
        Ok(Self {
            root,
            manifest,
            sky_map: Arc::new(sky_map),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest(&self) -> &RepoManifest {
        &self.manifest
    }

    /// Directory holding one tile's files.
    pub fn tile_dir(&self, id: &DataId) -> PathBuf {
        self.root
            .join(id.kind.dataset_name())
            .join(id.band.as_str())
            .join(id.tile.tract.to_string())
            .join(id.tile.patch.to_string())
    }

    /// Store a tile and, optionally, its PSF descriptor.
    #[instrument(skip_all, fields(data_id = %exposure.data_id()))]
    pub fn write(&self, exposure: &Exposure, psf: Option<&PsfDescriptor>) -> StampResult<PathBuf> {
        let id = exposure.data_id();
        if id.kind != ImageKind::Coadd {
            return Err(StampError::UnsupportedKind(id.kind.to_string()));
        }
        let dir = self.tile_dir(&id);
        fs::create_dir_all(&dir)?;

        let mut header = Header::new();
        write_tan_wcs(&mut header, exposure.wcs(), exposure.image().xy0());

        let path = dir.join(IMAGE_FILE);
        let mut writer = FitsWriter::create(&path)?;
        writer.write_image("IMAGE", exposure.image(), &header)?;
        writer.write_mask("MASK", exposure.mask(), &header)?;
        writer.write_image("VARIANCE", exposure.variance(), &header)?;
        drop(writer);

        let psf_path = dir.join(PSF_FILE);
        match psf {
            Some(descriptor) => fs::write(&psf_path, descriptor.to_json()?)?,
            None if psf_path.exists() => fs::remove_file(&psf_path)?,
            None => {}
        }

        debug!(path = %path.display(), bbox = %exposure.bbox(), "Wrote tile");
        Ok(path)
    }

    fn open_tile(&self, id: &DataId) -> StampResult<FitsReader> {
        if id.kind != ImageKind::Coadd {
            return Err(StampError::UnsupportedKind(id.kind.to_string()));
        }
        let path = self.tile_dir(id).join(IMAGE_FILE);
        if !path.exists() {
            return Err(StampError::NotFound(id.to_string()));
        }
        Ok(FitsReader::open(&path)?)
    }

    fn tile_psf(&self, id: &DataId) -> StampResult<Option<Arc<dyn PsfModel>>> {
        let path = self.tile_dir(id).join(PSF_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let model: Arc<dyn PsfModel> = Arc::new(PsfDescriptor::from_json(&fs::read_to_string(&path)?)?);
        Ok(Some(model))
    }
}

impl ImageRepository for FsRepository {
    fn sky_map(&self, kind: ImageKind) -> StampResult<Arc<SkyMap>> {
        match kind {
            ImageKind::Coadd => Ok(self.sky_map.clone()),
            other => Err(StampError::UnsupportedKind(other.to_string())),
        }
    }

    #[instrument(skip_all, fields(data_id = %id))]
    fn image_bbox(&self, id: &DataId) -> StampResult<PixelBox> {
        let mut reader = self.open_tile(id)?;
        Ok(reader.extension("IMAGE")?.bbox())
    }

    #[instrument(skip_all, fields(data_id = %id, bbox = %bbox))]
    fn read(&self, id: &DataId, bbox: &PixelBox) -> StampResult<Exposure> {
        let mut reader = self.open_tile(id)?;
        let image_ext = reader.extension("IMAGE")?;

        let available = image_ext.bbox();
        if !available.contains_box(bbox) {
            return Err(StampError::OutOfBounds {
                requested: bbox.to_string(),
                available: available.to_string(),
            });
        }

        // only the rows under `bbox` are decoded from each plane
        let image = reader.read_image(&image_ext, bbox)?;
        let wcs = reader
            .read_tan_wcs(&image_ext)?
            .ok_or_else(|| FitsError::MissingKeyword("CTYPE1".to_string()))?;
        let mask_ext = reader.extension("MASK")?;
        let mask = reader.read_mask(&mask_ext, bbox)?;
        let variance_ext = reader.extension("VARIANCE")?;
        let variance = reader.read_image(&variance_ext, bbox)?;
        drop(reader);

        debug!(available = %available, "Read tile");
        Ok(Exposure::new(*id, image, mask, variance, wcs)?.with_psf(self.tile_psf(id)?))
    }
}
