//! Bounded cutout reads against the repository.

use std::sync::Arc;

use tracing::{debug, instrument};

use sky_common::{Band, ImageKind, PixelBox, Point2D, StampError, StampResult, TileIndex};
use storage::{DataId, Exposure, ImageRepository};

use crate::config::EdgePolicy;

/// One square cutout request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutoutRequest {
    pub tile: TileIndex,
    /// Centre in the tract pixel frame.
    pub center: Point2D,
    pub side: usize,
    pub kind: ImageKind,
    pub band: Band,
}

impl CutoutRequest {
    /// `[c - side/2, c - side/2 + side)` around the nearest pixel `c`.
    pub fn bbox(&self) -> PixelBox {
        PixelBox::centered(self.center, self.side)
    }

    pub fn data_id(&self) -> DataId {
        DataId {
            tile: self.tile,
            band: self.band,
            kind: self.kind,
        }
    }
}

/// Reads cutouts from an injected repository. Every call is a fresh read.
#[derive(Clone)]
pub struct CutoutFetcher {
    repo: Arc<dyn ImageRepository>,
    edge_policy: EdgePolicy,
}

impl std::fmt::Debug for CutoutFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CutoutFetcher")
            .field("edge_policy", &self.edge_policy)
            .finish_non_exhaustive()
    }
}

impl CutoutFetcher {
    pub fn new(repo: Arc<dyn ImageRepository>, edge_policy: EdgePolicy) -> Self {
        Self { repo, edge_policy }
    }

    pub fn edge_policy(&self) -> EdgePolicy {
        self.edge_policy
    }

    /// Fetch the cutout described by `request`.
    ///
    /// Unsupported kinds fail before the repository is touched.
    #[instrument(skip_all, fields(tile = %request.tile, band = %request.band, side = request.side))]
    pub fn fetch(&self, request: &CutoutRequest) -> StampResult<Exposure> {
        if request.kind != ImageKind::Coadd {
            return Err(StampError::UnsupportedKind(request.kind.to_string()));
        }
        if request.side == 0 {
            return Err(StampError::invalid_parameter("side", "must be > 0"));
        }
        if !request.center.is_finite() {
            return Err(StampError::invalid_parameter("center", "pixel position is not finite"));
        }

        let id = request.data_id();
        let bbox = request.bbox();
        let exposure = match self.edge_policy {
            EdgePolicy::Error => self.repo.read(&id, &bbox)?,
            EdgePolicy::Pad => self.fetch_padded(&id, &bbox)?,
        };
        debug!(bbox = %bbox, "Fetched cutout");
        Ok(exposure)
    }

    fn fetch_padded(&self, id: &DataId, bbox: &PixelBox) -> StampResult<Exposure> {
        let available = self.repo.image_bbox(id)?;
        if available.contains_box(bbox) {
            return self.repo.read(id, bbox);
        }
        let overlap = available.intersection(bbox).ok_or_else(|| StampError::OutOfBounds {
            requested: bbox.to_string(),
            available: available.to_string(),
        })?;

        let part = self.repo.read(id, &overlap)?;
        let mut padded = Exposure::blank(*id, *bbox, *part.wcs()).with_psf(part.psf().cloned());
        padded.paste(&part);
        debug!(overlap = %overlap, "Padded cutout at tile edge");
        Ok(padded)
    }
}
