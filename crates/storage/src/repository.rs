//! The storage capability consumed by the stamp pipeline.

use std::sync::Arc;

use projection::SkyMap;
use sky_common::{ImageKind, PixelBox, StampResult};

use crate::exposure::{DataId, Exposure};

/// Read-only access to a repository of tiled images.
///
/// Implementations serialize their own internal access and are shared
/// between threads behind an `Arc`. Every call is a single attempt; nothing
/// is cached between calls.
pub trait ImageRepository: Send + Sync {
    /// Tiling scheme of the images of `kind`.
    fn sky_map(&self, kind: ImageKind) -> StampResult<Arc<SkyMap>>;

    /// Bounding box of the stored image, in the tract frame.
    fn image_bbox(&self, id: &DataId) -> StampResult<PixelBox>;

    /// Bounded read. `bbox` must lie inside the stored image, otherwise the
    /// read fails with `OutOfBounds`.
    fn read(&self, id: &DataId, bbox: &PixelBox) -> StampResult<Exposure>;
}
