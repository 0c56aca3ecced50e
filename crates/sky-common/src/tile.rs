//! Tract/patch identifiers for the tiled sky.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::StampError;

/// A patch within a tract, addressed by its column and row in the patch grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatchIndex {
    pub x: u32,
    pub y: u32,
}

impl PatchIndex {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for PatchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for PatchIndex {
    type Err = StampError;

    /// Parse the "x,y" form used in repository paths.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| StampError::invalid_parameter("patch", format!("expected 'x,y', got '{}'", s)))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|_| StampError::invalid_parameter("patch", format!("invalid index '{}'", v)))
        };
        Ok(Self::new(parse(x)?, parse(y)?))
    }
}

/// Tract and patch containing a sky coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileIndex {
    pub tract: u32,
    pub patch: PatchIndex,
}

impl TileIndex {
    pub fn new(tract: u32, patch: PatchIndex) -> Self {
        Self { tract, patch }
    }

    /// Relative storage path fragment: `<tract>/<x>,<y>`.
    pub fn path_fragment(&self) -> String {
        format!("{}/{}", self.tract, self.patch)
    }
}

impl std::fmt::Display for TileIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.tract, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_parse_roundtrip() {
        let p: PatchIndex = "3,4".parse().unwrap();
        assert_eq!(p, PatchIndex::new(3, 4));
        assert_eq!(p.to_string(), "3,4");
        assert!("3;4".parse::<PatchIndex>().is_err());
        assert!("a,4".parse::<PatchIndex>().is_err());
    }

    #[test]
    fn test_tile_display() {
        let t = TileIndex::new(4850, PatchIndex::new(2, 5));
        assert_eq!(t.to_string(), "4850:2,5");
        assert_eq!(t.path_fragment(), "4850/2,5");
    }
}
