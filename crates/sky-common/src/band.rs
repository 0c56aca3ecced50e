//! Photometric bands and image kinds.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::StampError;

/// LSST photometric filter band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    U,
    G,
    R,
    I,
    Z,
    Y,
}

impl Band {
    pub const ALL: [Band; 6] = [Band::U, Band::G, Band::R, Band::I, Band::Z, Band::Y];

    pub fn as_str(&self) -> &'static str {
        match self {
            Band::U => "u",
            Band::G => "g",
            Band::R => "r",
            Band::I => "i",
            Band::Z => "z",
            Band::Y => "y",
        }
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Band {
    type Err = StampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "u" => Ok(Band::U),
            "g" => Ok(Band::G),
            "r" => Ok(Band::R),
            "i" => Ok(Band::I),
            "z" => Ok(Band::Z),
            "y" => Ok(Band::Y),
            other => Err(StampError::invalid_parameter("band", format!("unknown band '{}'", other))),
        }
    }
}

/// Kind of stored image product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    /// Deep coadd on the tract/patch grid.
    Coadd,
    /// Single calibrated exposure (not supported by the stamp pipeline).
    Calexp,
}

impl ImageKind {
    /// Repository dataset name for this kind.
    pub fn dataset_name(&self) -> &'static str {
        match self {
            ImageKind::Coadd => "deepCoadd",
            ImageKind::Calexp => "calexp",
        }
    }
}

impl std::fmt::Display for ImageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageKind::Coadd => f.write_str("coadd"),
            ImageKind::Calexp => f.write_str("calexp"),
        }
    }
}

impl FromStr for ImageKind {
    type Err = StampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "coadd" | "deepcoadd" => Ok(ImageKind::Coadd),
            "calexp" => Ok(ImageKind::Calexp),
            other => Err(StampError::UnsupportedKind(other.to_string())),
        }
    }
}
