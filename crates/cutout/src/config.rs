//! Configuration for stamp extraction.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use sky_common::{Band, ImageKind, StampError, StampResult};

/// Default cutout side length in pixels.
pub const DEFAULT_SIDE: usize = 51;

/// Default PSF kernel size in pixels.
pub const DEFAULT_PSF_SIZE: usize = psf::DEFAULT_PSF_SIZE;

/// What to do when a cutout box leaves the stored image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgePolicy {
    /// Fail with `OutOfBounds`.
    #[default]
    Error,
    /// Read the overlap; fill the rest with NaN and `NO_DATA`.
    Pad,
}

impl EdgePolicy {
    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "error" => Some(Self::Error),
            "pad" => Some(Self::Pad),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Pad => "pad",
        }
    }
}

impl fmt::Display for EdgePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a batch does when one target fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchPolicy {
    /// Stop at the first failure and return it.
    #[default]
    Abort,
    /// Log a warning, record the failure and continue.
    Skip,
}

impl BatchPolicy {
    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "abort" => Some(Self::Abort),
            "skip" => Some(Self::Skip),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Abort => "abort",
            Self::Skip => "skip",
        }
    }
}

impl fmt::Display for BatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stamp extraction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StampConfig {
    /// Cutout side length in pixels.
    pub side: usize,

    /// Expected PSF kernel size. Must be at least `side`.
    pub psf_size: usize,

    /// Image kind to cut from. Only `coadd` is supported.
    pub kind: ImageKind,

    pub band: Band,

    pub edge_policy: EdgePolicy,

    pub batch_policy: BatchPolicy,

    /// Process targets on the rayon pool. Results keep input order.
    pub parallel: bool,
}

impl Default for StampConfig {
    fn default() -> Self {
        Self {
            side: DEFAULT_SIDE,
            psf_size: DEFAULT_PSF_SIZE,
            kind: ImageKind::Coadd,
            band: Band::R,
            edge_policy: EdgePolicy::Error,
            batch_policy: BatchPolicy::Abort,
            parallel: false,
        }
    }
}

impl StampConfig {
    /// Load configuration from environment variables.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `STAMP_*` environment overrides on top of `self`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("STAMP_SIDE") {
            match val.parse() {
                Ok(side) => self.side = side,
                Err(_) => warn!(value = %val, "Ignoring invalid STAMP_SIDE"),
            }
        }

        if let Ok(val) = std::env::var("STAMP_PSF_SIZE") {
            match val.parse() {
                Ok(size) => self.psf_size = size,
                Err(_) => warn!(value = %val, "Ignoring invalid STAMP_PSF_SIZE"),
            }
        }

        if let Ok(val) = std::env::var("STAMP_BAND") {
            match val.parse() {
                Ok(band) => self.band = band,
                Err(_) => warn!(value = %val, "Ignoring invalid STAMP_BAND"),
            }
        }

        // calexp parses here and is rejected per request with UnsupportedKind
        if let Ok(val) = std::env::var("STAMP_KIND") {
            match val.parse() {
                Ok(kind) => self.kind = kind,
                Err(_) => warn!(value = %val, "Ignoring invalid STAMP_KIND"),
            }
        }

        if let Ok(val) = std::env::var("STAMP_EDGE_POLICY") {
            match EdgePolicy::parse(&val) {
                Some(policy) => self.edge_policy = policy,
                None => warn!(value = %val, "Ignoring invalid STAMP_EDGE_POLICY"),
            }
        }

        if let Ok(val) = std::env::var("STAMP_BATCH_POLICY") {
            match BatchPolicy::parse(&val) {
                Some(policy) => self.batch_policy = policy,
                None => warn!(value = %val, "Ignoring invalid STAMP_BATCH_POLICY"),
            }
        }

        if let Ok(val) = std::env::var("STAMP_PARALLEL") {
            self.parallel = val.to_lowercase() == "true" || val == "1";
        }

        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> StampResult<()> {
        if self.side == 0 {
            return Err(StampError::invalid_parameter("side", "must be > 0"));
        }
        if self.psf_size == 0 {
            return Err(StampError::invalid_parameter("psf_size", "must be > 0"));
        }
        if self.psf_size < self.side {
            return Err(StampError::invalid_parameter(
                "psf_size",
                format!("PSF size {} is smaller than side {}", self.psf_size, self.side),
            ));
        }
        Ok(())
    }
}
