//! Named sky positions to extract stamps for.

use serde::{Deserialize, Serialize};

use sky_common::{SkyCoord, StampResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    /// Degrees.
    pub ra: f64,
    /// Degrees.
    pub dec: f64,
}

impl Target {
    pub fn new(name: impl Into<String>, ra: f64, dec: f64) -> Self {
        Self {
            name: name.into(),
            ra,
            dec,
        }
    }

    pub fn coord(&self) -> StampResult<SkyCoord> {
        SkyCoord::new(self.ra, self.dec)
    }

    /// Name reduced to `[A-Za-z0-9._-]`, usable as a file name prefix.
    pub fn file_stem(&self) -> String {
        let stem: String = self
            .name
            .trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if stem.is_empty() || stem.chars().all(|c| c == '.') {
            "target".to_string()
        } else {
            stem
        }
    }
}
