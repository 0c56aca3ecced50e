//! Mapping pixel values onto [0, 1] for display.

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};

/// Default lower percentile of the automatic display range.
pub const DEFAULT_LOW_PERCENTILE: f32 = 0.5;
/// Default upper percentile of the automatic display range.
pub const DEFAULT_HIGH_PERCENTILE: f32 = 99.5;

/// Value interval mapped onto the colormap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayRange {
    pub vmin: f32,
    pub vmax: f32,
}

impl DisplayRange {
    pub fn new(vmin: f32, vmax: f32) -> RenderResult<Self> {
        if !vmin.is_finite() || !vmax.is_finite() || vmax < vmin {
            return Err(RenderError::InvalidRange(format!("[{}, {}]", vmin, vmax)));
        }
        Ok(Self { vmin, vmax })
    }

    /// Range spanning the `low` and `high` percentiles of the finite values.
    ///
    /// Percentiles use the nearest rank on the sorted values. Returns `None`
    /// when there is no finite value at all.
    pub fn from_percentiles(data: &[f32], low: f32, high: f32) -> Option<Self> {
        let mut finite: Vec<f32> = data.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return None;
        }
        finite.sort_by(f32::total_cmp);

        let rank = |p: f32| {
            let p = p.clamp(0.0, 100.0) / 100.0;
            ((finite.len() - 1) as f32 * p).round() as usize
        };
        let (lo, hi) = if low <= high { (low, high) } else { (high, low) };
        Some(Self {
            vmin: finite[rank(lo)],
            vmax: finite[rank(hi)],
        })
    }

    /// Symmetric range `[-m, m]` where `m` is the larger magnitude of the
    /// ends of `self`.
    pub fn symmetric(&self) -> Self {
        let m = self.vmin.abs().max(self.vmax.abs());
        Self { vmin: -m, vmax: m }
    }

    /// Position of `value` in the range, clamped to [0, 1]. `None` for
    /// non-finite values.
    pub fn normalize(&self, value: f32) -> Option<f32> {
        if !value.is_finite() {
            return None;
        }
        let span = self.vmax - self.vmin;
        let span = if span.abs() < f32::EPSILON { 1.0 } else { span };
        Some(((value - self.vmin) / span).clamp(0.0, 1.0))
    }
}

/// Transfer function applied after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Stretch {
    #[default]
    Linear,
    /// `asinh(t / softening) / asinh(1 / softening)`; smaller softening
    /// brings out faint structure.
    Asinh { softening: f32 },
}

impl Stretch {
    pub fn asinh() -> Self {
        Stretch::Asinh { softening: 0.1 }
    }

    pub fn validate(&self) -> RenderResult<()> {
        match self {
            Stretch::Asinh { softening } if !(softening.is_finite() && *softening > 0.0) => {
                Err(RenderError::InvalidRange(format!("asinh softening {}", softening)))
            }
            _ => Ok(()),
        }
    }

    /// Apply to a normalized value in [0, 1].
    pub fn apply(&self, t: f32) -> f32 {
        match *self {
            Stretch::Linear => t,
            Stretch::Asinh { softening } => ((t / softening).asinh() / (1.0 / softening).asinh()).clamp(0.0, 1.0),
        }
    }

    /// Parse `linear`, `asinh` or `asinh:<softening>`.
    pub fn parse(s: &str) -> RenderResult<Self> {
        let lower = s.to_ascii_lowercase();
        let stretch = match lower.split_once(':') {
            None if lower == "linear" => Stretch::Linear,
            None if lower == "asinh" => Stretch::asinh(),
            Some(("asinh", soft)) => Stretch::Asinh {
                softening: soft.parse().map_err(|_| RenderError::UnknownName {
                    kind: "stretch",
                    value: s.to_string(),
                })?,
            },
            _ => {
                return Err(RenderError::UnknownName {
                    kind: "stretch",
                    value: s.to_string(),
                })
            }
        };
        stretch.validate()?;
        Ok(stretch)
    }
}
