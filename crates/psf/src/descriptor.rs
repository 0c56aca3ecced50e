//! Serializable PSF model descriptions.
//!
//! Repositories store one descriptor per tile and band (`psf.json`). Each
//! descriptor is itself a [`PsfModel`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use sky_common::{ImageF32, Point2D, StampError, StampResult};

use crate::model::{render_profile, PsfModel};

/// Default PSF image side, pixels.
pub const DEFAULT_PSF_SIZE: usize = 61;

fn default_size() -> usize {
    DEFAULT_PSF_SIZE
}

/// Analytic PSF model description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PsfDescriptor {
    /// Circular Gaussian of width `sigma` pixels.
    Gaussian {
        sigma: f64,
        #[serde(default = "default_size")]
        size: usize,
    },
    /// Core Gaussian plus a wider wing Gaussian with relative peak `ratio`.
    DoubleGaussian {
        sigma1: f64,
        sigma2: f64,
        ratio: f64,
        #[serde(default = "default_size")]
        size: usize,
    },
    /// Gaussian whose width varies linearly across the tile.
    VaryingGaussian {
        sigma0: f64,
        gradient_x: f64,
        gradient_y: f64,
        reference_x: f64,
        reference_y: f64,
        #[serde(default = "default_size")]
        size: usize,
    },
}

impl PsfDescriptor {
    /// Gaussian PSF with the default image size.
    pub fn gaussian(sigma: f64) -> Self {
        PsfDescriptor::Gaussian {
            sigma,
            size: DEFAULT_PSF_SIZE,
        }
    }

    /// Same model producing `size`×`size` images.
    pub fn with_size(mut self, new_size: usize) -> Self {
        match &mut self {
            PsfDescriptor::Gaussian { size, .. }
            | PsfDescriptor::DoubleGaussian { size, .. }
            | PsfDescriptor::VaryingGaussian { size, .. } => *size = new_size,
        }
        self
    }

    pub fn size(&self) -> usize {
        match self {
            PsfDescriptor::Gaussian { size, .. }
            | PsfDescriptor::DoubleGaussian { size, .. }
            | PsfDescriptor::VaryingGaussian { size, .. } => *size,
        }
    }

    /// Check the parameters without evaluating the model.
    pub fn validate(&self) -> StampResult<()> {
        if self.size() == 0 {
            return Err(StampError::invalid_parameter("size", "must be > 0"));
        }
        match self {
            PsfDescriptor::Gaussian { sigma, .. } => check_width("sigma", *sigma),
            PsfDescriptor::DoubleGaussian {
                sigma1,
                sigma2,
                ratio,
                ..
            } => {
                check_width("sigma1", *sigma1)?;
                check_width("sigma2", *sigma2)?;
                if !ratio.is_finite() || *ratio < 0.0 {
                    return Err(StampError::invalid_parameter("ratio", format!("{} must be >= 0", ratio)));
                }
                Ok(())
            }
            PsfDescriptor::VaryingGaussian {
                sigma0,
                gradient_x,
                gradient_y,
                reference_x,
                reference_y,
                ..
            } => {
                check_width("sigma0", *sigma0)?;
                if ![gradient_x, gradient_y, reference_x, reference_y]
                    .iter()
                    .all(|v| v.is_finite())
                {
                    return Err(StampError::invalid_parameter("gradient", "must be finite"));
                }
                Ok(())
            }
        }
    }

    /// Parse a descriptor from JSON.
    pub fn from_json(json: &str) -> StampResult<Self> {
        let descriptor: PsfDescriptor = serde_json::from_str(json)?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    pub fn to_json(&self) -> StampResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn check_width(name: &str, sigma: f64) -> StampResult<()> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(StampError::invalid_parameter(name, format!("{} must be positive", sigma)));
    }
    Ok(())
}

fn gaussian(dx: f64, dy: f64, sigma: f64) -> f64 {
    (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp()
}

impl PsfModel for PsfDescriptor {
    fn compute_image(&self, position: Point2D) -> StampResult<ImageF32> {
        self.validate()?;
        let size = self.size();
        debug!(x = position.x, y = position.y, size, "Computing PSF image");

        match *self {
            PsfDescriptor::Gaussian { sigma, .. } => {
                render_profile(position, size, size, |dx, dy| gaussian(dx, dy, sigma))
            }
            PsfDescriptor::DoubleGaussian {
                sigma1,
                sigma2,
                ratio,
                ..
            } => render_profile(position, size, size, |dx, dy| {
                gaussian(dx, dy, sigma1) + ratio * gaussian(dx, dy, sigma2)
            }),
            PsfDescriptor::VaryingGaussian {
                sigma0,
                gradient_x,
                gradient_y,
                reference_x,
                reference_y,
                ..
            } => {
                let sigma = sigma0
                    + gradient_x * (position.x - reference_x)
                    + gradient_y * (position.y - reference_y);
                check_width("sigma", sigma)?;
                render_profile(position, size, size, |dx, dy| gaussian(dx, dy, sigma))
            }
        }
    }

    fn kernel_dims(&self) -> (usize, usize) {
        (self.size(), self.size())
    }
}
