//! YAML run files for stamp batches.
//!
//! ```yaml
//! repository: repo
//! output_dir: stamps
//! formats: [fits, png]
//! stamp:
//!   side: 51
//!   band: r
//!   batch_policy: skip
//! display:
//!   zoom: 4
//!   stretch: { type: asinh, softening: 0.1 }
//! targets:
//!   - { name: sn-1, ra: 61.86, dec: -35.79 }
//! ```
//!
//! Relative paths are taken from the run file's directory. `STAMP_*`
//! environment variables override the `stamp` section.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use cutout::{DisplayOptions, StampConfig, Target};
use renderer::OutputFormat;

fn default_output_dir() -> PathBuf {
    PathBuf::from("stamps")
}

fn default_formats() -> Vec<OutputFormat> {
    vec![OutputFormat::Fits, OutputFormat::Png]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFile {
    /// Root of an on-disk repository.
    pub repository: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_formats")]
    pub formats: Vec<OutputFormat>,
    #[serde(default)]
    pub stamp: StampConfig,
    #[serde(default)]
    pub display: DisplayOptions,
    pub targets: Vec<Target>,
}

impl RunFile {
    /// Load a run file, resolve its paths and apply environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read run file {:?}", path))?;
        let mut run = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse run file {:?}", path))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        run.repository = base.join(&run.repository);
        run.output_dir = base.join(&run.output_dir);
        run.stamp = run.stamp.with_env_overrides();
        run.validate()?;
        Ok(run)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.targets.is_empty(), "Run file lists no targets");
        anyhow::ensure!(!self.formats.is_empty(), "Run file lists no output formats");
        self.stamp.validate().context("Invalid stamp settings")?;
        Ok(())
    }
}
