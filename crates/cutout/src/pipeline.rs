//! Per-target stamp processing and batch driving.

use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use sky_common::{ImageF32, ImageKind, MaskPlane, Point2D, StampError, StampResult};
use storage::{Exposure, ImageRepository};

use crate::config::{BatchPolicy, StampConfig};
use crate::fetcher::{CutoutFetcher, CutoutRequest};
use crate::footprint::{find_footprints, Footprint};
use crate::psf_eval::PsfEvaluator;
use crate::residual::{composite, Residual};
use crate::resolver::{CoordinateResolver, Resolved};
use crate::target::Target;

/// Everything produced for one target.
#[derive(Debug, Clone)]
pub struct StampProducts {
    pub target: Target,
    pub resolved: Resolved,
    pub cutout: Exposure,
    /// Full PSF image at the target.
    pub psf: ImageF32,
    pub residual: Residual,
    /// Footprints of the `DETECTED` plane inside the cutout.
    pub footprints: Vec<Footprint>,
}

impl StampProducts {
    /// Target position relative to the cutout's first pixel.
    pub fn target_in_cutout(&self) -> Point2D {
        let (x0, y0) = self.cutout.image().xy0();
        Point2D::new(self.resolved.pixel.x - x0 as f64, self.resolved.pixel.y - y0 as f64)
    }

    /// Footprint covering the target's pixel, if any.
    pub fn target_footprint(&self) -> Option<&Footprint> {
        let (x, y) = self.resolved.pixel.nearest_pixel();
        self.footprints.iter().find(|f| f.contains(x, y))
    }
}

/// A target that failed in a `Skip` batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    pub index: usize,
    pub name: String,
    /// Error taxonomy name, e.g. `NotFound`.
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    /// Targets processed and accepted by the sink.
    pub processed: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Resolve, fetch, evaluate and composite, one target at a time.
#[derive(Debug, Clone)]
pub struct StampPipeline {
    config: StampConfig,
    resolver: CoordinateResolver,
    fetcher: CutoutFetcher,
    evaluator: PsfEvaluator,
}

impl StampPipeline {
    /// Build a pipeline over `repo`.
    ///
    /// An unsupported image kind fails here, before the repository is
    /// consulted.
    pub fn new(repo: Arc<dyn ImageRepository>, config: StampConfig) -> StampResult<Self> {
        config.validate()?;
        if config.kind != ImageKind::Coadd {
            return Err(StampError::UnsupportedKind(config.kind.to_string()));
        }
        let resolver = CoordinateResolver::from_repository(repo.as_ref(), config.kind)?;
        let fetcher = CutoutFetcher::new(repo, config.edge_policy);
        Ok(Self {
            evaluator: PsfEvaluator::expecting(config.psf_size),
            config,
            resolver,
            fetcher,
        })
    }

    pub fn config(&self) -> &StampConfig {
        &self.config
    }

    pub fn resolver(&self) -> &CoordinateResolver {
        &self.resolver
    }

    /// Run one target to completion.
    pub fn process(&self, target: &Target) -> StampResult<StampProducts> {
        let coord = target.coord()?;
        let resolved = self.resolver.resolve(&coord)?;

        let request = CutoutRequest {
            tile: resolved.tile,
            center: resolved.pixel,
            side: self.config.side,
            kind: self.config.kind,
            band: self.config.band,
        };
        let cutout = self.fetcher.fetch(&request)?;
        let psf = self.evaluator.evaluate(&cutout, &coord)?;
        let residual = composite(cutout.image(), &psf)?;
        let footprints = find_footprints(cutout.image(), cutout.mask(), MaskPlane::Detected)?;

        info!(
            target = %target.name,
            tile = %resolved.tile,
            band = %self.config.band,
            scale = residual.scale,
            footprints = footprints.len(),
            "Processed target"
        );

        Ok(StampProducts {
            target: target.clone(),
            resolved,
            cutout,
            psf,
            residual,
            footprints,
        })
    }

    /// Process `targets` and hand each result to `sink`, in input order.
    ///
    /// With `BatchPolicy::Abort` the first failure (of processing or of the
    /// sink) is returned. With `BatchPolicy::Skip` failures are logged and
    /// collected in the report. Parallel batches compute on the rayon pool
    /// and still call the sink sequentially in input order.
    pub fn run<F>(&self, targets: &[Target], mut sink: F) -> StampResult<BatchReport>
    where
        F: FnMut(&StampProducts) -> StampResult<()>,
    {
        let mut report = BatchReport::default();

        if self.config.parallel {
            let results: Vec<StampResult<StampProducts>> =
                targets.par_iter().map(|target| self.process(target)).collect();
            for (index, (target, result)) in targets.iter().zip(results).enumerate() {
                let outcome = result.and_then(|products| sink(&products));
                self.record(&mut report, index, target, outcome)?;
            }
        } else {
            for (index, target) in targets.iter().enumerate() {
                let outcome = self.process(target).and_then(|products| sink(&products));
                self.record(&mut report, index, target, outcome)?;
            }
        }

        info!(
            processed = report.processed,
            failed = report.failures.len(),
            "Batch complete"
        );
        Ok(report)
    }

    fn record(
        &self,
        report: &mut BatchReport,
        index: usize,
        target: &Target,
        outcome: StampResult<()>,
    ) -> StampResult<()> {
        match outcome {
            Ok(()) => {
                report.processed += 1;
                Ok(())
            }
            Err(err) => match self.config.batch_policy {
                BatchPolicy::Abort => Err(err),
                BatchPolicy::Skip => {
                    warn!(
                        target = %target.name,
                        index,
                        kind = err.kind(),
                        error = %err,
                        "Skipping target"
                    );
                    report.failures.push(BatchFailure {
                        index,
                        name: target.name.clone(),
                        kind: err.kind(),
                        message: err.to_string(),
                    });
                    Ok(())
                }
            },
        }
    }
}
