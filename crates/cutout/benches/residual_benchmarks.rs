//! Benchmarks for PSF evaluation and residual compositing.
//!
//! Run with: cargo bench --package cutout --bench residual_benchmarks

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use cutout::residual::composite;
use cutout::{StampConfig, StampPipeline, Target};
use projection::SkyMap;
use psf::{PsfDescriptor, PsfModel};
use sky_common::{PixelBox, Point2D};
use storage::{MemoryRepository, SyntheticSky};
use test_utils::{gaussian_star_image, single_tract_config, sky};

// =============================================================================
// RESIDUAL BENCHMARKS
// =============================================================================

fn bench_composite(c: &mut Criterion) {
    let mut group = c.benchmark_group("composite");

    for side in [25usize, 51, 101] {
        let psf_size = side + 10;
        let bbox = PixelBox::new(1000, 2000, side, side);
        let center = Point2D::new(1000.0 + (side / 2) as f64, 2000.0 + (side / 2) as f64);
        let cutout = gaussian_star_image(bbox, center, 2.0, 5_000.0, 100.0);
        let psf = PsfDescriptor::gaussian(2.0)
            .with_size(psf_size)
            .compute_image(center)
            .unwrap();

        group.throughput(Throughput::Elements((side * side) as u64));
        group.bench_with_input(BenchmarkId::new("side", side), &side, |b, _| {
            b.iter(|| black_box(composite(black_box(&cutout), black_box(&psf)).unwrap()));
        });
    }

    group.finish();
}

// =============================================================================
// PSF EVALUATION BENCHMARKS
// =============================================================================

fn bench_psf_image(c: &mut Criterion) {
    let mut group = c.benchmark_group("psf_compute_image");

    for size in [31usize, 61, 121] {
        let model = PsfDescriptor::gaussian(2.5).with_size(size);
        group.throughput(Throughput::Elements((size * size) as u64));
        group.bench_with_input(BenchmarkId::new("size", size), &size, |b, _| {
            b.iter(|| black_box(model.compute_image(black_box(Point2D::new(812.37, 455.81))).unwrap()));
        });
    }

    group.finish();
}

// =============================================================================
// END-TO-END BENCHMARKS
// =============================================================================

fn bench_process_target(c: &mut Criterion) {
    let (ra, dec) = sky::DC2_CENTER;
    let sky_map = SkyMap::from_config(single_tract_config(ra, dec, 2, 200, 20)).unwrap();
    let coord = sky_map
        .tract(0)
        .unwrap()
        .wcs
        .pixel_to_sky(Point2D::new(300.2, 310.9))
        .unwrap();
    let repo = MemoryRepository::new(sky_map);
    SyntheticSky::default().populate_memory(&repo).unwrap();
    let pipeline = StampPipeline::new(Arc::new(repo), StampConfig::default()).unwrap();
    let target = Target::new("bench", coord.ra(), coord.dec());

    c.bench_function("process_target", |b| {
        b.iter(|| black_box(pipeline.process(black_box(&target)).unwrap()));
    });
}

criterion_group!(benches, bench_composite, bench_psf_image, bench_process_target);
criterion_main!(benches);
