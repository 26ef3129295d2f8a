use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

use ferrous_scan::core::alignment::kernel::execute_step;
use ferrous_scan::core::alignment::matrix::SubstitutionMatrix;
use ferrous_scan::core::alignment::profile::QueryContext;
use ferrous_scan::core::alignment::scalar::local_alignment;
use ferrous_scan::core::alignment::workspace::DeviceWorkspace;
use ferrous_scan::core::compute::{ComputeBackend, LaneGeometry, StepBuffers};
use ferrous_scan::core::io::database::SequenceDatabase;
use ferrous_scan::pipelines::search::QuerySearch;
use ferrous_scan::search_opt::SearchOpt;

fn random_protein(len: usize, rng: &mut StdRng) -> Vec<u8> {
    (0..len).map(|_| rng.gen_range(0..20u8)).collect()
}

/// One kernel step over a fixed number of slots, split into lanes x unroll
/// in different ways. Throughput is cell updates per step.
fn bench_unroll_factors(c: &mut Criterion) {
    let matrix = SubstitutionMatrix::blosum62();
    let mut rng = StdRng::seed_from_u64(42);
    let query = random_protein(256, &mut rng);
    let ctx = QueryContext::build(0, "bench", &query, &matrix, 4);

    let slots = 1024usize;
    let mut group = c.benchmark_group("kernel_step");
    group.throughput(Throughput::Elements((slots * query.len()) as u64));

    for unroll in [1usize, 2, 4, 8, 16] {
        let geometry = LaneGeometry::new(slots / unroll, unroll);
        let mut ws = DeviceWorkspace::new();
        ws.ensure(geometry, ctx.len());
        let mut buffers = StepBuffers::new(0, geometry);
        buffers.residues = random_protein(slots, &mut rng);

        group.bench_with_input(BenchmarkId::new("unroll", unroll), &unroll, |b, _| {
            b.iter(|| {
                buffers.step = buffers.step.wrapping_add(1);
                execute_step(black_box(&ctx), &mut ws, &mut buffers).unwrap();
            })
        });
    }
    group.finish();
}

/// Whole-query passes: the scalar reference against the lane pipeline on
/// both devices, over the same small database.
fn bench_query_pass(c: &mut Criterion) {
    let matrix = SubstitutionMatrix::blosum62();
    let mut rng = StdRng::seed_from_u64(7);
    let query = random_protein(200, &mut rng);
    let targets: Vec<Vec<u8>> = (0..256)
        .map(|_| {
            let len = rng.gen_range(50..400);
            random_protein(len, &mut rng)
        })
        .collect();
    let db = SequenceDatabase::from_encoded(targets.iter().cloned());
    let ctx = Arc::new(QueryContext::build(0, "bench", &query, &matrix, 4));

    let mut group = c.benchmark_group("query_pass");
    group.throughput(Throughput::Elements(db.total_residues() * query.len() as u64));
    group.sample_size(10);

    group.bench_function("scalar", |b| {
        b.iter(|| {
            targets
                .iter()
                .map(|t| local_alignment(black_box(&query), t, &matrix, 4).score)
                .max()
        })
    });

    for backend in [ComputeBackend::Inline, ComputeBackend::Threaded] {
        let opt = SearchOpt {
            lanes: 32,
            unroll: 4,
            progress_interval: 0,
            backend,
            ..SearchOpt::default()
        };
        let mut device = backend.create().unwrap();
        let mut search = QuerySearch::new(LaneGeometry::new(opt.lanes, opt.unroll));
        group.bench_function(BenchmarkId::new("lanes", format!("{:?}", backend)), |b| {
            b.iter(|| {
                search
                    .run(device.as_mut(), Arc::clone(&ctx), None, &db, &opt, &mut |_, _| {})
                    .unwrap()
                    .records
                    .len()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_unroll_factors, bench_query_pass);
criterion_main!(benches);
