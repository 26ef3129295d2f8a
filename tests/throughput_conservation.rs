// tests/throughput_conservation.rs
// Every emitted cell update (steps x lanes x unroll x query length) is either
// useful work on a database residue, a terminator update, or an explicitly
// tallied idle update; useful work equals residues compared x query length.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ferrous_scan::core::alignment::matrix::SubstitutionMatrix;
use ferrous_scan::core::alignment::profile::QueryContext;
use ferrous_scan::core::compute::{ComputeBackend, LaneGeometry};
use ferrous_scan::core::io::database::SequenceDatabase;
use ferrous_scan::pipelines::search::{ComparisonPolicy, QuerySearch, SearchOrchestrator};
use ferrous_scan::search_opt::SearchOpt;
use std::sync::Arc;

fn mixed_length_database(seed: u64) -> SequenceDatabase {
    // Lengths spanning two orders of magnitude, with a few empty entries.
    let mut rng = StdRng::seed_from_u64(seed);
    SequenceDatabase::from_encoded((0..50).map(|i| {
        let len = match i % 7 {
            0 => 0,
            1 => rng.gen_range(200..=400),
            _ => rng.gen_range(3..=30),
        };
        (0..len).map(|_| rng.gen_range(0..20u8)).collect::<Vec<u8>>()
    }))
}

#[test]
fn single_query_accounts_for_every_update() {
    let matrix = SubstitutionMatrix::blosum62();
    let db = mixed_length_database(3);
    let query: Vec<u8> = (0..37u8).map(|i| i % 20).collect();
    let ctx = Arc::new(QueryContext::build(0, "q", &query, &matrix, 4));

    for (lanes, unroll) in [(1, 1), (4, 2), (3, 4), (2, 16)] {
        let opt = SearchOpt {
            lanes,
            unroll,
            progress_interval: 0,
            ..SearchOpt::default()
        };
        let mut device = ComputeBackend::Inline.create().unwrap();
        let mut search = QuerySearch::new(LaneGeometry::new(lanes, unroll));
        let out = search
            .run(device.as_mut(), Arc::clone(&ctx), None, &db, &opt, &mut |_, _| {})
            .unwrap();

        let m = query.len() as u64;
        let cells = out.cells;
        assert_eq!(cells.emitted, cells.steps * (lanes * unroll) as u64 * m);
        assert!(cells.is_conserved(), "{}x{}: {:?}", lanes, unroll, cells);
        assert_eq!(cells.residue, db.total_residues() * m);

        let non_empty = (0..db.len()).filter(|&i| db.seq_len(i) > 0).count();
        assert_eq!(cells.terminator, non_empty as u64 * m);
        assert_eq!(out.targets, non_empty);
        assert_eq!(out.skipped_empty, db.len() - non_empty);
    }
}

#[test]
fn run_totals_match_database_implied_work() {
    let matrix = SubstitutionMatrix::blosum62();
    let db = mixed_length_database(17);

    for policy in [ComparisonPolicy::AllPairs, ComparisonPolicy::Triangular] {
        let opt = SearchOpt {
            lanes: 3,
            unroll: 4,
            policy,
            start_offset: 5,
            end_offset: Some(45),
            query_end: Some(8),
            progress_interval: 0,
            backend: ComputeBackend::Threaded,
            ..SearchOpt::default()
        };
        let device = opt.backend.create().unwrap();
        let mut orch = SearchOrchestrator::new(&db, None, &matrix, &opt, device);
        orch.collect().unwrap();

        let stats = orch.statistics();
        let expected: u64 = (0..8)
            .map(|q| {
                let start = match policy {
                    ComparisonPolicy::AllPairs => 5,
                    ComparisonPolicy::Triangular => q.max(5),
                };
                db.seq_len(q) as u64 * db.residues_between(start, 45)
            })
            .sum();
        assert_eq!(stats.cells.residue, expected, "{:?}", policy);
        assert!(stats.cells.is_conserved());
        assert!(stats.cells.idle > 0, "mixed lengths must leave some lanes idle");
    }
}
