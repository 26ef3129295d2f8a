// tests/reference_equivalence.rs
// Lane-batched scores must equal a plain scalar Smith-Waterman for every pair,
// for every supported unroll factor and both compute devices.

use bio::alignment::pairwise::Aligner;
use bio::scores::blosum62;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ferrous_scan::core::alignment::matrix::SubstitutionMatrix;
use ferrous_scan::core::alignment::scalar::local_alignment;
use ferrous_scan::core::compute::ComputeBackend;
use ferrous_scan::core::io::database::SequenceDatabase;
use ferrous_scan::pipelines::search::{ComparisonPolicy, SearchOrchestrator};
use ferrous_scan::search_opt::SearchOpt;

const STANDARD_RESIDUES: u8 = 20;

fn random_database(seed: u64, count: usize, min_len: usize, max_len: usize) -> SequenceDatabase {
    let mut rng = StdRng::seed_from_u64(seed);
    SequenceDatabase::from_encoded((0..count).map(|_| {
        let len = rng.gen_range(min_len..=max_len);
        (0..len)
            .map(|_| rng.gen_range(0..STANDARD_RESIDUES))
            .collect::<Vec<u8>>()
    }))
}

fn search_opt(lanes: usize, unroll: usize, backend: ComputeBackend) -> SearchOpt {
    SearchOpt {
        lanes,
        unroll,
        threshold: 1,
        gap_penalty: 4,
        policy: ComparisonPolicy::AllPairs,
        query_end: Some(4),
        progress_interval: 0,
        backend,
        ..SearchOpt::default()
    }
}

#[test]
fn every_pair_matches_scalar_reference() {
    let matrix = SubstitutionMatrix::blosum62();
    let db = random_database(7, 40, 5, 50);

    for backend in [ComputeBackend::Inline, ComputeBackend::Threaded] {
        for (lanes, unroll) in [(1, 1), (3, 2), (4, 4), (2, 8), (1, 16)] {
            let opt = search_opt(lanes, unroll, backend);
            let device = backend.create().unwrap();
            let mut orch = SearchOrchestrator::new(&db, None, &matrix, &opt, device);
            let records = orch.collect().unwrap();

            let mut expected = Vec::new();
            for q in 0..4 {
                for t in 0..db.len() {
                    let r = local_alignment(db.sequence(q), db.sequence(t), &matrix, 4);
                    if r.score >= 1 {
                        expected.push((q, t, r));
                    }
                }
            }

            assert_eq!(
                records.len(),
                expected.len(),
                "{:?} {}x{}: record count",
                backend,
                lanes,
                unroll
            );
            let mut records = records;
            records.sort_by_key(|r| (r.query_id, r.target_id));
            for (rec, (q, t, reference)) in records.iter().zip(&expected) {
                assert_eq!((rec.query_id, rec.target_id), (*q, *t));
                assert_eq!(
                    rec.score, reference.score,
                    "{:?} {}x{}: query {} target {}",
                    backend, lanes, unroll, q, t
                );
                let (first, span) = reference.hit_span(1).unwrap();
                assert_eq!((rec.first_hit_offset, rec.hit_span_length), (first, span));
            }
        }
    }
}

#[test]
fn known_blosum62_self_score() {
    let matrix = SubstitutionMatrix::blosum62();
    let a = matrix.alphabet();
    let seq = a.encode_seq(b"ACDEFGHIKLMNPQRSTVWY").unwrap();
    let db = SequenceDatabase::from_encoded([seq, a.encode_seq(b"GGGG").unwrap()]);

    let opt = SearchOpt {
        threshold: 100,
        query_end: Some(1),
        ..search_opt(2, 2, ComputeBackend::Inline)
    };
    let device = opt.backend.create().unwrap();
    let mut orch = SearchOrchestrator::new(&db, None, &matrix, &opt, device);
    let records = orch.collect().unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].target_id, 0);
    assert_eq!(records[0].score, 116);
    // The column maximum first reaches 100 at W (offset 18), last at Y.
    assert_eq!(records[0].first_hit_offset, 18);
    assert_eq!(records[0].hit_span_length, 2);
}

#[test]
fn scalar_reference_agrees_with_bio_aligner() {
    let matrix = SubstitutionMatrix::blosum62();
    let alphabet = matrix.alphabet();
    let gap = 4;
    let mut rng = StdRng::seed_from_u64(2024);

    for _ in 0..50 {
        let q: Vec<u8> = (0..rng.gen_range(5..=50))
            .map(|_| alphabet.symbol(rng.gen_range(0..STANDARD_RESIDUES)))
            .collect();
        let t: Vec<u8> = (0..rng.gen_range(5..=50))
            .map(|_| alphabet.symbol(rng.gen_range(0..STANDARD_RESIDUES)))
            .collect();

        let mut aligner = Aligner::with_capacity(q.len(), t.len(), 0, -gap, &blosum62);
        let expected = aligner.local(&q, &t).score;
        let got = local_alignment(
            &alphabet.encode_seq(&q).unwrap(),
            &alphabet.encode_seq(&t).unwrap(),
            &matrix,
            gap,
        )
        .score;
        assert_eq!(
            got,
            expected,
            "{} vs {}",
            String::from_utf8_lossy(&q),
            String::from_utf8_lossy(&t)
        );
    }
}
