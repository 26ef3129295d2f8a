// tests/unroll_boundary.rs
// A short target ending in one slot is immediately followed, in the same slot,
// by the next queued target. Its score must stay with itself, for a terminator
// on every slot position of the lane.

use std::collections::HashMap;

use ferrous_scan::core::alignment::matrix::SubstitutionMatrix;
use ferrous_scan::core::alignment::scalar::local_alignment;
use ferrous_scan::core::compute::ComputeBackend;
use ferrous_scan::core::io::database::SequenceDatabase;
use ferrous_scan::core::io::hit_output::HitRecord;
use ferrous_scan::pipelines::search::SearchOrchestrator;
use ferrous_scan::search_opt::SearchOpt;

const QUERY: &[u8] = b"WWWWWWWW";
const SHORT: &[u8] = b"AWA"; // scores 11
const NEXT: &[u8] = b"WWWWWW"; // scores 66
const FILLER: &[u8] = b"GGGGGGGGGGGGGGGGGGGG"; // scores 0

/// Database: query, then one lane's worth of targets with the short one at
/// `position`, then the high-scoring target that takes over its slot.
fn boundary_database(matrix: &SubstitutionMatrix, slots: usize, position: usize) -> SequenceDatabase {
    let a = matrix.alphabet();
    let mut seqs = vec![a.encode_seq(QUERY).unwrap()];
    for p in 0..slots {
        let s = if p == position { SHORT } else { FILLER };
        seqs.push(a.encode_seq(s).unwrap());
    }
    seqs.push(a.encode_seq(NEXT).unwrap());
    SequenceDatabase::from_encoded(seqs)
}

fn run(
    db: &SequenceDatabase,
    matrix: &SubstitutionMatrix,
    lanes: usize,
    unroll: usize,
    backend: ComputeBackend,
) -> Vec<HitRecord> {
    let opt = SearchOpt {
        lanes,
        unroll,
        threshold: 1,
        gap_penalty: 4,
        // Only the query row; its targets start at index 1.
        query_end: Some(1),
        start_offset: 1,
        progress_interval: 0,
        backend,
        ..SearchOpt::default()
    };
    let device = backend.create().unwrap();
    SearchOrchestrator::new(db, None, matrix, &opt, device)
        .collect()
        .unwrap()
}

#[test]
fn terminator_on_every_slot_position_keeps_scores_with_their_target() {
    let matrix = SubstitutionMatrix::blosum62();

    for backend in [ComputeBackend::Inline, ComputeBackend::Threaded] {
        for unroll in [1, 2, 4, 8, 16] {
            for lanes in [1, 3] {
                // Slot 0 of lane 0 first, so the short target lands on lane 0.
                for position in 0..unroll {
                    let db = boundary_database(&matrix, lanes * unroll, position);
                    let records = run(&db, &matrix, lanes, unroll, backend);
                    let by_target: HashMap<usize, i32> =
                        records.iter().map(|r| (r.target_id, r.score)).collect();

                    let short = 1 + position;
                    let next = db.len() - 1;
                    let ctx = format!("{:?} lanes={} U={} slot={}", backend, lanes, unroll, position);
                    assert_eq!(by_target.get(&short), Some(&11), "{}: short target", ctx);
                    assert_eq!(by_target.get(&next), Some(&66), "{}: next target", ctx);
                    assert_eq!(records.len(), 2, "{}: fillers must not report", ctx);
                }
            }
        }
    }
}

#[test]
fn back_to_back_short_targets_in_one_slot() {
    // One slot, every target shorter than the query: each terminator is
    // immediately followed by the first residue of the next target.
    let matrix = SubstitutionMatrix::blosum62();
    let a = matrix.alphabet();
    let targets: [&[u8]; 6] = [b"W", b"WW", b"A", b"WWW", b"C", b"WWWW"];
    let mut seqs = vec![a.encode_seq(QUERY).unwrap()];
    seqs.extend(targets.iter().map(|t| a.encode_seq(t).unwrap()));
    let db = SequenceDatabase::from_encoded(seqs);

    for backend in [ComputeBackend::Inline, ComputeBackend::Threaded] {
        let records = run(&db, &matrix, 1, 1, backend);
        let got: Vec<(usize, i32)> = records.iter().map(|r| (r.target_id, r.score)).collect();

        let expected: Vec<(usize, i32)> = (1..db.len())
            .map(|t| (t, local_alignment(db.sequence(0), db.sequence(t), &matrix, 4).score))
            .filter(|&(_, s)| s >= 1)
            .collect();
        assert_eq!(got, expected, "{:?}", backend);
        assert_eq!(got, vec![(1, 11), (2, 22), (4, 33), (6, 44)]);
    }
}
