// src/defaults.rs

// Lane geometry
pub const NUM_LANES: usize = 4096;
pub const UNROLL: usize = 4;

// Scoring Constants
pub const GAP_PENALTY: i32 = 4;
pub const MIN_SCORE: i32 = 40;
pub const MATRIX: &str = "BLOSUM62";

// Other Constants
pub const VERBOSITY: i32 = 3;
pub const PROGRESS_INTERVAL: u64 = 50_000;
pub const ESTIMATE_SAMPLE_QUERIES: usize = 8;
