//! Scalar Smith-Waterman with a linear gap penalty.
//!
//! Straight full-matrix-free implementation used as the reference the lane
//! kernel is checked against, and by `--verify` to re-score emitted hits.

use crate::core::alignment::matrix::SubstitutionMatrix;

/// Result of a scalar local alignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalScore {
    /// Best local alignment score (0 if nothing scores positive).
    pub score: i32,
    /// For each target position `j`, the best score of an alignment ending at `j`.
    pub column_max: Vec<i32>,
}

impl LocalScore {
    /// First target offset whose column maximum reaches `threshold`, and the
    /// span up to the last such offset.
    pub fn hit_span(&self, threshold: i32) -> Option<(usize, usize)> {
        let first = self.column_max.iter().position(|&s| s >= threshold)?;
        let last = self.column_max.iter().rposition(|&s| s >= threshold)?;
        Some((first, last - first + 1))
    }
}

/// Encoded `query` against encoded `target`.
pub fn local_alignment(
    query: &[u8],
    target: &[u8],
    matrix: &SubstitutionMatrix,
    gap_penalty: i32,
) -> LocalScore {
    let m = query.len();
    let mut h = vec![0i32; m + 1];
    let mut column_max = Vec::with_capacity(target.len());
    let mut best = 0;

    for &t in target {
        let mut diag = 0; // H[i-1][j-1]
        let mut col_best = 0;
        for i in 1..=m {
            let left = h[i]; // H[i][j-1]
            let score = (diag + matrix.score(query[i - 1], t))
                .max(left - gap_penalty)
                .max(h[i - 1] - gap_penalty)
                .max(0);
            diag = left;
            h[i] = score;
            col_best = col_best.max(score);
        }
        best = best.max(col_best);
        column_max.push(col_best);
    }

    LocalScore {
        score: best,
        column_max,
    }
}
