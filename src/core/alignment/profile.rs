//! Query profile: the per-query substitution lookup table.
//!
//! The kernel never indexes the matrix by two residues. For a fixed query it
//! only needs `score(query[i], r)` for the database residue `r` it is
//! consuming, so the table is laid out as one contiguous row per residue code:
//! `profile[r * m + i]`. Row `alphabet_size` belongs to the terminator.

use crate::core::alignment::matrix::SubstitutionMatrix;

/// Out-of-band penalty stored in the terminator row. Far enough below any
/// real cell that it can never win a `max`, and far enough above `i32::MIN`
/// that adding a cell score cannot overflow.
pub const TERMINATOR_PENALTY: i32 = i32::MIN / 4;

/// Immutable per-query state shared by the host and the device.
#[derive(Debug, Clone)]
pub struct QueryContext {
    id: usize,
    name: String,
    residues: Vec<u8>,
    profile: Vec<i32>,
    alphabet_size: usize,
    gap_penalty: i32,
}

impl QueryContext {
    /// Build the lookup table for an encoded query.
    pub fn build(
        id: usize,
        name: &str,
        residues: &[u8],
        matrix: &SubstitutionMatrix,
        gap_penalty: i32,
    ) -> Self {
        let m = residues.len();
        let n = matrix.size();
        let mut profile = Vec::with_capacity((n + 1) * m);

        for r in 0..n as u8 {
            profile.extend(residues.iter().map(|&q| matrix.score(q, r)));
        }
        profile.extend(std::iter::repeat(TERMINATOR_PENALTY).take(m));

        Self {
            id,
            name: name.to_string(),
            residues: residues.to_vec(),
            profile,
            alphabet_size: n,
            gap_penalty,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn residues(&self) -> &[u8] {
        &self.residues
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    pub fn gap_penalty(&self) -> i32 {
        self.gap_penalty
    }

    pub fn terminator(&self) -> u8 {
        self.alphabet_size as u8
    }

    /// Scores of every query position against database residue `residue`.
    #[inline]
    pub fn profile_row(&self, residue: u8) -> &[i32] {
        let m = self.residues.len();
        let start = residue as usize * m;
        &self.profile[start..start + m]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_follow_query_positions() {
        let matrix = SubstitutionMatrix::uniform(b"ACGT", 2, -1).unwrap();
        let a = matrix.alphabet();
        let q = a.encode_seq(b"GATTC").unwrap();
        let ctx = QueryContext::build(0, "q", &q, &matrix, 1);

        let t = a.encode(b'T').unwrap();
        assert_eq!(ctx.profile_row(t), &[-1, -1, 2, 2, -1]);
        assert_eq!(ctx.terminator(), 4);
        assert!(ctx
            .profile_row(ctx.terminator())
            .iter()
            .all(|&s| s == TERMINATOR_PENALTY));
    }

    #[test]
    fn table_size_is_alphabet_plus_terminator_by_query_len() {
        let matrix = SubstitutionMatrix::blosum62();
        let q = matrix.alphabet().encode_seq(b"MKVLA").unwrap();
        let ctx = QueryContext::build(3, "q3", &q, &matrix, 4);
        assert_eq!(ctx.profile.len(), (matrix.size() + 1) * 5);
        assert_eq!(ctx.id(), 3);
    }
}
