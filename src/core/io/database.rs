//! Encoded sequence database in Structure-of-Arrays form.
//!
//! All residues live in one contiguous buffer; `offsets[i]..offsets[i + 1]`
//! delimits sequence `i`. Residues are alphabet codes; the terminator is not
//! stored and is emitted by the lane feeder after the last residue.

/// Ordered collection of (name, description, encoded sequence).
#[derive(Debug, Clone, Default)]
pub struct SequenceDatabase {
    names: Vec<String>,
    descriptions: Vec<String>,
    offsets: Vec<usize>,
    residues: Vec<u8>,
}

impl SequenceDatabase {
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            descriptions: Vec::new(),
            offsets: vec![0],
            residues: Vec::new(),
        }
    }

    /// Build from already-encoded sequences; names are their indices.
    pub fn from_encoded<I, S>(seqs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let mut db = Self::new();
        for (i, s) in seqs.into_iter().enumerate() {
            db.push(&i.to_string(), "", s.as_ref());
        }
        db
    }

    pub fn push(&mut self, name: &str, description: &str, encoded: &[u8]) {
        if self.offsets.is_empty() {
            self.offsets.push(0);
        }
        self.names.push(name.to_string());
        self.descriptions.push(description.to_string());
        self.residues.extend_from_slice(encoded);
        self.offsets.push(self.residues.len());
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[inline]
    pub fn sequence(&self, index: usize) -> &[u8] {
        &self.residues[self.offsets[index]..self.offsets[index + 1]]
    }

    #[inline]
    pub fn seq_len(&self, index: usize) -> usize {
        self.offsets[index + 1] - self.offsets[index]
    }

    pub fn name(&self, index: usize) -> &str {
        &self.names[index]
    }

    pub fn description(&self, index: usize) -> &str {
        &self.descriptions[index]
    }

    pub fn total_residues(&self) -> u64 {
        self.residues.len() as u64
    }

    /// Residues of sequences `start..end` (clamped to the database).
    pub fn residues_between(&self, start: usize, end: usize) -> u64 {
        let end = end.min(self.len());
        if start >= end {
            return 0;
        }
        (self.offsets[end] - self.offsets[start]) as u64
    }

    pub fn max_len(&self) -> usize {
        (0..self.len()).map(|i| self.seq_len(i)).max().unwrap_or(0)
    }
}
