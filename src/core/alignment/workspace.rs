//! Device-resident DP state.
//!
//! Holds the two physical DP column buffers and the carried running maximum
//! for every lane slot. Column layout is `[(lane * m + i) * unroll + slot]`
//! so the unrolled slots of one lane sit next to each other for each query
//! position. Step `k` reads column `k % 2` and writes column `(k + 1) % 2`.
//!
//! The workspace is owned by the device and reused from query to query;
//! `ensure` only reallocates when a query needs more room than any before it.

use crate::core::compute::LaneGeometry;

#[derive(Debug, Default)]
pub struct DeviceWorkspace {
    columns: [Vec<i32>; 2],
    running_max: Vec<i32>,
    geometry: Option<LaneGeometry>,
    query_len: usize,
}

impl DeviceWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size the buffers for `geometry` and a query of `query_len` residues,
    /// and zero them. Capacity is kept across calls.
    pub fn ensure(&mut self, geometry: LaneGeometry, query_len: usize) {
        let cells = geometry.slots() * query_len;
        for column in &mut self.columns {
            column.clear();
            column.resize(cells, 0);
        }
        self.running_max.clear();
        self.running_max.resize(geometry.slots(), 0);
        self.geometry = Some(geometry);
        self.query_len = query_len;
    }

    pub fn geometry(&self) -> Option<LaneGeometry> {
        self.geometry
    }

    pub fn query_len(&self) -> usize {
        self.query_len
    }

    /// Borrow the buffers for step parity `parity`:
    /// (column to read, column to write, carried running maxima).
    pub fn split_for_step(&mut self, parity: usize) -> (&[i32], &mut [i32], &mut [i32]) {
        let [c0, c1] = &mut self.columns;
        let (read, write) = if parity == 0 { (c0, c1) } else { (c1, c0) };
        (read.as_slice(), write.as_mut_slice(), self.running_max.as_mut_slice())
    }

    /// Physical column buffer `parity`; step `k` writes buffer `(k + 1) % 2`.
    pub fn column(&self, parity: usize) -> &[i32] {
        &self.columns[parity]
    }

    pub fn running_max(&self) -> &[i32] {
        &self.running_max
    }
}
