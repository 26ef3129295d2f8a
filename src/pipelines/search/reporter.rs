//! Hit reporter: consumes one completed step.
//!
//! For each slot, the pending entry covering the step is looked up in the
//! lane's ring. A residue step only updates the entry's first/last hit
//! offsets; the terminator step carries the finished score, which is turned
//! into a [`HitRecord`] when it reaches the threshold, after which the entry
//! leaves the ring. Slots with no covering entry were padding and are skipped.

use crate::core::compute::StepBuffers;
use crate::core::io::hit_output::HitRecord;

use super::lanes::LaneArena;

/// Per-step reporting summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Targets whose terminator step was consumed.
    pub finished: usize,
    /// Records emitted (subset of `finished`).
    pub emitted: usize,
}

pub struct HitReporter {
    query_id: usize,
    threshold: i32,
    records: Vec<HitRecord>,
    finished: usize,
}

impl HitReporter {
    pub fn new(query_id: usize, threshold: i32) -> Self {
        Self {
            query_id,
            threshold,
            records: Vec::new(),
            finished: 0,
        }
    }

    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    /// Targets fully reported so far, above threshold or not.
    pub fn finished(&self) -> usize {
        self.finished
    }

    pub fn records(&self) -> &[HitRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<HitRecord> {
        self.records
    }

    /// Consume the outputs of `buffers.step`.
    pub fn report_step(&mut self, arena: &mut LaneArena, buffers: &StepBuffers) -> StepReport {
        let geometry = arena.geometry();
        let step = buffers.step;
        let mut report = StepReport::default();

        for (lane, ring) in arena.rings.iter_mut().enumerate() {
            if ring.is_empty() {
                continue;
            }
            for slot in 0..geometry.unroll {
                let idx = geometry.index(lane, slot);
                let Some(entry) = ring.covering_mut(slot, step) else {
                    continue;
                };

                if entry.finish_step != Some(step) {
                    if buffers.column_max[idx] >= self.threshold {
                        entry.record_hit((step - entry.start_step) as usize);
                    }
                    continue;
                }

                if let Some(done) = ring.take_finished(slot, step) {
                    report.finished += 1;
                    let score = buffers.finished_max[idx];
                    if score < self.threshold {
                        continue;
                    }
                    let (first, last) = match (done.first_hit, done.last_hit) {
                        (Some(f), Some(l)) => (f, l),
                        // score >= threshold implies some column reached it.
                        _ => (0, 0),
                    };
                    self.records.push(HitRecord {
                        query_id: self.query_id,
                        target_id: done.target,
                        score,
                        first_hit_offset: first,
                        hit_span_length: last - first + 1,
                    });
                    report.emitted += 1;
                }
            }
        }

        self.finished += report.finished;
        if report.emitted > 0 {
            log::trace!(
                "query {} step {}: {} finished, {} reported",
                self.query_id,
                step,
                report.finished,
                report.emitted
            );
        }
        report
    }
}
