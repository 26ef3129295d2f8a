//! Lane feeder: writes one step's residue per slot.
//!
//! For every slot, in lane-major order:
//! - feeding a target with residues left: emit the next residue;
//! - feeding a target with none left: emit the terminator and mark its
//!   pending entry finished at this step;
//! - free: take the next target from the queue (if the lane's ring has room)
//!   and emit its first residue, otherwise emit the terminator as padding.
//!
//! A step that emits neither residues nor terminators means every target has
//! been fully fed: the search for this query is over.

use crate::core::io::database::SequenceDatabase;
use crate::error::PipelineError;

use super::lanes::{LaneArena, PendingEntry, SequenceQueue, SlotCursor};

/// What one feed pass put into the residue buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedOutcome {
    /// Slots that received a real residue.
    pub residues: usize,
    /// Slots that received the terminator of their target.
    pub terminators: usize,
    /// Free slots with nothing left to take.
    pub idle: usize,
    /// Free slots that could not take a target because their ring was full.
    pub stalled: usize,
    /// Targets assigned during this pass.
    pub assigned: usize,
}

impl FeedOutcome {
    /// Whether this step carries any work for the device.
    pub fn has_work(&self) -> bool {
        self.residues + self.terminators > 0
    }

    /// Slots padded with the terminator without belonging to any target.
    pub fn wasted(&self) -> usize {
        self.idle + self.stalled
    }
}

pub struct LaneFeeder<'db> {
    db: &'db SequenceDatabase,
    queue: SequenceQueue,
    terminator: u8,
}

impl<'db> LaneFeeder<'db> {
    pub fn new(db: &'db SequenceDatabase, queue: SequenceQueue, terminator: u8) -> Self {
        Self {
            db,
            queue,
            terminator,
        }
    }

    pub fn queue(&self) -> &SequenceQueue {
        &self.queue
    }

    /// Fill `residues` (one entry per slot) for `step`.
    pub fn feed(
        &mut self,
        arena: &mut LaneArena,
        step: u64,
        residues: &mut [u8],
    ) -> Result<FeedOutcome, PipelineError> {
        let geometry = arena.geometry();
        debug_assert_eq!(residues.len(), geometry.slots());

        let mut outcome = FeedOutcome::default();
        let LaneArena { cursors, rings, .. } = arena;

        for (lane, ring) in rings.iter_mut().enumerate() {
            for slot in 0..geometry.unroll {
                let idx = geometry.index(lane, slot);
                let cursor = &mut cursors[idx];

                if let Some(target) = cursor.target {
                    let seq = self.db.sequence(target);
                    if cursor.offset < seq.len() {
                        residues[idx] = seq[cursor.offset];
                        cursor.offset += 1;
                        outcome.residues += 1;
                    } else {
                        residues[idx] = self.terminator;
                        if let Some(entry) = ring.feeding_mut(slot) {
                            entry.finish_step = Some(step);
                        }
                        cursor.target = None;
                        outcome.terminators += 1;
                    }
                    continue;
                }

                residues[idx] = self.terminator;
                if self.queue.is_exhausted() {
                    outcome.idle += 1;
                    continue;
                }
                if ring.is_full() {
                    outcome.stalled += 1;
                    continue;
                }
                match self.queue.pop(self.db) {
                    Some(target) => {
                        ring.push(PendingEntry::new(target, slot, step))
                            .map_err(|_| PipelineError::RingOverflow { lane })?;
                        residues[idx] = self.db.sequence(target)[0];
                        *cursor = SlotCursor {
                            target: Some(target),
                            offset: 1,
                        };
                        outcome.assigned += 1;
                        outcome.residues += 1;
                    }
                    None => outcome.idle += 1,
                }
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::compute::LaneGeometry;
    use crate::pipelines::search::lanes::ComparisonPolicy;

    const TERM: u8 = 20;

    fn feeder_for(db: &SequenceDatabase) -> LaneFeeder<'_> {
        let queue = SequenceQueue::new(db, None, ComparisonPolicy::AllPairs, 0, None);
        LaneFeeder::new(db, queue, TERM)
    }

    #[test]
    fn streams_residues_then_terminator_then_next_target() {
        let db = SequenceDatabase::from_encoded([vec![1u8, 2], vec![3u8]]);
        let mut arena = LaneArena::new(LaneGeometry::new(1, 1));
        let mut feeder = feeder_for(&db);
        let mut buf = [0u8; 1];

        let mut fed = Vec::new();
        let mut step = 0;
        loop {
            let out = feeder.feed(&mut arena, step, &mut buf).unwrap();
            if !out.has_work() {
                break;
            }
            fed.push(buf[0]);
            step += 1;
        }
        assert_eq!(fed, vec![1, 2, TERM, 3, TERM]);

        let ring = &arena.rings[0];
        let finishes: Vec<_> = ring.iter().map(|e| (e.target, e.start_step, e.finish_step)).collect();
        assert_eq!(finishes, vec![(0, 0, Some(2)), (1, 3, Some(4))]);
    }

    #[test]
    fn full_ring_stalls_a_free_slot() {
        // Two slots, ring capacity 3. Both targets end at step 1, the third
        // target can be taken by one slot at step 2 only while the other
        // finished entries still await their report.
        let db = SequenceDatabase::from_encoded([vec![1u8], vec![2u8], vec![3u8], vec![4u8]]);
        let mut arena = LaneArena::new(LaneGeometry::new(1, 2));
        let mut feeder = feeder_for(&db);
        let mut buf = [0u8; 2];

        let out = feeder.feed(&mut arena, 0, &mut buf).unwrap();
        assert_eq!((out.assigned, out.residues), (2, 2));
        let out = feeder.feed(&mut arena, 1, &mut buf).unwrap();
        assert_eq!(out.terminators, 2);
        let out = feeder.feed(&mut arena, 2, &mut buf).unwrap();
        assert_eq!((out.assigned, out.stalled), (1, 1));
        assert_eq!(buf, [3, TERM]);
        assert_eq!(arena.rings[0].len(), 3);
    }

    #[test]
    fn drained_queue_pads_with_terminators() {
        let db = SequenceDatabase::from_encoded([vec![5u8]]);
        let mut arena = LaneArena::new(LaneGeometry::new(2, 2));
        let mut feeder = feeder_for(&db);
        let mut buf = [0u8; 4];
        let out = feeder.feed(&mut arena, 0, &mut buf).unwrap();
        assert_eq!(out, FeedOutcome { residues: 1, terminators: 0, idle: 3, stalled: 0, assigned: 1 });
        assert_eq!(buf, [5, TERM, TERM, TERM]);
        assert_eq!(out.wasted(), 3);
    }
}
