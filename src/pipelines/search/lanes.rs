//! Lane arena: host-side bookkeeping for every lane slot.
//!
//! Struct-of-arrays sized by the runtime lane geometry:
//! - one [`SlotCursor`] per slot (which target it is feeding, and where),
//! - one [`PendingRing`] per lane holding every target whose residues went
//!   to the device and whose result has not been consumed yet.
//!
//! The ring exists because of the device lag: a target whose terminator is
//! fed at step `k` is only reported once step `k` comes back, by which time
//! the same slot may already be feeding the next target.

use std::collections::VecDeque;

use crate::core::compute::LaneGeometry;
use crate::core::io::database::SequenceDatabase;

/// Which (query, target) pairs are submitted to the device at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ComparisonPolicy {
    /// Every target in range.
    #[default]
    AllPairs,
    /// Only targets with index >= the query's own index. Excluded pairs are
    /// never fed to a lane, so they cost no device time.
    Triangular,
}

/// Where a slot is in its current target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotCursor {
    pub target: Option<usize>,
    /// Next residue to feed.
    pub offset: usize,
}

/// A target in flight on one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingEntry {
    pub target: usize,
    pub slot: usize,
    /// Step that fed residue 0.
    pub start_step: u64,
    /// Step that fed the terminator, once it has been fed.
    pub finish_step: Option<u64>,
    pub first_hit: Option<usize>,
    pub last_hit: Option<usize>,
}

impl PendingEntry {
    pub fn new(target: usize, slot: usize, start_step: u64) -> Self {
        Self {
            target,
            slot,
            start_step,
            finish_step: None,
            first_hit: None,
            last_hit: None,
        }
    }

    /// Whether `slot` was working on this target during `step`.
    #[inline]
    pub fn covers(&self, slot: usize, step: u64) -> bool {
        self.slot == slot
            && self.start_step <= step
            && self.finish_step.map_or(true, |f| step <= f)
    }

    pub fn record_hit(&mut self, offset: usize) {
        self.first_hit.get_or_insert(offset);
        self.last_hit = Some(offset);
    }
}

/// Fixed-capacity queue of pending targets for one lane.
#[derive(Debug, Clone)]
pub struct PendingRing {
    entries: VecDeque<PendingEntry>,
    capacity: usize,
}

impl PendingRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append an entry; hands it back if the ring is full.
    pub fn push(&mut self, entry: PendingEntry) -> Result<(), PendingEntry> {
        if self.is_full() {
            return Err(entry);
        }
        self.entries.push_back(entry);
        Ok(())
    }

    /// The entry `slot` is currently feeding (no terminator yet).
    pub fn feeding_mut(&mut self, slot: usize) -> Option<&mut PendingEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.slot == slot && e.finish_step.is_none())
    }

    /// The entry `slot` was working on during `step`.
    pub fn covering_mut(&mut self, slot: usize, step: u64) -> Option<&mut PendingEntry> {
        self.entries.iter_mut().find(|e| e.covers(slot, step))
    }

    /// Remove and return the entry whose terminator was fed on `slot` at `step`.
    pub fn take_finished(&mut self, slot: usize, step: u64) -> Option<PendingEntry> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.slot == slot && e.finish_step == Some(step))?;
        self.entries.remove(pos)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingEntry> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Per-slot cursors and per-lane pending rings.
#[derive(Debug, Clone)]
pub struct LaneArena {
    geometry: LaneGeometry,
    pub cursors: Vec<SlotCursor>,
    pub rings: Vec<PendingRing>,
}

impl LaneArena {
    /// Rings hold `unroll + 1` entries: one per slot plus one finished target
    /// awaiting its report.
    pub fn new(geometry: LaneGeometry) -> Self {
        Self {
            geometry,
            cursors: vec![SlotCursor::default(); geometry.slots()],
            rings: vec![PendingRing::new(geometry.unroll + 1); geometry.lanes],
        }
    }

    pub fn geometry(&self) -> LaneGeometry {
        self.geometry
    }

    pub fn reset(&mut self) {
        self.cursors.fill(SlotCursor::default());
        self.rings.iter_mut().for_each(PendingRing::clear);
    }

    /// True when no slot is feeding and nothing awaits a report.
    pub fn is_drained(&self) -> bool {
        self.cursors.iter().all(|c| c.target.is_none()) && self.rings.iter().all(|r| r.is_empty())
    }

    pub fn pending(&self) -> usize {
        self.rings.iter().map(PendingRing::len).sum()
    }
}

/// Source of targets for one query, in database order.
#[derive(Debug, Clone)]
pub struct SequenceQueue {
    next: usize,
    end: usize,
    skipped_empty: usize,
}

impl SequenceQueue {
    /// Targets `[start, end)` of `db`, where `start` is raised to the query's
    /// own index under [`ComparisonPolicy::Triangular`].
    pub fn new(
        db: &SequenceDatabase,
        query_index: Option<usize>,
        policy: ComparisonPolicy,
        start_offset: usize,
        end_offset: Option<usize>,
    ) -> Self {
        let end = end_offset.unwrap_or(db.len()).min(db.len());
        let start = match (policy, query_index) {
            (ComparisonPolicy::Triangular, Some(q)) => start_offset.max(q),
            _ => start_offset,
        };
        Self {
            next: start.min(end),
            end,
            skipped_empty: 0,
        }
    }

    /// Next non-empty target, or `None` once the range is exhausted.
    pub fn pop(&mut self, db: &SequenceDatabase) -> Option<usize> {
        while self.next < self.end {
            let t = self.next;
            self.next += 1;
            if db.seq_len(t) > 0 {
                return Some(t);
            }
            self.skipped_empty += 1;
        }
        None
    }

    pub fn is_exhausted(&self) -> bool {
        self.next >= self.end
    }

    /// First target index not yet handed out.
    pub fn position(&self) -> usize {
        self.next
    }

    pub fn range_end(&self) -> usize {
        self.end
    }

    pub fn skipped_empty(&self) -> usize {
        self.skipped_empty
    }
}
