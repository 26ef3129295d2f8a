//! Lane-batched database search.
//!
//! Control flow per step:
//!
//! ```text
//! LaneFeeder ──residues──▶ DoubleBuffer::submit ──▶ ComputeDevice (kernel)
//!      ▲                                                   │
//!      │                                                   ▼
//!  LaneArena ◀──recycle── HitReporter ◀── DoubleBuffer::await_complete
//! ```
//!
//! The arena (cursors and pending rings) is the only state shared between
//! feeder and reporter; the two buffer sets are the only state shared with
//! the device.

pub mod benchmark;
pub mod double_buffer;
pub mod feeder;
pub mod lanes;
pub mod orchestrator;
pub mod reporter;

pub use benchmark::{BenchmarkEstimator, CellTally, RunStatistics};
pub use double_buffer::{DoubleBuffer, Ownership};
pub use feeder::{FeedOutcome, LaneFeeder};
pub use lanes::{ComparisonPolicy, LaneArena, PendingEntry, PendingRing, SequenceQueue};
pub use orchestrator::{QueryOutcome, QuerySearch, RunEstimate, SearchOrchestrator};
pub use reporter::{HitReporter, StepReport};
