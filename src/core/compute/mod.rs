//! # Compute device abstraction
//!
//! The host drives the search as a sequence of *steps*. Each step consumes one
//! residue per lane slot and is executed by a [`ComputeDevice`]. A device is a
//! single serial queue with room for one in-flight step:
//!
//! ```text
//!   host                          device
//!   ────                          ──────
//!   begin_query(ctx, geometry) ─▶ bind profile, zero DP state
//!   submit(StepBuffers k)      ─▶ run kernel for step k
//!   ...host feeds/reports...
//!   await_complete()           ◀─ StepBuffers k (outputs filled)
//!   end_query()                ─▶ release query
//! ```
//!
//! `StepBuffers` move by value, so a submitted set is unreachable from the
//! host until the device hands it back.
//!
//! ## Backends
//!
//! - `Inline`: executes the step inside `submit`. No overlap, but trivially
//!   deterministic; used for debugging and small runs.
//! - `Threaded`: a dedicated device thread fed over channels; the host's
//!   feed/report work overlaps the kernel.

pub mod inline;
pub mod threaded;

use std::sync::Arc;

use crate::core::alignment::profile::QueryContext;
use crate::error::DeviceError;

pub use inline::InlineDevice;
pub use threaded::ThreadedDevice;

/// Unroll factors the kernel is specialised for.
pub const SUPPORTED_UNROLL: [usize; 5] = [1, 2, 4, 8, 16];

/// Fixed lane layout of a run: `lanes` parallel slots, each interleaving
/// `unroll` database sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneGeometry {
    pub lanes: usize,
    pub unroll: usize,
}

impl LaneGeometry {
    pub fn new(lanes: usize, unroll: usize) -> Self {
        Self { lanes, unroll }
    }

    /// Total number of lane slots (`lanes * unroll`).
    #[inline]
    pub fn slots(&self) -> usize {
        self.lanes * self.unroll
    }

    /// Flat index of `(lane, slot)`; slots of one lane are adjacent.
    #[inline]
    pub fn index(&self, lane: usize, slot: usize) -> usize {
        lane * self.unroll + slot
    }
}

/// Returns an error when no kernel specialisation exists for `unroll`.
pub fn check_unroll(unroll: usize) -> Result<(), DeviceError> {
    if SUPPORTED_UNROLL.contains(&unroll) {
        Ok(())
    } else {
        Err(DeviceError::UnsupportedUnroll(unroll))
    }
}

/// One physical buffer set of the double buffer.
///
/// The host writes `residues`; the device writes `column_max` and
/// `finished_max`. All three are indexed by [`LaneGeometry::index`].
#[derive(Debug, Clone)]
pub struct StepBuffers {
    /// Which of the two sets this is (0 or 1). Never changes.
    pub set: usize,
    /// Step number this set was last submitted for.
    pub step: u64,
    /// Residue code consumed by each slot in this step.
    pub residues: Vec<u8>,
    /// Maximum cell of the DP column computed for each slot.
    pub column_max: Vec<i32>,
    /// On a terminator step: best score of the sequence that just ended.
    pub finished_max: Vec<i32>,
}

impl StepBuffers {
    pub fn new(set: usize, geometry: LaneGeometry) -> Self {
        let slots = geometry.slots();
        Self {
            set,
            step: 0,
            residues: vec![0; slots],
            column_max: vec![0; slots],
            finished_max: vec![0; slots],
        }
    }

    pub fn slots(&self) -> usize {
        self.residues.len()
    }
}

/// A serial compute queue with a pipeline depth of one step.
pub trait ComputeDevice: Send {
    fn name(&self) -> &'static str;

    /// Bind a query and reset DP state for the given geometry.
    fn begin_query(
        &mut self,
        ctx: Arc<QueryContext>,
        geometry: LaneGeometry,
    ) -> Result<(), DeviceError>;

    /// Hand a buffer set to the device. Fails with `Busy` if a step is in flight.
    fn submit(&mut self, buffers: StepBuffers) -> Result<(), DeviceError>;

    /// Block until the in-flight step completes and take its buffers back.
    fn await_complete(&mut self) -> Result<StepBuffers, DeviceError>;

    /// Release the bound query.
    fn end_query(&mut self) -> Result<(), DeviceError>;
}

/// Compute backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ComputeBackend {
    /// Run each step synchronously on the calling thread (rayon across lanes).
    Inline,
    /// Run steps on a dedicated device thread, overlapping host bookkeeping.
    Threaded,
}

impl ComputeBackend {
    /// Create the device. A failure here is a fatal device-init error.
    pub fn create(self) -> Result<Box<dyn ComputeDevice>, DeviceError> {
        let device: Box<dyn ComputeDevice> = match self {
            ComputeBackend::Inline => Box::new(InlineDevice::new()),
            ComputeBackend::Threaded => Box::new(ThreadedDevice::spawn()?),
        };
        log::debug!("Compute device ready: {}", device.name());
        Ok(device)
    }
}

impl Default for ComputeBackend {
    fn default() -> Self {
        ComputeBackend::Threaded
    }
}
