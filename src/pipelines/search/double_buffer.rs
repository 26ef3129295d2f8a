//! Two buffer sets with explicit host/device ownership.
//!
//! At any time each set is owned by exactly one side. The host may only touch
//! a set it owns; handing a set to the device moves the buffers into the
//! device queue, so the host physically cannot read or write them until
//! [`DoubleBuffer::await_complete`] brings them back.
//!
//! ```text
//!   step k   : device computes set k%2      host reports k-1 / feeds k+1 in set (k+1)%2
//!   step k+1 : device computes set (k+1)%2  host reports k / feeds k+2 in set k%2
//! ```

use crate::core::compute::{ComputeDevice, LaneGeometry, StepBuffers};
use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Host,
    Device,
}

pub struct DoubleBuffer {
    sets: [Option<StepBuffers>; 2],
    owner: [Ownership; 2],
}

impl DoubleBuffer {
    pub fn new(geometry: LaneGeometry) -> Self {
        Self {
            sets: [
                Some(StepBuffers::new(0, geometry)),
                Some(StepBuffers::new(1, geometry)),
            ],
            owner: [Ownership::Host; 2],
        }
    }

    /// Set used for step `step`.
    #[inline]
    pub fn set_for(step: u64) -> usize {
        (step % 2) as usize
    }

    pub fn owner(&self, set: usize) -> Ownership {
        self.owner[set]
    }

    pub fn host_ref(&self, set: usize) -> Result<&StepBuffers, PipelineError> {
        match self.owner[set] {
            Ownership::Host => self.sets[set]
                .as_ref()
                .ok_or(PipelineError::DeviceOwned { set }),
            Ownership::Device => Err(PipelineError::DeviceOwned { set }),
        }
    }

    pub fn host_mut(&mut self, set: usize) -> Result<&mut StepBuffers, PipelineError> {
        match self.owner[set] {
            Ownership::Host => self.sets[set]
                .as_mut()
                .ok_or(PipelineError::DeviceOwned { set }),
            Ownership::Device => Err(PipelineError::DeviceOwned { set }),
        }
    }

    /// Stamp `set` with `step` and hand it to the device.
    pub fn submit(
        &mut self,
        set: usize,
        step: u64,
        device: &mut dyn ComputeDevice,
    ) -> Result<(), PipelineError> {
        if self.owner[set] == Ownership::Device {
            return Err(PipelineError::DeviceOwned { set });
        }
        let mut buffers = self.sets[set]
            .take()
            .ok_or(PipelineError::DeviceOwned { set })?;
        buffers.step = step;
        self.owner[set] = Ownership::Device;
        // On failure the buffers are gone with the device; the run is over.
        device.submit(buffers)?;
        Ok(())
    }

    /// Wait for the device to hand back `set`.
    pub fn await_complete(
        &mut self,
        set: usize,
        device: &mut dyn ComputeDevice,
    ) -> Result<&StepBuffers, PipelineError> {
        if self.owner[set] == Ownership::Host {
            return Err(PipelineError::HostOwned { set });
        }
        let buffers = device.await_complete()?;
        if buffers.set != set {
            return Err(PipelineError::OutOfOrder {
                expected: set,
                got: buffers.set,
            });
        }
        self.owner[set] = Ownership::Host;
        Ok(&*self.sets[set].insert(buffers))
    }

    /// Take back a set still held by the device after an aborted run.
    pub fn reclaim(&mut self, device: &mut dyn ComputeDevice) {
        for set in 0..2 {
            if self.owner[set] == Ownership::Device {
                if let Ok(buffers) = device.await_complete() {
                    let got = buffers.set;
                    self.sets[got] = Some(buffers);
                    self.owner[got] = Ownership::Host;
                }
            }
        }
    }
}
