//! Synchronous device: the step runs inside `submit`.

use std::sync::Arc;

use super::{check_unroll, ComputeDevice, LaneGeometry, StepBuffers};
use crate::core::alignment::kernel::execute_step;
use crate::core::alignment::profile::QueryContext;
use crate::core::alignment::workspace::DeviceWorkspace;
use crate::error::DeviceError;

#[derive(Debug, Default)]
pub struct InlineDevice {
    workspace: DeviceWorkspace,
    query: Option<Arc<QueryContext>>,
    completed: Option<StepBuffers>,
}

impl InlineDevice {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ComputeDevice for InlineDevice {
    fn name(&self) -> &'static str {
        "inline"
    }

    fn begin_query(
        &mut self,
        ctx: Arc<QueryContext>,
        geometry: LaneGeometry,
    ) -> Result<(), DeviceError> {
        check_unroll(geometry.unroll)?;
        self.workspace.ensure(geometry, ctx.len());
        self.query = Some(ctx);
        self.completed = None;
        Ok(())
    }

    fn submit(&mut self, mut buffers: StepBuffers) -> Result<(), DeviceError> {
        if self.completed.is_some() {
            return Err(DeviceError::Busy);
        }
        let ctx = self.query.as_ref().ok_or(DeviceError::NoQuery)?;
        execute_step(ctx, &mut self.workspace, &mut buffers)?;
        self.completed = Some(buffers);
        Ok(())
    }

    fn await_complete(&mut self) -> Result<StepBuffers, DeviceError> {
        self.completed.take().ok_or(DeviceError::Idle)
    }

    fn end_query(&mut self) -> Result<(), DeviceError> {
        self.query = None;
        Ok(())
    }
}
