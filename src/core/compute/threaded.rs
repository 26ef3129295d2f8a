//! Device running on its own thread.
//!
//! The host and the device thread talk over two bounded channels. A
//! submitted `StepBuffers` is moved into the command channel, so the host
//! physically cannot touch it until the device sends it back. Commands are
//! processed strictly in order, which is what makes this a serial queue.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};

use super::{check_unroll, ComputeDevice, LaneGeometry, StepBuffers};
use crate::core::alignment::kernel::execute_step;
use crate::core::alignment::profile::QueryContext;
use crate::core::alignment::workspace::DeviceWorkspace;
use crate::error::DeviceError;

enum DeviceCommand {
    Begin {
        ctx: Arc<QueryContext>,
        geometry: LaneGeometry,
    },
    Step(StepBuffers),
    End,
    Shutdown,
}

enum DeviceReply {
    Ready,
    Completed(StepBuffers),
    Failed(DeviceError),
}

pub struct ThreadedDevice {
    commands: Sender<DeviceCommand>,
    replies: Receiver<DeviceReply>,
    handle: Option<JoinHandle<()>>,
    in_flight: bool,
}

impl ThreadedDevice {
    /// Start the device thread.
    pub fn spawn() -> Result<Self, DeviceError> {
        let (cmd_tx, cmd_rx) = bounded::<DeviceCommand>(1);
        let (reply_tx, reply_rx) = bounded::<DeviceReply>(1);

        let handle = thread::Builder::new()
            .name("ferrous-scan-device".to_string())
            .spawn(move || device_loop(cmd_rx, reply_tx))
            .map_err(|e| DeviceError::Unavailable(e.to_string()))?;

        Ok(Self {
            commands: cmd_tx,
            replies: reply_rx,
            handle: Some(handle),
            in_flight: false,
        })
    }

    fn send(&self, cmd: DeviceCommand) -> Result<(), DeviceError> {
        self.commands
            .send(cmd)
            .map_err(|_| DeviceError::Disconnected)
    }

    fn recv(&self) -> Result<DeviceReply, DeviceError> {
        self.replies.recv().map_err(|_| DeviceError::Disconnected)
    }

    fn expect_ready(&self) -> Result<(), DeviceError> {
        match self.recv()? {
            DeviceReply::Ready => Ok(()),
            DeviceReply::Failed(e) => Err(e),
            DeviceReply::Completed(_) => Err(DeviceError::Protocol("step completion during setup")),
        }
    }
}

impl ComputeDevice for ThreadedDevice {
    fn name(&self) -> &'static str {
        "threaded"
    }

    fn begin_query(
        &mut self,
        ctx: Arc<QueryContext>,
        geometry: LaneGeometry,
    ) -> Result<(), DeviceError> {
        if self.in_flight {
            return Err(DeviceError::Busy);
        }
        self.send(DeviceCommand::Begin { ctx, geometry })?;
        self.expect_ready()
    }

    fn submit(&mut self, buffers: StepBuffers) -> Result<(), DeviceError> {
        if self.in_flight {
            return Err(DeviceError::Busy);
        }
        self.send(DeviceCommand::Step(buffers))?;
        self.in_flight = true;
        Ok(())
    }

    fn await_complete(&mut self) -> Result<StepBuffers, DeviceError> {
        if !self.in_flight {
            return Err(DeviceError::Idle);
        }
        self.in_flight = false;
        match self.recv()? {
            DeviceReply::Completed(buffers) => Ok(buffers),
            DeviceReply::Failed(e) => Err(e),
            DeviceReply::Ready => Err(DeviceError::Protocol("setup reply while awaiting a step")),
        }
    }

    fn end_query(&mut self) -> Result<(), DeviceError> {
        if self.in_flight {
            return Err(DeviceError::Busy);
        }
        self.send(DeviceCommand::End)?;
        self.expect_ready()
    }
}

impl Drop for ThreadedDevice {
    fn drop(&mut self) {
        if self.in_flight {
            // Drain the outstanding reply so the device thread can see Shutdown.
            let _ = self.replies.recv();
        }
        let _ = self.commands.send(DeviceCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn device_loop(commands: Receiver<DeviceCommand>, replies: Sender<DeviceReply>) {
    let mut workspace = DeviceWorkspace::new();
    let mut query: Option<Arc<QueryContext>> = None;

    while let Ok(cmd) = commands.recv() {
        let reply = match cmd {
            DeviceCommand::Begin { ctx, geometry } => match check_unroll(geometry.unroll) {
                Ok(()) => {
                    workspace.ensure(geometry, ctx.len());
                    log::trace!(
                        "device: bound query {} ({} residues, {} slots)",
                        ctx.id(),
                        ctx.len(),
                        geometry.slots()
                    );
                    query = Some(ctx);
                    DeviceReply::Ready
                }
                Err(e) => DeviceReply::Failed(e),
            },
            DeviceCommand::Step(mut buffers) => match &query {
                Some(ctx) => match execute_step(ctx, &mut workspace, &mut buffers) {
                    Ok(()) => DeviceReply::Completed(buffers),
                    Err(e) => DeviceReply::Failed(e),
                },
                None => DeviceReply::Failed(DeviceError::NoQuery),
            },
            DeviceCommand::End => {
                query = None;
                DeviceReply::Ready
            }
            DeviceCommand::Shutdown => break,
        };

        if replies.send(reply).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alignment::matrix::SubstitutionMatrix;

    #[test]
    fn round_trips_a_step_through_the_device_thread() {
        let matrix = SubstitutionMatrix::blosum62();
        let a = matrix.alphabet();
        let q = a.encode_seq(b"WW").unwrap();
        let ctx = Arc::new(QueryContext::build(0, "q", &q, &matrix, 4));
        let geometry = LaneGeometry::new(2, 1);

        let mut device = ThreadedDevice::spawn().unwrap();
        device.begin_query(ctx.clone(), geometry).unwrap();

        let mut buffers = StepBuffers::new(1, geometry);
        buffers.residues = vec![a.encode(b'W').unwrap(), ctx.terminator()];
        device.submit(buffers).unwrap();
        assert!(matches!(
            device.submit(StepBuffers::new(0, geometry)),
            Err(DeviceError::Busy)
        ));

        let done = device.await_complete().unwrap();
        assert_eq!(done.set, 1);
        assert_eq!(done.column_max, vec![11, 0]);
        assert!(matches!(device.await_complete(), Err(DeviceError::Idle)));
        device.end_query().unwrap();
    }

    #[test]
    fn rejects_unsupported_unroll_at_bind_time() {
        let matrix = SubstitutionMatrix::blosum62();
        let q = matrix.alphabet().encode_seq(b"MK").unwrap();
        let ctx = Arc::new(QueryContext::build(0, "q", &q, &matrix, 4));
        let mut device = ThreadedDevice::spawn().unwrap();
        assert!(matches!(
            device.begin_query(ctx, LaneGeometry::new(4, 5)),
            Err(DeviceError::UnsupportedUnroll(5))
        ));
    }
}
