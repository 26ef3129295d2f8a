use crossbeam_channel::{bounded, Sender};
use std::io::{self, Result as IoResult, Write};
use std::thread::{self, JoinHandle};

// Messages sent to the background writer thread
enum OutMsg {
    Bytes(Vec<u8>),
    Flush,
}

/// AsyncChannelWriter: implements Write by enqueueing bytes to a background writer thread
///
/// Hit output is produced once per reported step; pushing it through a
/// bounded channel keeps slow disks from stretching the host's share of the
/// step loop. The first I/O error seen by the writer thread is kept and
/// surfaced by [`AsyncChannelWriter::finish`] (and by later writes).
pub struct AsyncChannelWriter {
    tx: Option<Sender<OutMsg>>,
    handle: Option<JoinHandle<IoResult<()>>>,
    error: Option<io::Error>,
}

impl AsyncChannelWriter {
    /// Create a new asynchronous writer, owning the provided inner writer.
    pub fn new(mut inner: Box<dyn Write + Send>) -> Self {
        // Bounded channel provides backpressure
        let (tx, rx) = bounded::<OutMsg>(1024);

        let handle = thread::spawn(move || -> IoResult<()> {
            for msg in rx {
                match msg {
                    OutMsg::Bytes(buf) => inner.write_all(&buf)?,
                    OutMsg::Flush => inner.flush()?,
                }
            }
            inner.flush()
        });

        Self {
            tx: Some(tx),
            handle: Some(handle),
            error: None,
        }
    }

    /// Close the channel, wait for the writer thread and report its result.
    pub fn finish(mut self) -> IoResult<()> {
        self.join_writer();
        self.error.take().map_or(Ok(()), Err)
    }

    fn join_writer(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let result = handle.join().unwrap_or_else(|_| {
                Err(io::Error::new(io::ErrorKind::Other, "writer thread panicked"))
            });
            if let Err(e) = result {
                self.error = Some(e);
            }
        }
    }

    fn send(&mut self, msg: OutMsg) -> IoResult<()> {
        if let Some(tx) = &self.tx {
            if tx.send(msg).is_ok() {
                return Ok(());
            }
        }
        // The writer thread exited early; keep its error for finish().
        self.join_writer();
        let reason = self
            .error
            .as_ref()
            .map_or_else(|| "output writer closed".to_string(), |e| e.to_string());
        Err(io::Error::new(io::ErrorKind::BrokenPipe, reason))
    }
}

impl Write for AsyncChannelWriter {
    fn write(&mut self, buf: &[u8]) -> IoResult<usize> {
        self.send(OutMsg::Bytes(buf.to_vec()))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        self.send(OutMsg::Flush)
    }
}

impl Drop for AsyncChannelWriter {
    fn drop(&mut self) {
        self.join_writer();
        if let Some(e) = self.error.take() {
            log::error!("Output writer failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> IoResult<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> IoResult<()> {
            Ok(())
        }
    }

    struct Failing;

    impl Write for Failing {
        fn write(&mut self, _buf: &[u8]) -> IoResult<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }
        fn flush(&mut self) -> IoResult<()> {
            Ok(())
        }
    }

    #[test]
    fn forwards_bytes_in_order() {
        let sink = Shared::default();
        let mut w = AsyncChannelWriter::new(Box::new(sink.clone()));
        w.write_all(b"a\t1\n").unwrap();
        w.write_all(b"b\t2\n").unwrap();
        w.finish().unwrap();
        assert_eq!(&*sink.0.lock().unwrap(), b"a\t1\nb\t2\n");
    }

    #[test]
    fn finish_surfaces_inner_write_errors() {
        let mut w = AsyncChannelWriter::new(Box::new(Failing));
        let _ = w.write_all(b"x\n");
        let err = w.finish().unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }
}
