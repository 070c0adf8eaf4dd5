//! The microphone front end as seen over a serial link.

use crate::byte_source::{read_up_to, ByteSource};
use log::{debug, info};
use serial2::SerialPort;
use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};

/// Link rate the front-end firmware transmits at.
pub const DEFAULT_BAUD_RATE: u32 = 800_000;

/// A [`ByteSource`] backed by a serial device, configured 8N1, raw, with no
/// flow control and blocking reads.
pub struct SerialSource {
    port: SerialPort,
    path: PathBuf,
}

impl SerialSource {
    /// Opens `path` at `baud_rate` and drops anything already queued in
    /// either direction.
    pub fn open(path: impl AsRef<Path>, baud_rate: u32) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut port = SerialPort::open(&path, baud_rate)?;

        // Block for as long as it takes (well, about 584,942,417,355 years,
        // which is close enough). A stalled front end stalls the pipeline.
        port.set_read_timeout(Duration::MAX)?;
        port.discard_buffers()?;

        info!("Opened {} at {} baud", path.display(), baud_rate);
        Ok(Self { port, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for SerialSource {
    fn discard_input(&mut self) -> io::Result<()> {
        self.port.discard_input_buffer()
    }

    fn read_chunk(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let chunk = read_up_to(&mut self.port, len)?;
        if chunk.len() != len {
            debug!("{}: short read, {} of {}", self.path.display(), chunk.len(), len);
        }
        Ok(chunk)
    }
}

/// Serial devices present on this machine.
pub fn available_ports() -> io::Result<Vec<PathBuf>> {
    SerialPort::available_ports()
}
