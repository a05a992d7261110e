//! The byte stream to the goniometer.
//!
//! The acquisition state machine only ever talks to a [`SerialChannel`], so a
//! real port, the [`DummyGoniometer`](crate::dummy_device::DummyGoniometer)
//! and the scripted channels in the tests are interchangeable.

use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    time::Duration,
};

use log::{debug, info, warn};
use serial2::SerialPort;

/// Baud rate the goniometer firmware talks at.
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// A bidirectional, non-blocking byte stream to the device.
pub trait SerialChannel {
    /// Whether the channel can still be used.
    fn is_open(&self) -> bool;

    /// Throws away anything the device sent that has not been read yet.
    fn reset_input_buffer(&mut self) -> io::Result<()>;

    /// Queues bytes for the device.
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Pushes queued bytes out to the device.
    fn flush(&mut self) -> io::Result<()>;

    /// Appends every byte currently available to `buf` and returns how many
    /// were read. Never waits for more data to arrive.
    fn read_available(&mut self, buf: &mut Vec<u8>) -> io::Result<usize>;

    /// Closes the channel. Further calls to [`SerialChannel::is_open`]
    /// return `false`.
    fn close(&mut self);
}

impl<C: SerialChannel + ?Sized> SerialChannel for Box<C> {
    fn is_open(&self) -> bool {
        (**self).is_open()
    }
    fn reset_input_buffer(&mut self) -> io::Result<()> {
        (**self).reset_input_buffer()
    }
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write(bytes)
    }
    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
    fn read_available(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        (**self).read_available(buf)
    }
    fn close(&mut self) {
        (**self).close()
    }
}

/// Lists the serial ports the operating system knows about.
pub fn available_ports() -> io::Result<Vec<PathBuf>> {
    SerialPort::available_ports()
}

/// A [`SerialChannel`] backed by a real serial port.
#[derive(Debug)]
pub struct SerialPortChannel {
    port: Option<SerialPort>,
    name: String,
}

impl SerialPortChannel {
    /// Opens `path` at `baud_rate`. `drain_timeout` bounds how long a single
    /// read may wait while draining; keep it small so polling never stalls.
    pub fn open(path: impl AsRef<Path>, baud_rate: u32, drain_timeout: Duration) -> io::Result<Self> {
        let name = path.as_ref().to_string_lossy().into_owned();
        let mut port = SerialPort::open(path.as_ref(), baud_rate)?;
        port.set_read_timeout(drain_timeout)?;
        info!("Opened {} at {} baud", name, baud_rate);
        Ok(Self {
            port: Some(port),
            name,
        })
    }

    fn port(&self) -> io::Result<&SerialPort> {
        self.port
            .as_ref()
            .ok_or_else(|| io::Error::new(ErrorKind::NotConnected, "serial port is closed"))
    }
}

impl SerialChannel for SerialPortChannel {
    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn reset_input_buffer(&mut self) -> io::Result<()> {
        self.port()?.discard_input_buffer()
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port()?.write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port()?.flush()
    }

    fn read_available(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        let mut chunk = [0; 256];
        let mut total = 0;
        loop {
            let result = self.port()?.read(&mut chunk);
            match result {
                Ok(0) => break,
                Ok(n) => {
                    buf.extend_from_slice(&chunk[..n]);
                    total += n;
                }
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    if matches!(
                        e.kind(),
                        ErrorKind::BrokenPipe | ErrorKind::NotConnected | ErrorKind::UnexpectedEof
                    ) {
                        warn!("{} disconnected: {}", self.name, e);
                        self.port = None;
                    }
                    return Err(e);
                }
            }
        }
        if total > 0 {
            debug!("Drained {} byte(s) from {}", total, self.name);
        }
        Ok(total)
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            info!("Closed {}", self.name);
        }
    }
}
