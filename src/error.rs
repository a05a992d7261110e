//! Errors the acquisition core can report.

use std::{borrow::Cow, fmt, io};

/// The coarse category of an error, as handed to
/// [`DisplaySink::on_error`](crate::display::DisplaySink::on_error).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No open channel to the device
    NotConnected,
    /// A measurement was started without a movement and side selected
    NoSelection,
    /// Redo was requested before any movement was selected
    NoPriorMovement,
    /// The read window closed without a usable `ANGLE:` line
    NoAngleData,
    /// The serial port could not be opened, written or read
    ConnectionError,
    /// Bytes were dropped while decoding a line; never fatal
    DecodeWarning,
    /// A slot index outside `0..8`
    InvalidSlot,
}

/// Everything that can go wrong while driving the goniometer.
#[derive(Debug)]
pub enum AcquisitionError {
    /// Returned when starting while no channel is open, or when the channel
    /// closes mid-acquisition.
    NotConnected,

    /// Returned when starting a measurement without a selected movement.
    NoSelection,

    /// Returned by redo when nothing was ever selected.
    NoPriorMovement,

    /// Returned when the read window elapsed and no line carried a final
    /// angle.
    NoAngleData,

    /// Returned when io on the serial port fails.
    Connection(io::Error),

    /// Reported when undecodable bytes were dropped from a line.
    Decode {
        /// How many bytes were skipped
        dropped: usize,
    },

    /// Returned when a slot index is out of range.
    InvalidSlot(usize),
}

impl AcquisitionError {
    /// The category of this error.
    pub fn kind(&self) -> ErrorKind {
        use AcquisitionError as AE;
        match self {
            AE::NotConnected => ErrorKind::NotConnected,
            AE::NoSelection => ErrorKind::NoSelection,
            AE::NoPriorMovement => ErrorKind::NoPriorMovement,
            AE::NoAngleData => ErrorKind::NoAngleData,
            AE::Connection(_) => ErrorKind::ConnectionError,
            AE::Decode { .. } => ErrorKind::DecodeWarning,
            AE::InvalidSlot(_) => ErrorKind::InvalidSlot,
        }
    }
}

impl fmt::Display for AcquisitionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use AcquisitionError as AE;
        let msg = match self {
            AE::NotConnected => Cow::from("device not connected"),
            AE::NoSelection => Cow::from("no movement selected"),
            AE::NoPriorMovement => Cow::from("no previous movement to redo"),
            AE::NoAngleData => Cow::from("no valid ANGLE data found"),
            AE::Connection(error) => Cow::from(format!("serial error: {}", error)),
            AE::Decode { dropped } => {
                Cow::from(format!("dropped {} undecodable byte(s)", dropped))
            }
            AE::InvalidSlot(index) => Cow::from(format!("no angle slot at index {}", index)),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for AcquisitionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AcquisitionError::Connection(error) => Some(error),
            _ => None,
        }
    }
}

impl From<io::Error> for AcquisitionError {
    fn from(value: io::Error) -> Self {
        Self::Connection(value)
    }
}
