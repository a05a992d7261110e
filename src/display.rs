//! The interface through which the acquisition core talks to whatever is
//! showing results to the clinician.

use log::{debug, error, info};

use crate::{
    error::ErrorKind,
    movement::{Movement, Side},
    rom::RomResult,
};

/// Receives every user-visible event the core produces. All methods have
/// no-op defaults so a sink only implements what it shows.
pub trait DisplaySink {
    /// A new acquisition armed the device; anything shown for the previous
    /// one is stale.
    fn on_session_started(&mut self) {}

    /// A raw line arrived from the device.
    fn on_line(&mut self, _line: &str) {}

    /// A live angle to show right away. `0.0` after a clear-all.
    fn on_live_angle(&mut self, _value: f64) {}

    /// A measurement finished and was stored.
    fn on_final_angle(&mut self, _side: Side, _movement: &Movement, _value: f64) {}

    /// ROM for `side` changed.
    fn on_rom(&mut self, _side: Side, _rom: &RomResult) {}

    /// Something went wrong.
    fn on_error(&mut self, _kind: ErrorKind, _message: &str) {}
}

impl<D: DisplaySink + ?Sized> DisplaySink for &mut D {
    fn on_session_started(&mut self) {
        (**self).on_session_started()
    }
    fn on_line(&mut self, line: &str) {
        (**self).on_line(line)
    }
    fn on_live_angle(&mut self, value: f64) {
        (**self).on_live_angle(value)
    }
    fn on_final_angle(&mut self, side: Side, movement: &Movement, value: f64) {
        (**self).on_final_angle(side, movement, value)
    }
    fn on_rom(&mut self, side: Side, rom: &RomResult) {
        (**self).on_rom(side, rom)
    }
    fn on_error(&mut self, kind: ErrorKind, message: &str) {
        (**self).on_error(kind, message)
    }
}

/// A sink that writes events to the log, for headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDisplay;

impl DisplaySink for LogDisplay {
    fn on_line(&mut self, line: &str) {
        debug!("serial: {}", line);
    }

    fn on_live_angle(&mut self, value: f64) {
        info!("live angle {:.1}°", value);
    }

    fn on_final_angle(&mut self, side: Side, movement: &Movement, value: f64) {
        info!("{} ({}) = {:.1}°", movement, side, value);
    }

    fn on_rom(&mut self, side: Side, rom: &RomResult) {
        info!(
            "{} ROM: wrist {:.1}, forearm {:.1}, elbow {:.1}, deviation {:.1}",
            side, rom.wrist, rom.forearm, rom.elbow, rom.wrist_deviation
        );
    }

    fn on_error(&mut self, kind: ErrorKind, message: &str) {
        error!("{:?}: {}", kind, message);
    }
}
