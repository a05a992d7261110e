//! MedMove assists clinical range-of-motion (ROM) assessment with a wearable
//! goniometer. The device is armed over a serial link with a one-byte command
//! per movement, streams its readings back as text, and reports a final
//! `ANGLE:` line once the movement is done. The host captures that angle for
//! each of eight movements on both the unaffected and the affected side, and
//! folds the angles into four joint ROM values per side.
//!
//! The heart of the crate is the [acquisition] state machine: arming the
//! device, polling the stream on a fixed cadence, pulling a live value out of
//! every numeric line, and picking the authoritative final angle once the
//! read window closes. Around it sit the [angle_parser], the
//! [session_store] and the [rom] aggregation, plus a terminal front-end in
//! [gui] and a [dummy_device] for running without hardware.
//!
//! A session lives only in memory. Export a [report] before quitting if the
//! numbers should be kept.

#![warn(missing_docs)]
pub mod acquisition;
pub mod angle_parser;
#[allow(missing_docs)]
pub mod args;
pub mod clock;
pub mod config;
pub mod display;
pub mod dummy_device;
pub mod error;
pub mod gui;
pub mod line_reader;
pub mod movement;
pub mod report;
pub mod rom;
pub mod scheduler;
pub mod serial_channel;
pub mod session_store;
