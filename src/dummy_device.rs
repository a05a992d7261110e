//! A simulated goniometer, for running the front-end without hardware.
//!
//! It behaves like the real device as far as the host can tell: a movement
//! command starts a stream of live angle lines that ramp toward a random
//! target, sprinkled with diagnostics, and closes with an `ANGLE:` line. A
//! calibration command streams values around zero and never reports a final
//! angle.

use crate::{
    movement::{Movement, CALIBRATION_COMMAND, MOVEMENTS},
    serial_channel::SerialChannel,
};
use log::debug;
use rand::prelude::*;
use std::{
    collections::VecDeque,
    io,
    ops::Range,
    sync::{mpsc, Arc, Mutex, PoisonError},
    thread,
    time::Duration,
};

const RAMP_STEPS: usize = 25;

enum Signal {
    Command(u8),
    Stop,
}

/// Builder for [`DummyGoniometer`].
#[derive(Debug, Clone)]
pub struct DummyGoniometerBuilder {
    step: Duration,
    noise: f64,
    seed: Option<u64>,
}

impl DummyGoniometerBuilder {
    /// Time between two emitted lines.
    pub fn step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    /// Amplitude of the jitter added to live values.
    pub fn noise(mut self, noise: f64) -> Self {
        self.noise = noise.abs();
        self
    }

    /// Makes the generated angles reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Spawns the device thread.
    pub fn build(self) -> DummyGoniometer {
        let (tx, rx) = mpsc::channel::<Signal>();
        let outbound = Arc::new(Mutex::new(VecDeque::new()));
        let th_outbound = Arc::clone(&outbound);
        let DummyGoniometerBuilder { step, noise, seed } = self;

        let handle = thread::spawn(move || {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let mut script: VecDeque<String> = VecDeque::new();
            loop {
                match rx.try_recv() {
                    Ok(Signal::Command(command)) => {
                        debug!("Dummy device got `{}`", command as char);
                        script = respond(command, noise, &mut rng);
                    }
                    Ok(Signal::Stop) | Err(mpsc::TryRecvError::Disconnected) => break,
                    Err(mpsc::TryRecvError::Empty) => {}
                }
                if let Some(line) = script.pop_front() {
                    th_outbound
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .extend(line.bytes().chain(std::iter::once(b'\n')));
                }
                thread::sleep(step);
            }
        });

        DummyGoniometer {
            handle: Some(handle),
            tx,
            outbound,
            open: true,
        }
    }
}

/// A [`SerialChannel`] backed by a device simulation running on its own
/// thread.
pub struct DummyGoniometer {
    handle: Option<thread::JoinHandle<()>>,
    tx: mpsc::Sender<Signal>,
    outbound: Arc<Mutex<VecDeque<u8>>>,
    open: bool,
}

impl DummyGoniometer {
    /// Starts configuring a simulated device.
    pub fn builder() -> DummyGoniometerBuilder {
        DummyGoniometerBuilder {
            step: Duration::from_millis(100),
            noise: 0.8,
            seed: None,
        }
    }

    /// A simulated device with default pacing.
    pub fn new() -> Self {
        Self::builder().build()
    }

    fn stop(&mut self) {
        let _ = self.tx.send(Signal::Stop);
        if let Some(thread) = self.handle.take() {
            let _ = thread.join();
        }
    }
}

impl Default for DummyGoniometer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DummyGoniometer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl SerialChannel for DummyGoniometer {
    fn is_open(&self) -> bool {
        self.open
    }

    fn reset_input_buffer(&mut self) -> io::Result<()> {
        self.outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        if !self.open {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "dummy device is closed"));
        }
        for &b in bytes {
            self.tx
                .send(Signal::Command(b))
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "dummy device stopped"))?;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn read_available(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        let mut outbound = self.outbound.lock().unwrap_or_else(PoisonError::into_inner);
        let n = outbound.len();
        buf.extend(outbound.drain(..));
        Ok(n)
    }

    fn close(&mut self) {
        self.stop();
        self.open = false;
    }
}

/// Plausible target angles, in degrees, for a movement.
fn target_range(movement: &Movement) -> Range<f64> {
    match movement.index {
        0 => 60.0..80.0,
        1 => 50.0..70.0,
        2 => 70.0..90.0,
        3 => 65.0..85.0,
        4 => 130.0..150.0,
        5 => 0.0..10.0,
        _ => 15.0..30.0,
    }
}

fn jitter(rng: &mut impl Rng, noise: f64) -> f64 {
    if noise > 0.0 {
        rng.gen_range(-noise..noise)
    } else {
        0.0
    }
}

/// The lines the device prints in answer to `command`.
fn respond(command: u8, noise: f64, rng: &mut impl Rng) -> VecDeque<String> {
    if command == CALIBRATION_COMMAND {
        let mut lines = VecDeque::from(vec!["CAL start".to_owned()]);
        lines.extend((0..RAMP_STEPS).map(|_| format!("{:.1}", jitter(rng, noise))));
        lines.push_back("CAL done".to_owned());
        return lines;
    }

    // Both deviation movements answer to the same byte
    let Some(movement) = MOVEMENTS.iter().find(|m| m.command == command) else {
        return VecDeque::from(vec![format!("ERR unknown command {}", command as char)]);
    };

    let target = rng.gen_range(target_range(movement));
    let mut lines = VecDeque::from(vec![format!("IMU ready ({})", command as char)]);
    lines.extend((1..=RAMP_STEPS).map(|step| {
        let value = target * step as f64 / RAMP_STEPS as f64 + jitter(rng, noise);
        format!("{:.1}", value)
    }));
    lines.push_back(format!("ANGLE:{:.1}", target));
    lines
}
