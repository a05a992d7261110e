//! The measurement acquisition state machine.
//!
//! ```text
//! IDLE --start--> ARMED --> POLLING --deadline--> COMPLETE
//!                   |          |
//!                   +----------+--------------> ABORTED
//! ```
//!
//! Starting arms the device with a single command byte and opens a read
//! window. The front-end then calls [`Acquisition::tick`] on a fixed cadence
//! with the [`TickHandle`] it was given; each tick drains whatever the device
//! sent, echoes every line and forwards any bare number as a live angle.
//! Once the window has elapsed a measurement is finalized from the last
//! `ANGLE:` line, while a calibration simply stops.
//!
//! Only one acquisition is ever live. Starting again abandons the previous
//! one, and its handles go stale: a stale tick does nothing, so an abandoned
//! acquisition can never write a slot.

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::{
    angle_parser::{parse_final, parse_live},
    clock::{Clock, SystemClock},
    display::DisplaySink,
    error::AcquisitionError,
    line_reader::LineReader,
    movement::{Movement, Side, CALIBRATION_COMMAND},
    rom::RomResult,
    scheduler::TickHandle,
    session_store::SessionStore,
    serial_channel::SerialChannel,
};

/// How long the device is listened to after being armed.
pub const DEFAULT_DEADLINE: Duration = Duration::from_millis(7000);

/// What an acquisition is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Record a final angle into a slot
    Measurement,
    /// Stream live values only; nothing is recorded
    Calibration,
}

/// A movement on a side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    /// The movement to measure
    pub movement: Movement,
    /// The side to measure it on
    pub side: Side,
}

/// Where the state machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionState {
    /// Nothing has been started yet
    Idle,
    /// The read window is open
    Polling(Mode),
    /// The last acquisition ran to its deadline
    Complete(Mode),
    /// The last acquisition failed
    Aborted(crate::error::ErrorKind),
}

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Still inside the read window; tick again with this handle.
    Continue(TickHandle),
    /// The window closed. Carries the recorded angle for a measurement,
    /// `None` for a calibration.
    Complete(Option<f64>),
    /// The acquisition failed and has been discarded.
    Aborted(crate::error::ErrorKind),
    /// The handle belongs to an acquisition that is no longer live.
    Stale,
}

#[derive(Debug)]
struct ActiveAcquisition {
    generation: u64,
    mode: Mode,
    target: Option<Selection>,
    started_at: Instant,
    buffer: String,
    lines: LineReader,
}

impl ActiveAcquisition {
    fn push_line<D: DisplaySink>(&mut self, line: &str, display: &mut D) {
        debug!("<- {}", line);
        self.buffer.push_str(line);
        self.buffer.push('\n');
        display.on_line(line);
        if let Some(angle) = parse_live(line) {
            display.on_live_angle(angle);
        }
    }
}

/// Drives the goniometer and owns the session's recorded angles.
pub struct Acquisition<C, K = SystemClock>
where
    C: SerialChannel,
    K: Clock,
{
    channel: Option<C>,
    clock: K,
    deadline: Duration,
    store: SessionStore,
    selection: Option<Selection>,
    active: Option<ActiveAcquisition>,
    generation: u64,
    state: AcquisitionState,
}

impl<C: SerialChannel> Acquisition<C, SystemClock> {
    /// An unconnected acquisition on the system clock.
    pub fn with_system_clock() -> Self {
        Self::new(SystemClock)
    }
}

impl<C, K> Acquisition<C, K>
where
    C: SerialChannel,
    K: Clock,
{
    /// An unconnected acquisition timed by `clock`, with the default read
    /// window.
    pub fn new(clock: K) -> Self {
        Self {
            channel: None,
            clock,
            deadline: DEFAULT_DEADLINE,
            store: SessionStore::new(),
            selection: None,
            active: None,
            generation: 0,
            state: AcquisitionState::Idle,
        }
    }

    /// Sets the read window.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Takes ownership of an open channel, closing any previous one.
    pub fn connect(&mut self, channel: C) {
        self.disconnect();
        self.channel = Some(channel);
    }

    /// Closes and drops the channel. Recorded angles are kept.
    pub fn disconnect(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
    }

    /// Whether an open channel is attached.
    pub fn is_connected(&self) -> bool {
        self.channel.as_ref().is_some_and(|c| c.is_open())
    }

    /// Chooses the movement and side the next measurement (and redo) use.
    pub fn select(&mut self, movement: Movement, side: Side) {
        debug!("Selected {} ({})", movement, side);
        self.selection = Some(Selection { movement, side });
    }

    /// The current selection.
    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    /// The state of the most recent acquisition.
    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    /// Whether a read window is open.
    pub fn is_polling(&self) -> bool {
        self.active.is_some()
    }

    /// Read-only view of the recorded angles.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// ROM for `side` from the current slots.
    pub fn rom(&self, side: Side) -> RomResult {
        self.store.rom(side)
    }

    /// Text received so far by the live acquisition.
    pub fn buffer(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.buffer.as_str())
    }

    /// Arms the device for the selected movement.
    pub fn start_measurement<D: DisplaySink>(
        &mut self,
        display: &mut D,
    ) -> Result<TickHandle, AcquisitionError> {
        self.start(Mode::Measurement, display)
    }

    /// Puts the device in calibration mode and streams live values.
    pub fn calibrate<D: DisplaySink>(
        &mut self,
        display: &mut D,
    ) -> Result<TickHandle, AcquisitionError> {
        self.start(Mode::Calibration, display)
    }

    /// Measures the current selection again.
    pub fn redo<D: DisplaySink>(&mut self, display: &mut D) -> Result<TickHandle, AcquisitionError> {
        if self.selection.is_none() {
            self.abandon();
            return Err(self.fail(AcquisitionError::NoPriorMovement, display));
        }
        self.start(Mode::Measurement, display)
    }

    /// Starts a fresh acquisition, abandoning any live one.
    pub fn start<D: DisplaySink>(
        &mut self,
        mode: Mode,
        display: &mut D,
    ) -> Result<TickHandle, AcquisitionError> {
        self.abandon();

        if !self.is_connected() {
            return Err(self.fail(AcquisitionError::NotConnected, display));
        }

        let (command, target) = match mode {
            Mode::Calibration => (CALIBRATION_COMMAND, None),
            Mode::Measurement => match self.selection {
                Some(selection) => (selection.movement.command, Some(selection)),
                None => return Err(self.fail(AcquisitionError::NoSelection, display)),
            },
        };

        let Some(channel) = self.channel.as_mut() else {
            return Err(self.fail(AcquisitionError::NotConnected, display));
        };
        let armed = channel
            .reset_input_buffer()
            .and_then(|_| channel.write(&[command]))
            .and_then(|_| channel.flush());
        if let Err(e) = armed {
            return Err(self.fail(e.into(), display));
        }

        match target {
            Some(Selection { movement, side }) => {
                if movement.shares_command() {
                    debug!("{} shares command `{}`", movement, command as char);
                }
                info!("Measuring {} ({}), sent `{}`", movement, side, command as char);
            }
            None => info!("Calibrating, sent `{}`", command as char),
        }

        self.active = Some(ActiveAcquisition {
            generation: self.generation,
            mode,
            target,
            started_at: self.clock.now(),
            buffer: String::new(),
            lines: LineReader::new(),
        });
        self.state = AcquisitionState::Polling(mode);
        display.on_session_started();

        Ok(TickHandle::new(self.generation))
    }

    /// Runs one poll of the acquisition `handle` belongs to.
    pub fn tick<D: DisplaySink>(&mut self, handle: TickHandle, display: &mut D) -> TickOutcome {
        let mut active = match self.active.take() {
            Some(a) if a.generation == handle.generation() => a,
            other => {
                self.active = other;
                debug!("Ignoring stale tick for generation {}", handle.generation());
                return TickOutcome::Stale;
            }
        };

        let Some(channel) = self.channel.as_mut().filter(|c| c.is_open()) else {
            return self.fail_tick(AcquisitionError::NotConnected, display);
        };

        let mut bytes = Vec::new();
        if let Err(e) = channel.read_available(&mut bytes) {
            let closed = !channel.is_open();
            let err = AcquisitionError::from(e);
            warn!("Serial read failed: {}", err);
            display.on_error(err.kind(), &err.to_string());
            if closed {
                return self.fail_tick(AcquisitionError::NotConnected, display);
            }
        }

        let dropped_before = active.lines.dropped();
        active.lines.extend(&bytes);
        while let Some(line) = active.lines.read_line() {
            active.push_line(&line, display);
        }

        let elapsed = self.clock.now().saturating_duration_since(active.started_at);
        if elapsed < self.deadline {
            self.note_dropped(&active, dropped_before);
            self.active = Some(active);
            return TickOutcome::Continue(handle);
        }

        if let Some(rest) = active.lines.take_remainder() {
            active.push_line(&rest, display);
        }
        self.note_dropped(&active, dropped_before);

        match active.mode {
            Mode::Calibration => {
                info!("Calibration window closed");
                self.state = AcquisitionState::Complete(Mode::Calibration);
                TickOutcome::Complete(None)
            }
            Mode::Measurement => self.finalize(active, display),
        }
    }

    /// Resets every slot on both sides and zeroes the displayed values.
    /// The connection and any live acquisition are left alone.
    pub fn clear_all<D: DisplaySink>(&mut self, display: &mut D) {
        info!("Clearing all measurements");
        self.store.reset_all();
        display.on_live_angle(0.0);
        for side in Side::BOTH {
            display.on_rom(side, &self.store.rom(side));
        }
    }

    fn finalize<D: DisplaySink>(&mut self, active: ActiveAcquisition, display: &mut D) -> TickOutcome {
        let Some(Selection { movement, side }) = active.target else {
            return self.fail_tick(AcquisitionError::NoSelection, display);
        };

        let Some(angle) = parse_final(&active.buffer) else {
            return self.fail_tick(AcquisitionError::NoAngleData, display);
        };

        if let Err(e) = self.store.set_slot(side, movement.index, angle) {
            return self.fail_tick(e, display);
        }

        info!("{} ({}) recorded at {}°", movement, side, angle);
        self.state = AcquisitionState::Complete(Mode::Measurement);
        display.on_final_angle(side, &movement, angle);
        display.on_live_angle(angle);
        display.on_rom(side, &self.store.rom(side));
        TickOutcome::Complete(Some(angle))
    }

    /// Invalidates every outstanding handle and discards the live acquisition.
    fn abandon(&mut self) {
        self.generation += 1;
        if let Some(previous) = self.active.take() {
            debug!(
                "Abandoning generation {} with {} byte(s) buffered, {} unread",
                previous.generation,
                previous.buffer.len(),
                previous.lines.bytes_available()
            );
        }
    }

    fn fail<D: DisplaySink>(&mut self, err: AcquisitionError, display: &mut D) -> AcquisitionError {
        warn!("Acquisition aborted: {}", err);
        self.active = None;
        self.state = AcquisitionState::Aborted(err.kind());
        display.on_error(err.kind(), &err.to_string());
        err
    }

    fn fail_tick<D: DisplaySink>(&mut self, err: AcquisitionError, display: &mut D) -> TickOutcome {
        TickOutcome::Aborted(self.fail(err, display).kind())
    }

    fn note_dropped(&self, active: &ActiveAcquisition, before: usize) {
        let dropped = active.lines.dropped() - before;
        if dropped > 0 {
            // Common right after arming, while the device buffer still holds
            // garbage
            warn!("{}", AcquisitionError::Decode { dropped });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::ManualClock,
        error::ErrorKind,
        movement::MOVEMENTS,
        scheduler::PollTimer,
    };
    use std::{cell::RefCell, collections::VecDeque, io, rc::Rc};

    #[derive(Debug, Default)]
    struct Wire {
        written: Vec<u8>,
        inbound: VecDeque<u8>,
        open: bool,
        resets: usize,
        fail_reads: bool,
    }

    /// An in-memory device the test feeds by hand.
    struct ScriptedChannel {
        wire: Rc<RefCell<Wire>>,
    }

    impl ScriptedChannel {
        fn new() -> (Self, Rc<RefCell<Wire>>) {
            let wire = Rc::new(RefCell::new(Wire {
                open: true,
                ..Wire::default()
            }));
            (Self { wire: wire.clone() }, wire)
        }
    }

    impl SerialChannel for ScriptedChannel {
        fn is_open(&self) -> bool {
            self.wire.borrow().open
        }
        fn reset_input_buffer(&mut self) -> io::Result<()> {
            let mut wire = self.wire.borrow_mut();
            wire.inbound.clear();
            wire.resets += 1;
            Ok(())
        }
        fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.wire.borrow_mut().written.extend_from_slice(bytes);
            Ok(())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
        fn read_available(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
            let mut wire = self.wire.borrow_mut();
            if wire.fail_reads {
                return Err(io::Error::new(io::ErrorKind::Other, "line noise"));
            }
            let n = wire.inbound.len();
            buf.extend(wire.inbound.drain(..));
            Ok(n)
        }
        fn close(&mut self) {
            self.wire.borrow_mut().open = false;
        }
    }

    fn feed(wire: &Rc<RefCell<Wire>>, bytes: &[u8]) {
        wire.borrow_mut().inbound.extend(bytes.iter().copied());
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Started,
        Line(String),
        Live(f64),
        Final(Side, usize, f64),
        Rom(Side, RomResult),
        Error(ErrorKind),
    }

    #[derive(Debug, Default)]
    struct Recorder {
        events: Vec<Event>,
    }

    impl Recorder {
        fn finals(&self) -> usize {
            self.events
                .iter()
                .filter(|e| matches!(e, Event::Final(..)))
                .count()
        }
        fn errors(&self) -> Vec<ErrorKind> {
            self.events
                .iter()
                .filter_map(|e| match e {
                    Event::Error(kind) => Some(*kind),
                    _ => None,
                })
                .collect()
        }
    }

    impl DisplaySink for Recorder {
        fn on_session_started(&mut self) {
            self.events.push(Event::Started);
        }
        fn on_line(&mut self, line: &str) {
            self.events.push(Event::Line(line.to_owned()));
        }
        fn on_live_angle(&mut self, value: f64) {
            self.events.push(Event::Live(value));
        }
        fn on_final_angle(&mut self, side: Side, movement: &Movement, value: f64) {
            self.events.push(Event::Final(side, movement.index, value));
        }
        fn on_rom(&mut self, side: Side, rom: &RomResult) {
            self.events.push(Event::Rom(side, *rom));
        }
        fn on_error(&mut self, kind: ErrorKind, _message: &str) {
            self.events.push(Event::Error(kind));
        }
    }

    fn connected(clock: &ManualClock) -> (Acquisition<ScriptedChannel, &ManualClock>, Rc<RefCell<Wire>>) {
        let (channel, wire) = ScriptedChannel::new();
        let mut acq = Acquisition::new(clock);
        acq.connect(channel);
        (acq, wire)
    }

    fn expect_continue(outcome: TickOutcome) -> TickHandle {
        match outcome {
            TickOutcome::Continue(handle) => handle,
            other => panic!("expected Continue, got {:?}", other),
        }
    }

    #[test]
    fn measures_wrist_flexion_end_to_end() {
        let clock = ManualClock::new();
        let (mut acq, wire) = connected(&clock);
        let mut display = Recorder::default();

        acq.select(MOVEMENTS[0], Side::Unaffected);
        let handle = acq.start_measurement(&mut display).unwrap();
        assert_eq!(wire.borrow().written, b"f".to_vec());
        assert_eq!(wire.borrow().resets, 1);
        assert_eq!(acq.state(), AcquisitionState::Polling(Mode::Measurement));

        feed(&wire, b"noise\nANGLE:42.3\n");
        let handle = expect_continue(acq.tick(handle, &mut display));
        assert_eq!(acq.buffer(), Some("noise\nANGLE:42.3\n"));

        clock.advance(DEFAULT_DEADLINE);
        assert_eq!(acq.tick(handle, &mut display), TickOutcome::Complete(Some(42.3)));

        assert_eq!(acq.store().get_slot(Side::Unaffected, 0), Some(42.3));
        assert_eq!(acq.rom(Side::Unaffected).wrist, 42.3);
        assert_eq!(display.finals(), 1);
        assert_eq!(acq.state(), AcquisitionState::Complete(Mode::Measurement));
        assert!(!acq.is_polling());
        assert!(display
            .events
            .contains(&Event::Rom(Side::Unaffected, acq.rom(Side::Unaffected))));

        // The acquisition is gone; its handle is now stale
        assert_eq!(acq.tick(handle, &mut display), TickOutcome::Stale);
        assert_eq!(display.finals(), 1);
    }

    #[test]
    fn live_angles_are_forwarded() {
        let clock = ManualClock::new();
        let (mut acq, wire) = connected(&clock);
        let mut display = Recorder::default();

        acq.select(MOVEMENTS[4], Side::Affected);
        let handle = acq.start_measurement(&mut display).unwrap();
        feed(&wire, b"12.5\nIMU ok\n13\n");
        assert_eq!(expect_continue(acq.tick(handle, &mut display)), handle);

        assert_eq!(
            display.events,
            vec![
                Event::Started,
                Event::Line("12.5".into()),
                Event::Live(12.5),
                Event::Line("IMU ok".into()),
                Event::Line("13".into()),
                Event::Live(13.0),
            ]
        );
        assert_eq!(wire.borrow().written, b"x".to_vec());
    }

    #[test]
    fn no_angle_line_aborts() {
        let clock = ManualClock::new();
        let (mut acq, wire) = connected(&clock);
        let mut display = Recorder::default();

        acq.select(MOVEMENTS[2], Side::Affected);
        let handle = acq.start_measurement(&mut display).unwrap();
        feed(&wire, b"10\n20\n");
        let handle = expect_continue(acq.tick(handle, &mut display));
        clock.advance(Duration::from_millis(7001));

        assert_eq!(
            acq.tick(handle, &mut display),
            TickOutcome::Aborted(ErrorKind::NoAngleData)
        );
        assert_eq!(acq.store().get_slot(Side::Affected, 2), None);
        assert_eq!(display.errors(), vec![ErrorKind::NoAngleData]);
        assert_eq!(display.finals(), 0);
        assert_eq!(acq.state(), AcquisitionState::Aborted(ErrorKind::NoAngleData));
    }

    #[test]
    fn silent_device_still_times_out() {
        let clock = ManualClock::new();
        let (mut acq, _wire) = connected(&clock);
        let mut display = Recorder::default();

        acq.select(MOVEMENTS[1], Side::Unaffected);
        let mut handle = acq.start_measurement(&mut display).unwrap();
        for _ in 0..139 {
            clock.advance(Duration::from_millis(50));
            handle = expect_continue(acq.tick(handle, &mut display));
        }
        clock.advance(Duration::from_millis(50));
        assert_eq!(
            acq.tick(handle, &mut display),
            TickOutcome::Aborted(ErrorKind::NoAngleData)
        );
    }

    #[test]
    fn partial_lines_are_joined_and_flushed_at_deadline() {
        let clock = ManualClock::new();
        let (mut acq, wire) = connected(&clock);
        let mut display = Recorder::default();

        acq.select(MOVEMENTS[6], Side::Affected);
        let handle = acq.start_measurement(&mut display).unwrap();
        assert_eq!(wire.borrow().written, b"z".to_vec());

        feed(&wire, b"ANGLE:1");
        let handle = expect_continue(acq.tick(handle, &mut display));
        feed(&wire, b"5.0\nANGLE:3");
        let handle = expect_continue(acq.tick(handle, &mut display));
        feed(&wire, b"3.5");
        clock.advance(DEFAULT_DEADLINE);

        assert_eq!(acq.tick(handle, &mut display), TickOutcome::Complete(Some(33.5)));
        assert_eq!(acq.store().get_slot(Side::Affected, 6), Some(33.5));
    }

    #[test]
    fn superseded_acquisition_cannot_write() {
        let clock = ManualClock::new();
        let (mut acq, wire) = connected(&clock);
        let mut display = Recorder::default();

        acq.select(MOVEMENTS[0], Side::Unaffected);
        let first = acq.start_measurement(&mut display).unwrap();
        feed(&wire, b"ANGLE:10.0\n");
        let first = expect_continue(acq.tick(first, &mut display));

        clock.advance(Duration::from_millis(3000));
        let second = acq.start_measurement(&mut display).unwrap();
        assert_ne!(first, second);
        feed(&wire, b"ANGLE:20.0\n");

        clock.advance(DEFAULT_DEADLINE);
        assert_eq!(acq.tick(first, &mut display), TickOutcome::Stale);
        assert_eq!(acq.store().get_slot(Side::Unaffected, 0), None);

        assert_eq!(acq.tick(second, &mut display), TickOutcome::Complete(Some(20.0)));
        assert_eq!(acq.tick(first, &mut display), TickOutcome::Stale);
        assert_eq!(acq.store().get_slot(Side::Unaffected, 0), Some(20.0));
        assert_eq!(display.finals(), 1);
    }

    #[test]
    fn poll_timer_drives_only_the_latest_acquisition() {
        let clock = ManualClock::new();
        let (mut acq, wire) = connected(&clock);
        let mut display = Recorder::default();
        let mut timer = PollTimer::default();

        acq.select(MOVEMENTS[3], Side::Affected);
        let first = acq.start_measurement(&mut display).unwrap();
        timer.arm_now(first, clock.now());
        let second = acq.redo(&mut display).unwrap();
        timer.arm_now(second, clock.now());
        feed(&wire, b"ANGLE:55\n");

        let mut outcome = None;
        while outcome.is_none() {
            clock.advance(Duration::from_millis(50));
            let Some(handle) = timer.take_due(clock.now()) else {
                continue;
            };
            match acq.tick(handle, &mut display) {
                TickOutcome::Continue(next) => timer.rearm(next, clock.now()),
                done => outcome = Some(done),
            }
        }
        assert_eq!(outcome, Some(TickOutcome::Complete(Some(55.0))));
        assert_eq!(wire.borrow().written, b"pp".to_vec());
    }

    #[test]
    fn calibration_streams_but_records_nothing() {
        let clock = ManualClock::new();
        let (mut acq, wire) = connected(&clock);
        let mut display = Recorder::default();

        let handle = acq.calibrate(&mut display).unwrap();
        assert_eq!(wire.borrow().written, vec![CALIBRATION_COMMAND]);

        feed(&wire, b"0.0\n1.5\nANGLE:1.5\n");
        let handle = expect_continue(acq.tick(handle, &mut display));
        clock.advance(DEFAULT_DEADLINE);

        assert_eq!(acq.tick(handle, &mut display), TickOutcome::Complete(None));
        assert_eq!(acq.state(), AcquisitionState::Complete(Mode::Calibration));
        assert!(display.events.contains(&Event::Live(1.5)));
        assert_eq!(display.finals(), 0);
        for side in Side::BOTH {
            assert_eq!(acq.store().snapshot_side(side), [None; 8]);
        }
    }

    #[test]
    fn calibration_needs_no_selection() {
        let clock = ManualClock::new();
        let (mut acq, _wire) = connected(&clock);
        assert!(acq.calibrate(&mut Recorder::default()).is_ok());
    }

    #[test]
    fn start_requires_connection() {
        let clock = ManualClock::new();
        let mut acq: Acquisition<ScriptedChannel, _> = Acquisition::new(&clock);
        let mut display = Recorder::default();
        acq.select(MOVEMENTS[0], Side::Affected);

        let err = acq.start_measurement(&mut display).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotConnected);
        assert_eq!(acq.state(), AcquisitionState::Aborted(ErrorKind::NotConnected));
        assert!(acq.calibrate(&mut display).is_err());
        assert_eq!(
            display.errors(),
            vec![ErrorKind::NotConnected, ErrorKind::NotConnected]
        );
    }

    #[test]
    fn start_requires_selection() {
        let clock = ManualClock::new();
        let (mut acq, wire) = connected(&clock);
        let mut display = Recorder::default();

        let err = acq.start_measurement(&mut display).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoSelection);
        assert!(wire.borrow().written.is_empty());
    }

    #[test]
    fn redo_without_prior_movement() {
        let clock = ManualClock::new();
        let (mut acq, wire) = connected(&clock);
        let mut display = Recorder::default();

        let err = acq.redo(&mut display).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoPriorMovement);
        assert!(wire.borrow().written.is_empty());
    }

    #[test]
    fn redo_overwrites_slot() {
        let clock = ManualClock::new();
        let (mut acq, wire) = connected(&clock);
        let mut display = Recorder::default();

        acq.select(MOVEMENTS[5], Side::Affected);
        for angle in ["30.0", "31.5"] {
            let handle = acq.redo(&mut display).unwrap();
            feed(&wire, format!("ANGLE:{}\n", angle).as_bytes());
            clock.advance(DEFAULT_DEADLINE);
            assert!(matches!(acq.tick(handle, &mut display), TickOutcome::Complete(Some(_))));
        }
        assert_eq!(acq.store().get_slot(Side::Affected, 5), Some(31.5));
        assert_eq!(acq.rom(Side::Affected).elbow, 15.75);
    }

    #[test]
    fn finalize_uses_the_acquisitions_own_target() {
        let clock = ManualClock::new();
        let (mut acq, wire) = connected(&clock);
        let mut display = Recorder::default();

        acq.select(MOVEMENTS[0], Side::Unaffected);
        let handle = acq.start_measurement(&mut display).unwrap();
        acq.select(MOVEMENTS[7], Side::Affected);
        feed(&wire, b"ANGLE:25\n");
        clock.advance(DEFAULT_DEADLINE);

        assert_eq!(acq.tick(handle, &mut display), TickOutcome::Complete(Some(25.0)));
        assert_eq!(acq.store().get_slot(Side::Unaffected, 0), Some(25.0));
        assert_eq!(acq.store().get_slot(Side::Affected, 7), None);
    }

    #[test]
    fn closed_channel_aborts_polling() {
        let clock = ManualClock::new();
        let (mut acq, wire) = connected(&clock);
        let mut display = Recorder::default();

        acq.select(MOVEMENTS[0], Side::Unaffected);
        let handle = acq.start_measurement(&mut display).unwrap();
        wire.borrow_mut().open = false;

        assert_eq!(
            acq.tick(handle, &mut display),
            TickOutcome::Aborted(ErrorKind::NotConnected)
        );
        assert!(!acq.is_polling());
    }

    #[test]
    fn read_errors_are_reported_but_not_fatal() {
        let clock = ManualClock::new();
        let (mut acq, wire) = connected(&clock);
        let mut display = Recorder::default();

        acq.select(MOVEMENTS[0], Side::Unaffected);
        let handle = acq.start_measurement(&mut display).unwrap();
        wire.borrow_mut().fail_reads = true;
        let handle = expect_continue(acq.tick(handle, &mut display));
        assert_eq!(display.errors(), vec![ErrorKind::ConnectionError]);

        wire.borrow_mut().fail_reads = false;
        feed(&wire, b"ANGLE:5\n");
        clock.advance(DEFAULT_DEADLINE);
        assert_eq!(acq.tick(handle, &mut display), TickOutcome::Complete(Some(5.0)));
    }

    #[test]
    fn undecodable_bytes_are_skipped() {
        let clock = ManualClock::new();
        let (mut acq, wire) = connected(&clock);
        let mut display = Recorder::default();

        acq.select(MOVEMENTS[0], Side::Unaffected);
        let handle = acq.start_measurement(&mut display).unwrap();
        feed(&wire, b"\xff\xfeANGLE:8.5\n");
        clock.advance(DEFAULT_DEADLINE);
        assert_eq!(acq.tick(handle, &mut display), TickOutcome::Complete(Some(8.5)));
        assert!(display.errors().is_empty());
    }

    #[test]
    fn clear_all_resets_slots_and_display() {
        let clock = ManualClock::new();
        let (mut acq, wire) = connected(&clock);
        let mut display = Recorder::default();

        for side in Side::BOTH {
            acq.select(MOVEMENTS[0], side);
            let handle = acq.start_measurement(&mut display).unwrap();
            feed(&wire, b"ANGLE:40\n");
            clock.advance(DEFAULT_DEADLINE);
            let _ = acq.tick(handle, &mut display);
        }

        display.events.clear();
        acq.clear_all(&mut display);

        for side in Side::BOTH {
            assert_eq!(acq.store().snapshot_side(side), [None; 8]);
            assert_eq!(acq.rom(side), RomResult::default());
        }
        assert_eq!(
            display.events,
            vec![
                Event::Live(0.0),
                Event::Rom(Side::Unaffected, RomResult::default()),
                Event::Rom(Side::Affected, RomResult::default()),
            ]
        );
        assert!(acq.is_connected());
    }

    #[test]
    fn custom_deadline() {
        let clock = ManualClock::new();
        let (channel, wire) = ScriptedChannel::new();
        let mut acq = Acquisition::new(&clock).with_deadline(Duration::from_millis(500));
        acq.connect(channel);
        let mut display = Recorder::default();

        acq.select(MOVEMENTS[0], Side::Unaffected);
        let handle = acq.start_measurement(&mut display).unwrap();
        feed(&wire, b"ANGLE:1\n");
        clock.advance(Duration::from_millis(499));
        let handle = expect_continue(acq.tick(handle, &mut display));
        clock.advance(Duration::from_millis(1));
        assert_eq!(acq.tick(handle, &mut display), TickOutcome::Complete(Some(1.0)));
    }

    #[test]
    fn disconnect_closes_channel() {
        let clock = ManualClock::new();
        let (mut acq, wire) = connected(&clock);
        assert!(acq.is_connected());
        acq.disconnect();
        assert!(!acq.is_connected());
        assert!(!wire.borrow().open);
    }
}
