use std::{
    collections::VecDeque,
    io::stdout,
    path::Path,
    time::{Duration, Instant},
};

use crate::{
    acquisition::{Acquisition, AcquisitionState, TickOutcome},
    config::Config,
    display::DisplaySink,
    error::ErrorKind,
    gui::error::GuiError,
    movement::{Joint, Movement, Side, MOVEMENTS},
    report::{RonExporter, SessionExporter},
    rom::RomResult,
    scheduler::PollTimer,
    serial_channel::SerialChannel,
};

use crossterm::{
    event::{self, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{
        block::{Position, Title},
        *,
    },
    Terminal,
};

const SERIAL_HISTORY: usize = 200;

/// What the assessment screen shows, fed by the acquisition core.
#[derive(Debug)]
pub struct Screen {
    cursor: usize,
    side: Side,
    live_angle: f64,
    serial_lines: VecDeque<String>,
    status: String,
    last_error: Option<String>,
}

impl Default for Screen {
    fn default() -> Self {
        Self {
            cursor: 0,
            side: Side::Unaffected,
            live_angle: 0.0,
            serial_lines: VecDeque::new(),
            status: "Awaiting movement selection...".to_owned(),
            last_error: None,
        }
    }
}

impl DisplaySink for Screen {
    fn on_session_started(&mut self) {
        self.serial_lines.clear();
        self.last_error = None;
    }

    fn on_line(&mut self, line: &str) {
        if self.serial_lines.len() == SERIAL_HISTORY {
            self.serial_lines.pop_front();
        }
        self.serial_lines.push_back(line.to_owned());
    }

    fn on_live_angle(&mut self, value: f64) {
        self.live_angle = value;
    }

    fn on_final_angle(&mut self, side: Side, movement: &Movement, value: f64) {
        self.status = format!("{} ({}) recorded: {:.1}°", movement, side, value);
    }

    fn on_error(&mut self, kind: ErrorKind, message: &str) {
        self.last_error = Some(format!("{:?}: {}", kind, message));
    }
}

impl Screen {
    fn selected(&self) -> Movement {
        MOVEMENTS[self.cursor]
    }

    /// Applies one key press. Returns `false` when the user wants to quit.
    pub fn handle_key<C: SerialChannel>(
        &mut self,
        code: KeyCode,
        acq: &mut Acquisition<C>,
        timer: &mut PollTimer,
        export: &mut dyn FnMut(&Acquisition<C>) -> Result<String, GuiError>,
    ) -> bool {
        let started = match code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Down => {
                self.cursor = (self.cursor + 1) % MOVEMENTS.len();
                self.select(acq);
                None
            }
            KeyCode::Up => {
                self.cursor = (self.cursor + MOVEMENTS.len() - 1) % MOVEMENTS.len();
                self.select(acq);
                None
            }
            KeyCode::Tab => {
                self.side = self.side.toggled();
                self.select(acq);
                None
            }
            KeyCode::Enter => {
                self.select(acq);
                self.status = format!("Perform {} ({})", self.selected(), self.side);
                Some(acq.start_measurement(self))
            }
            KeyCode::Char('r') => {
                if let Some(selection) = acq.selection() {
                    self.status = format!("Redo {} ({})", selection.movement, selection.side);
                }
                Some(acq.redo(self))
            }
            KeyCode::Char('c') => {
                self.status = "Calibrating...".to_owned();
                Some(acq.calibrate(self))
            }
            KeyCode::Char('x') => {
                acq.clear_all(self);
                self.serial_lines.clear();
                self.status = "All measurements cleared".to_owned();
                None
            }
            KeyCode::Char('e') => {
                match export(acq) {
                    Ok(done) => self.status = done,
                    Err(e) => self.last_error = Some(e.to_string()),
                }
                None
            }
            _ => None,
        };

        match started {
            Some(Ok(handle)) => timer.arm_now(handle, Instant::now()),
            // The error already reached the screen through `on_error`
            Some(Err(_)) => timer.cancel(),
            None => {}
        }
        true
    }

    /// Runs the pending tick, if it is due.
    pub fn poll<C: SerialChannel>(&mut self, acq: &mut Acquisition<C>, timer: &mut PollTimer) {
        let Some(handle) = timer.take_due(Instant::now()) else {
            return;
        };
        let outcome = acq.tick(handle, self);
        self.on_tick(outcome, timer);
    }

    fn on_tick(&mut self, outcome: TickOutcome, timer: &mut PollTimer) {
        match outcome {
            TickOutcome::Continue(next) => timer.rearm(next, Instant::now()),
            TickOutcome::Complete(None) => self.status = "Calibration finished".to_owned(),
            TickOutcome::Complete(Some(_)) | TickOutcome::Aborted(_) | TickOutcome::Stale => {}
        }
    }

    fn select<C: SerialChannel>(&mut self, acq: &mut Acquisition<C>) {
        acq.select(self.selected(), self.side);
    }
}

/// Runs the interactive assessment until the user quits.
pub fn run_assessment<C: SerialChannel>(
    acq: &mut Acquisition<C>,
    config: &Config,
    patient_id: Option<&str>,
    out_dir: &Path,
) -> Result<(), GuiError> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let mut exporter = RonExporter::new(out_dir);
    let mut export = |acq: &Acquisition<C>| -> Result<String, GuiError> {
        let store = acq.store();
        let path = exporter.export_session(
            Side::BOTH.map(|s| store.snapshot_side(s)),
            Side::BOTH.map(|s| store.rom(s)),
            patient_id.unwrap_or_default(),
        )?;
        Ok(format!("Exported {}", path.display()))
    };

    let res = event_loop(&mut terminal, acq, config, &mut export);

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    res
}

fn event_loop<B: Backend, C: SerialChannel>(
    terminal: &mut Terminal<B>,
    acq: &mut Acquisition<C>,
    config: &Config,
    export: &mut dyn FnMut(&Acquisition<C>) -> Result<String, GuiError>,
) -> Result<(), GuiError> {
    let mut screen = Screen::default();
    let mut timer = PollTimer::new(config.poll_interval());
    let frame_time = Duration::from_millis(16);

    loop {
        terminal.draw(|frame| ui(frame, &screen, acq))?;

        let wait = timer
            .time_until_due(Instant::now())
            .map_or(frame_time, |due| due.min(frame_time));
        if event::poll(wait)? {
            if let event::Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press
                    && !screen.handle_key(key.code, acq, &mut timer, export)
                {
                    return Ok(());
                }
            }
        }
        screen.poll(acq, &mut timer);
    }
}

fn fmt_angle(angle: Option<f64>) -> String {
    angle.map_or_else(|| "-".to_owned(), |a| format!("{:.1}", a))
}

fn ui<C: SerialChannel>(frame: &mut Frame, screen: &Screen, acq: &Acquisition<C>) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(12),
            Constraint::Length(8),
            Constraint::Length(3),
        ])
        .split(frame.size());
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[0]);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(6)])
        .split(columns[1]);

    render_movements(frame, columns[0], screen, acq);
    render_live(frame, right[0], screen);
    render_rom(frame, right[1], acq);
    render_serial(frame, rows[1], screen);
    render_status(frame, rows[2], screen, acq);
}

fn render_movements<C: SerialChannel>(
    frame: &mut Frame,
    area: Rect,
    screen: &Screen,
    acq: &Acquisition<C>,
) {
    let store = acq.store();
    let rows = MOVEMENTS.iter().map(|m| {
        Row::new(vec![
            m.name.to_owned(),
            fmt_angle(store.get_slot(Side::Unaffected, m.index)),
            fmt_angle(store.get_slot(Side::Affected, m.index)),
        ])
    });
    let title = Title::from(Span::styled(
        format!(" Movements, side: {} ", screen.side),
        Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
    ));
    let table = Table::new(
        rows,
        [
            Constraint::Percentage(50),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ],
    )
    .header(Row::new(vec!["Movement", "Unaffected", "Affected"]).style(Style::default().add_modifier(Modifier::BOLD)))
    .highlight_symbol(">>")
    .highlight_style(Style::default().fg(Color::Magenta))
    .block(Block::default().title(title).borders(Borders::ALL));

    let mut state = TableState::default().with_selected(Some(screen.cursor));
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_live(frame: &mut Frame, area: Rect, screen: &Screen) {
    let gauge = Gauge::default()
        .block(Block::default().title(" Live angle ").borders(Borders::ALL))
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(gauge_ratio(screen.live_angle))
        .label(format!("{:.1}°", screen.live_angle));
    frame.render_widget(gauge, area);
}

fn gauge_ratio(angle: f64) -> f64 {
    if angle.is_finite() {
        (angle / 180.0).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn render_rom<C: SerialChannel>(frame: &mut Frame, area: Rect, acq: &Acquisition<C>) {
    let [unaffected, affected]: [RomResult; 2] = Side::BOTH.map(|s| acq.rom(s));
    let rows = Joint::ALL.iter().map(|&joint| {
        Row::new(vec![
            joint.rom_label().to_owned(),
            format!("{:.1}", unaffected.get(joint)),
            format!("{:.1}", affected.get(joint)),
        ])
    });
    let table = Table::new(
        rows,
        [
            Constraint::Percentage(50),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ],
    )
    .header(Row::new(vec!["ROM", "Unaffected", "Affected"]).style(Style::default().add_modifier(Modifier::BOLD)))
    .block(Block::default().title(" Range of motion ").borders(Borders::ALL));
    frame.render_widget(table, area);
}

fn render_serial(frame: &mut Frame, area: Rect, screen: &Screen) {
    let visible = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = screen
        .serial_lines
        .iter()
        .skip(screen.serial_lines.len().saturating_sub(visible))
        .map(|l| Line::from(l.as_str()))
        .collect();
    let paragraph =
        Paragraph::new(lines).block(Block::default().title(" Serial ").borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

fn render_status<C: SerialChannel>(
    frame: &mut Frame,
    area: Rect,
    screen: &Screen,
    acq: &Acquisition<C>,
) {
    let connection = if acq.is_connected() {
        "Connected".green()
    } else {
        "Disconnected".red()
    };
    let activity = match acq.state() {
        AcquisitionState::Polling(_) => " [reading]".yellow(),
        _ => "".into(),
    };
    let mut spans = vec![connection, activity, "  ".into(), screen.status.clone().into()];
    if let Some(err) = &screen.last_error {
        spans.push("  ".into());
        spans.push(Span::styled(
            err.clone(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }
    let instructions = Title::from(Line::from(vec![
        " Move ".into(),
        "<Up>/<Down>".magenta().bold(),
        " Side ".into(),
        "<Tab>".magenta().bold(),
        " Measure ".into(),
        "<Enter>".magenta().bold(),
        " Redo ".into(),
        "<R>".magenta().bold(),
        " Calibrate ".into(),
        "<C>".magenta().bold(),
        " Clear ".into(),
        "<X>".magenta().bold(),
        " Export ".into(),
        "<E>".magenta().bold(),
        " Quit ".into(),
        "<Q> ".magenta().bold(),
    ]));
    let block = Block::default()
        .title(
            instructions
                .alignment(Alignment::Center)
                .position(Position::Bottom),
        )
        .borders(Borders::ALL);
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}
