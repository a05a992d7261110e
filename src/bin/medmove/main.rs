//! Command-line front-end for the MedMove goniometer.

use clap::Parser;
use log::{debug, error, info};
use medmove::{
    acquisition::{Acquisition, TickOutcome},
    args::{CommandTask, MeasureCommand, MedMoveArgs},
    config::Config,
    display::{DisplaySink, LogDisplay},
    dummy_device::DummyGoniometer,
    error::ErrorKind,
    gui::{device_selector, run_assessment},
    movement::{Joint, Movement, Side, MOVEMENTS},
    report::{RonExporter, SessionExporter},
    rom::RomResult,
    scheduler::{PollTimer, TickHandle},
    serial_channel::{available_ports, SerialChannel, SerialPortChannel},
};
use std::{
    error::Error,
    process::ExitCode,
    time::{Duration, Instant},
};

// Example:
// cargo run --bin medmove -- --simulate measure wrist-flexion unaffected
// cargo run --bin medmove -- --port /dev/ttyUSB0 --patient P-017 assess

type Channel = Box<dyn SerialChannel>;

fn main() -> ExitCode {
    env_logger::init();
    let args = MedMoveArgs::parse();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            eprintln!("medmove: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: MedMoveArgs) -> Result<ExitCode, Box<dyn Error>> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    debug!("Using {:?}", config);

    let command = args.command.clone().unwrap_or(CommandTask::Assess);
    if let CommandTask::Ports = command {
        for port in available_ports()? {
            println!("{}", port.to_string_lossy());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let Some(channel) = open_channel(&args, &config)? else {
        println!("No device selected");
        return Ok(ExitCode::SUCCESS);
    };
    let mut acq = Acquisition::with_system_clock().with_deadline(config.deadline());
    acq.connect(channel);

    let code = match command {
        CommandTask::Measure(m) => measure(&mut acq, &config, &args, m)?,
        CommandTask::Calibrate => calibrate(&mut acq, &config)?,
        CommandTask::Assess | CommandTask::Ports => {
            run_assessment(&mut acq, &config, args.patient_id.as_deref(), &args.out_dir)?;
            ExitCode::SUCCESS
        }
    };
    acq.disconnect();
    Ok(code)
}

fn open_channel(args: &MedMoveArgs, config: &Config) -> Result<Option<Channel>, Box<dyn Error>> {
    if args.simulate {
        info!("Using the simulated goniometer");
        return Ok(Some(Box::new(DummyGoniometer::new())));
    }

    let port = match &args.port {
        Some(port) => port.clone(),
        None => match device_selector(available_ports()?)? {
            Some(port) => port,
            None => return Ok(None),
        },
    };
    let channel = SerialPortChannel::open(&port, config.baud_rate, config.drain_timeout())
        .map_err(|e| format!("could not open {}: {}", port.display(), e))?;
    Ok(Some(Box::new(channel)))
}

/// Prints what a headless run needs to show; everything else goes to the log.
#[derive(Debug, Default)]
struct ConsoleDisplay {
    log: LogDisplay,
    show_live: bool,
}

impl DisplaySink for ConsoleDisplay {
    fn on_line(&mut self, line: &str) {
        self.log.on_line(line);
    }

    fn on_live_angle(&mut self, value: f64) {
        if self.show_live {
            println!("{:>7.1}°", value);
        }
    }

    fn on_final_angle(&mut self, side: Side, movement: &Movement, value: f64) {
        println!("{} ({}): {:.1}°", movement, side, value);
    }

    fn on_rom(&mut self, side: Side, rom: &RomResult) {
        self.log.on_rom(side, rom);
    }

    fn on_error(&mut self, kind: ErrorKind, message: &str) {
        eprintln!("{:?}: {}", kind, message);
    }
}

/// Ticks the acquisition on the configured cadence until it finishes.
fn drive(
    acq: &mut Acquisition<Channel>,
    first: TickHandle,
    interval: Duration,
    display: &mut ConsoleDisplay,
) -> TickOutcome {
    let mut timer = PollTimer::new(interval);
    timer.arm_now(first, Instant::now());
    loop {
        if let Some(wait) = timer.time_until_due(Instant::now()) {
            spin_sleep::sleep(wait);
        }
        let Some(handle) = timer.take_due(Instant::now()) else {
            continue;
        };
        match acq.tick(handle, display) {
            TickOutcome::Continue(next) => timer.rearm(next, Instant::now()),
            outcome => return outcome,
        }
    }
}

fn measure(
    acq: &mut Acquisition<Channel>,
    config: &Config,
    args: &MedMoveArgs,
    cmd: MeasureCommand,
) -> Result<ExitCode, Box<dyn Error>> {
    let movement = Movement::from_name(&cmd.movement).ok_or_else(|| {
        let names: Vec<&str> = MOVEMENTS.iter().map(|m| m.name).collect();
        format!(
            "unknown movement `{}`, expected one of: {}",
            cmd.movement,
            names.join(", ")
        )
    })?;

    let mut display = ConsoleDisplay::default();
    acq.select(*movement, cmd.side);
    println!("Perform {} ({})", movement, cmd.side);
    let Ok(first) = acq.start_measurement(&mut display) else {
        return Ok(ExitCode::FAILURE);
    };

    match drive(acq, first, config.poll_interval(), &mut display) {
        TickOutcome::Complete(Some(_)) => {}
        _ => return Ok(ExitCode::FAILURE),
    }

    for side in Side::BOTH {
        let rom = acq.rom(side);
        let values: Vec<String> = Joint::ALL
            .iter()
            .map(|&j| format!("{} {:.1}", j.rom_label(), rom.get(j)))
            .collect();
        println!("{}: {}", side, values.join(", "));
    }

    if let Some(patient_id) = &args.patient_id {
        let store = acq.store();
        let path = RonExporter::new(&args.out_dir).export_session(
            Side::BOTH.map(|s| store.snapshot_side(s)),
            Side::BOTH.map(|s| store.rom(s)),
            patient_id,
        )?;
        println!("Report written to {}", path.display());
    }

    Ok(ExitCode::SUCCESS)
}

fn calibrate(acq: &mut Acquisition<Channel>, config: &Config) -> Result<ExitCode, Box<dyn Error>> {
    let mut display = ConsoleDisplay {
        show_live: true,
        ..ConsoleDisplay::default()
    };
    println!("Calibrating, hold the device still");
    let Ok(first) = acq.calibrate(&mut display) else {
        return Ok(ExitCode::FAILURE);
    };
    match drive(acq, first, config.poll_interval(), &mut display) {
        TickOutcome::Complete(None) => {
            println!("Calibration finished");
            Ok(ExitCode::SUCCESS)
        }
        _ => Ok(ExitCode::FAILURE),
    }
}
