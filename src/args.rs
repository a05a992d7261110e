// Commandline argument parser using clap for MedMove

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::movement::Side;

#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct MedMoveArgs {
    #[command(subcommand)]
    /// What to do; an interactive assessment when omitted
    pub command: Option<CommandTask>,

    /// RON file with serial and timing settings
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Serial port the goniometer is attached to. Asked for interactively
    /// when omitted
    #[arg(short = 'p', long = "port", global = true)]
    pub port: Option<PathBuf>,

    /// Talk to a simulated goniometer instead of a serial port
    #[arg(long = "simulate", global = true)]
    pub simulate: bool,

    /// Patient identifier used when exporting a report
    #[arg(long = "patient", global = true)]
    pub patient_id: Option<String>,

    /// Directory reports are exported into
    #[arg(short = 'o', long = "out", global = true, default_value = ".")]
    pub out_dir: PathBuf,
}

#[derive(Debug, Subcommand, Clone)]
pub enum CommandTask {
    /// List the serial ports on this machine
    #[command(about)]
    Ports,

    /// Take a single measurement and print the result
    #[command(about)]
    Measure(MeasureCommand),

    /// Put the device in calibration mode and print the live values
    #[command(about)]
    Calibrate,

    /// Run the interactive assessment screen
    #[command(about)]
    Assess,
}

#[derive(Debug, Args, Clone)]
#[command(about)]
pub struct MeasureCommand {
    /// Movement to measure, e.g. "wrist-flexion"
    pub movement: String,

    /// Side to measure on, `unaffected` or `affected`
    pub side: Side,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_measure() {
        let args = MedMoveArgs::parse_from([
            "medmove",
            "--simulate",
            "measure",
            "wrist-flexion",
            "affected",
            "--patient",
            "P-1",
        ]);
        assert!(args.simulate);
        assert_eq!(args.patient_id.as_deref(), Some("P-1"));
        match args.command {
            Some(CommandTask::Measure(m)) => {
                assert_eq!(m.movement, "wrist-flexion");
                assert_eq!(m.side, Side::Affected);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn defaults_to_assess() {
        let args = MedMoveArgs::parse_from(["medmove", "--port", "/dev/ttyUSB0"]);
        assert!(args.command.is_none());
        assert_eq!(args.port, Some(PathBuf::from("/dev/ttyUSB0")));
        assert_eq!(args.out_dir, PathBuf::from("."));
    }

    #[test]
    fn rejects_bad_side() {
        assert!(MedMoveArgs::try_parse_from(["medmove", "measure", "wrist-flexion", "left"]).is_err());
    }
}
