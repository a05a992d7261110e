//! Session reports.
//!
//! A report carries the patient id, every movement's angle for both sides
//! and the four ROM values per side. How it is laid out on disk is up to the
//! [`SessionExporter`]; [`RonExporter`] writes it as pretty [ron].

use serde::{Deserialize, Serialize};
use std::{
    borrow::Cow,
    fmt, fs,
    path::{Path, PathBuf},
};

use crate::{
    movement::{Joint, Side, MOVEMENTS},
    rom::RomResult,
    session_store::{SessionStore, SideSlots},
};

/// One movement's angles. `None` where nothing was measured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementRow {
    /// Movement name
    pub movement: String,
    /// Angle on the unaffected side
    pub unaffected: Option<f64>,
    /// Angle on the affected side
    pub affected: Option<f64>,
}

/// One joint's ROM on both sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RomRow {
    /// ROM label, e.g. "ROM Elbow"
    pub rom: String,
    /// ROM on the unaffected side
    pub unaffected: f64,
    /// ROM on the affected side
    pub affected: f64,
}

/// Everything an exported assessment contains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    /// Who was assessed
    pub patient_id: String,
    /// Eight rows, in movement order
    pub movements: Vec<MovementRow>,
    /// Four rows, in joint order
    pub rom: Vec<RomRow>,
}

impl SessionReport {
    /// Builds a report from both sides' slots and ROM. The patient id is
    /// trimmed and must not be empty. It names the exported file, so path
    /// separators, `..` and control characters are refused.
    pub fn new(
        patient_id: &str,
        slots: [SideSlots; 2],
        rom: [RomResult; 2],
    ) -> Result<Self, ExportError> {
        let patient_id = patient_id.trim();
        if patient_id.is_empty() {
            return Err(ExportError::MissingPatientId);
        }
        if !is_file_name_safe(patient_id) {
            return Err(ExportError::InvalidPatientId(patient_id.to_owned()));
        }

        let [unaffected, affected] = slots;
        let movements = MOVEMENTS
            .iter()
            .map(|m| MovementRow {
                movement: m.name.to_owned(),
                unaffected: unaffected[m.index],
                affected: affected[m.index],
            })
            .collect();

        let rom = Joint::ALL
            .iter()
            .map(|&joint| RomRow {
                rom: joint.rom_label().to_owned(),
                unaffected: rom[Side::Unaffected.index()].get(joint),
                affected: rom[Side::Affected.index()].get(joint),
            })
            .collect();

        Ok(Self {
            patient_id: patient_id.to_owned(),
            movements,
            rom,
        })
    }

    /// Builds a report from the current state of a session.
    pub fn from_store(patient_id: &str, store: &SessionStore) -> Result<Self, ExportError> {
        Self::new(
            patient_id,
            Side::BOTH.map(|side| store.snapshot_side(side)),
            Side::BOTH.map(|side| store.rom(side)),
        )
    }

    /// The file name a report for this patient is saved under by default.
    pub fn default_file_name(&self) -> String {
        format!("{}_DiagnosticTest.ron", self.patient_id)
    }

}

fn is_file_name_safe(patient_id: &str) -> bool {
    !patient_id.contains("..")
        && !patient_id
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control())
}

/// Something that turns a session into a report artifact.
pub trait SessionExporter {
    /// What exporting produces, e.g. the path written.
    type Output;

    /// Exports both sides' slots and ROM for `patient_id`.
    fn export_session(
        &mut self,
        slots: [SideSlots; 2],
        rom: [RomResult; 2],
        patient_id: &str,
    ) -> Result<Self::Output, ExportError>;
}

/// Writes reports as pretty-printed RON files into a directory.
#[derive(Debug, Clone)]
pub struct RonExporter {
    dir: PathBuf,
}

impl RonExporter {
    /// Exports into `dir`, which must exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Writes `report` to `path`.
    pub fn write(report: &SessionReport, path: impl AsRef<Path>) -> Result<(), ExportError> {
        let text = ron::ser::to_string_pretty(report, ron::ser::PrettyConfig::default())?;
        fs::write(path, text)?;
        Ok(())
    }
}

impl SessionExporter for RonExporter {
    type Output = PathBuf;

    fn export_session(
        &mut self,
        slots: [SideSlots; 2],
        rom: [RomResult; 2],
        patient_id: &str,
    ) -> Result<PathBuf, ExportError> {
        let report = SessionReport::new(patient_id, slots, rom)?;
        let path = self.dir.join(report.default_file_name());
        Self::write(&report, &path)?;
        log::info!("Exported report to {}", path.display());
        Ok(path)
    }
}

/// Returned when a report cannot be produced.
#[derive(Debug)]
pub enum ExportError {
    /// Returned when the patient id is empty.
    MissingPatientId,

    /// Returned when the patient id cannot be used in a file name.
    InvalidPatientId(String),

    /// Returned when io fails when reading or writing reports.
    IoError(std::io::Error),

    /// Returned when serialization of the report fails.
    RonError(ron::Error),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ExportError as EE;
        let msg = match self {
            EE::MissingPatientId => Cow::from("please enter a patient ID"),
            EE::InvalidPatientId(id) => Cow::from(format!(
                "patient ID `{}` may not contain path separators, `..` or control characters",
                id.escape_debug()
            )),
            EE::IoError(error) => Cow::from(format!("io error: {}", error)),
            EE::RonError(error) => Cow::from(format!("ron error: {}", error)),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for ExportError {}

impl From<std::io::Error> for ExportError {
    fn from(value: std::io::Error) -> Self {
        Self::IoError(value)
    }
}

impl From<ron::Error> for ExportError {
    fn from(value: ron::Error) -> Self {
        Self::RonError(value)
    }
}
