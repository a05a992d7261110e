use std::{error::Error, fmt::Display};

use crate::report::ExportError;

/// Errors the terminal front-end can hit.
#[derive(Debug)]
pub enum GuiError {
    /// Terminal io failed
    IOError(std::io::Error),
    /// A report could not be exported
    ExportError(ExportError),
}

impl Display for GuiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GuiError::IOError(e) => write!(f, "terminal error: {}", e),
            GuiError::ExportError(e) => write!(f, "export failed: {}", e),
        }
    }
}

impl Error for GuiError {}

impl From<std::io::Error> for GuiError {
    fn from(value: std::io::Error) -> Self {
        Self::IOError(value)
    }
}

impl From<ExportError> for GuiError {
    fn from(value: ExportError) -> Self {
        Self::ExportError(value)
    }
}
