//! Terminal front-end for running an assessment.

mod assessment;
mod device_selector;
mod error;

pub use assessment::{run_assessment, Screen};
pub use device_selector::device_selector;
pub use error::GuiError;
