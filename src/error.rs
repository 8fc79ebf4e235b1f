use std::time::Duration;
use thiserror::Error;

/// Structural failures while filling the form. All of them are fatal for the
/// run: the form is expected to be stable, so a mismatch needs a human.
#[derive(Debug, Error, PartialEq)]
pub enum FillError {
    #[error("Question not found on page: {0}")]
    NotFound(String),

    #[error("No control labelled '{label}' in question: {question}")]
    ControlNotFound { question: String, label: String },

    #[error("No rows detected in rating matrix: {0}")]
    NoRows(String),

    #[error("No columns (radios) detected in rating matrix: {0}")]
    NoColumns(String),

    #[error("No button named any of {0:?}")]
    ButtonNotFound(Vec<String>),

    #[error("Timed out after {timeout:?} clicking {target}")]
    ClickTimeout { target: String, timeout: Duration },
}
