use l2dkit::{manifest::conf::ConfError, offset::OffsetError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Processing failed: {0}")]
    Process(String),

    #[error("Filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Offset calculation failed: {0}")]
    Offset(#[from] OffsetError),

    #[error("Invalid stage script: {0}")]
    Conf(#[from] ConfError),

    #[error("Preferences error: {0}")]
    Preferences(String),

    #[error("General error: {0}")]
    General(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Process(format!("{error:#}"))
    }
}

/// The UI layer receives errors as plain strings.
impl From<AppError> for String {
    fn from(error: AppError) -> Self {
        error.to_string()
    }
}
