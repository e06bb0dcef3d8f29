use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // External search service.
    #[error("Reqwest Error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("Unexpected response from {url}: {reason}")]
    UnexpectedResponse { url: String, reason: String },

    // Persistence.
    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Csv Error: {0}")]
    Csv(#[from] csv::Error),
    #[error("No `id` column in {}", .0.display())]
    MissingIdColumn(PathBuf),
}

impl Error {
    /// True for failures raised by the search service rather than local storage or input.
    pub fn is_external(&self) -> bool {
        matches!(self, Error::Reqwest(_) | Error::UnexpectedResponse { .. })
    }
}
