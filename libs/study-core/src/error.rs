use thiserror::Error;

/// Errors from rendering artifacts.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output was not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl<W> From<csv::IntoInnerError<W>> for ExportError {
    fn from(err: csv::IntoInnerError<W>) -> Self {
        Self::Io(err.into_error())
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
