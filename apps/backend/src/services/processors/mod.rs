//! Source-material processors.

pub mod pdf;
pub mod video;

use std::path::PathBuf;

use thiserror::Error;

pub use pdf::{PdfDocument, PdfPage, PdfProcessor};
pub use video::{VideoContent, VideoInfo, VideoProcessor};

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Could not read PDF: {0}")]
    Pdf(String),

    #[error("{tool} failed: {message}")]
    Tool { tool: &'static str, message: String },

    #[error("Transcription failed: {0}")]
    Transcription(#[from] crate::services::llm::LlmError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
