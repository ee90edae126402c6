//! Core study-material logic shared by the pipeline and the web API.
//!
//! Everything here is pure: chunking, heading detection, review scheduling,
//! quiz grading, reshaping of model output, and artifact rendering.

/// Append a formatted line to a `String`.
macro_rules! push_line {
    ($out:expr, $($arg:tt)*) => {{
        $out.push_str(&format!($($arg)*));
        $out.push('\n');
    }};
}

pub mod chunker;
pub mod diagram;
pub mod error;
pub mod export;
pub mod grading;
pub mod headings;
pub mod reshape;
pub mod schedule;
pub mod types;

pub use chunker::{chunk_text, chunks, excerpt, Chunks, TextChunk, DEFAULT_CHUNK_SIZE};
pub use error::ExportError;
pub use grading::grade_quiz;
pub use headings::extract_headings;
pub use schedule::{build_schedule, ReviewBucket, ReviewSchedule, ScheduledReview};
pub use types::*;
