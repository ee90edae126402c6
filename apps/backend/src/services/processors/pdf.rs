//! PDF text extraction.

use std::path::Path;

use serde::Serialize;
use study_core::{chunk_text, extract_headings, TextChunk};

use super::ProcessorError;

/// Form feed separates pages in `pdf-extract` output.
const PAGE_BREAK: char = '\x0C';

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PdfPage {
    pub page_number: usize,
    pub text: String,
}

/// Text pulled from one PDF.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PdfDocument {
    pub file_name: String,
    pub num_pages: usize,
    /// Non-empty pages joined by blank lines.
    pub text: String,
    pub pages: Vec<PdfPage>,
}

impl PdfDocument {
    /// Split raw extracted text into pages.
    pub fn from_extracted(file_name: impl Into<String>, raw: &str) -> Self {
        let all_pages: Vec<&str> = raw.split(PAGE_BREAK).collect();
        let num_pages = if raw.ends_with(PAGE_BREAK) {
            all_pages.len() - 1
        } else {
            all_pages.len()
        };

        let mut text = String::new();
        let mut pages = Vec::new();
        for (idx, page) in all_pages.iter().enumerate().take(num_pages) {
            let page_text = page.trim();
            if page_text.is_empty() {
                continue;
            }
            text.push_str(page_text);
            text.push_str("\n\n");
            pages.push(PdfPage {
                page_number: idx + 1,
                text: page_text.to_string(),
            });
        }

        Self {
            file_name: file_name.into(),
            num_pages,
            text,
            pages,
        }
    }

    pub fn headings(&self) -> Vec<String> {
        extract_headings(&self.text)
    }

    pub fn chunks(&self, budget: usize) -> Vec<TextChunk> {
        chunk_text(&self.text, budget)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfProcessor;

impl PdfProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Extract text from the PDF at `path`. Parsing runs on the blocking pool.
    pub async fn extract_text(&self, path: &Path) -> Result<PdfDocument, ProcessorError> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(ProcessorError::NotFound(path.to_path_buf()));
        }

        let bytes = tokio::fs::read(path).await?;
        let raw = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| ProcessorError::Pdf(e.to_string()))?
            .map_err(|e| ProcessorError::Pdf(e.to_string()))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let document = PdfDocument::from_extracted(file_name, &raw);

        tracing::info!(
            "Extracted {} characters from {} pages of {}",
            document.text.chars().count(),
            document.num_pages,
            document.file_name
        );
        Ok(document)
    }
}
