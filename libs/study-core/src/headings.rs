//! Heading detection for extracted document text.
//!
//! This is a formatting heuristic, not a classifier: a trimmed line counts
//! as a heading when it is non-empty, shorter than [`MAX_HEADING_CHARS`],
//! does not end with a period and contains an uppercase character.

/// Lines of this many characters or more are never headings.
pub const MAX_HEADING_CHARS: usize = 100;

/// Whether a single line looks like a heading.
pub fn is_heading(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty()
        && line.chars().count() < MAX_HEADING_CHARS
        && !line.ends_with('.')
        && line.chars().any(char::is_uppercase)
}

/// Collect candidate headings in document order.
pub fn extract_headings(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| is_heading(line))
        .map(str::to_string)
        .collect()
}
