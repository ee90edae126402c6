//! Greedy word packing of long text into prompt-sized chunks.
//!
//! Each word is accounted as its character length plus one separating
//! space, so a chunk holding two or more words always stays strictly below
//! the budget. A single word longer than the budget becomes a chunk on its
//! own.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::SplitWhitespace;

/// Default character budget per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 2000;

/// A bounded run of words joined by single spaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextChunk(String);

impl TextChunk {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn word_count(&self) -> usize {
        self.0.split(' ').count()
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.0.split(' ')
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for TextChunk {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TextChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lazy chunk iterator. Cloning it yields an independent iterator that
/// restarts from the same position.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    words: SplitWhitespace<'a>,
    pending: Option<&'a str>,
    budget: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = TextChunk;

    fn next(&mut self) -> Option<TextChunk> {
        let mut current = String::new();
        let mut size = 0;
        let mut count = 0;

        while let Some(word) = self.pending.take().or_else(|| self.words.next()) {
            let word_size = word.chars().count() + 1;
            if count > 0 && size + word_size > self.budget {
                self.pending = Some(word);
                break;
            }
            if count > 0 {
                current.push(' ');
            }
            current.push_str(word);
            size += word_size;
            count += 1;
        }

        (count > 0).then(|| TextChunk(current))
    }
}

/// Iterate over the chunks of `text` under a character `budget`.
pub fn chunks(text: &str, budget: usize) -> Chunks<'_> {
    Chunks {
        words: text.split_whitespace(),
        pending: None,
        budget,
    }
}

/// Split `text` into chunks of at most `budget` characters.
pub fn chunk_text(text: &str, budget: usize) -> Vec<TextChunk> {
    chunks(text, budget).collect()
}

/// The first `max_chars` characters of `text`, cut on a char boundary.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
