//! Fixed-size overlapping windows over document text.
//!
//! Windows are cut at character offsets with no regard for sentence or
//! paragraph boundaries, so a chunk is only a coarse approximation of a
//! semantic unit. The overlap keeps text that straddles a cut visible in both
//! neighbouring chunks.

use serde::{Deserialize, Serialize};

use super::DocumentError;
use super::types::{Chunk, Document};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// Window length in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive windows. Must be smaller than `chunk_size`.
    pub chunk_overlap: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
        }
    }
}

impl SplitterConfig {
    /// # Errors
    ///
    /// Returns `DocumentError::InvalidChunkConfig` when `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`, since the window would never advance.
    pub fn validate(&self) -> Result<(), DocumentError> {
        if self.chunk_size == 0 || self.chunk_overlap >= self.chunk_size {
            return Err(DocumentError::InvalidChunkConfig {
                chunk_size: self.chunk_size,
                chunk_overlap: self.chunk_overlap,
            });
        }
        Ok(())
    }

    /// Distance between the starts of consecutive windows.
    #[must_use]
    pub fn step(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: SplitterConfig,
}

impl TextSplitter {
    /// # Errors
    ///
    /// Fails fast on an invalid [`SplitterConfig`].
    pub fn new(config: SplitterConfig) -> Result<Self, DocumentError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> SplitterConfig {
        self.config
    }

    #[must_use]
    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        self.split_text(&document.content)
            .into_iter()
            .enumerate()
            .map(|(i, content)| Chunk {
                content,
                metadata: document.metadata.clone(),
                chunk_index: i,
            })
            .collect()
    }

    /// Emit `text[start..start + size]` for `start = 0, step, 2 * step, ...` while
    /// `start` is inside the text. The last window may be shorter than `size`.
    #[must_use]
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        let step = self.config.step();
        let mut chunks = Vec::with_capacity(text.chars().count().div_ceil(step));
        let mut start = 0;
        while start < text.len() {
            let end = advance(text, start, self.config.chunk_size);
            chunks.push(text[start..end].to_owned());
            start = advance(text, start, step);
        }
        chunks
    }
}

/// Byte offset `chars` characters past `from`, clamped to the end of `text`.
fn advance(text: &str, from: usize, chars: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(chars)
        .map_or(text.len(), |(i, _)| from + i)
}

/// Split `text` into overlapping windows of `size` characters.
///
/// # Errors
///
/// Returns `DocumentError::InvalidChunkConfig` when `size == 0` or `overlap >= size`.
pub fn chunk(text: &str, size: usize, overlap: usize) -> Result<Vec<String>, DocumentError> {
    let splitter = TextSplitter::new(SplitterConfig {
        chunk_size: size,
        chunk_overlap: overlap,
    })?;
    Ok(splitter.split_text(text))
}
