//! Running answer assembled from `chunk` events

use crate::trace::{DisplayFragment, StepKind};
use serde_json::json;
use thiserror::Error;

/// Shown after the partial answer while the stream is still open
pub const CURSOR: char = '▌';

#[derive(Debug, Error)]
#[error("chunk is not valid UTF-8: {source}")]
pub struct ChunkError {
    pub bytes: Vec<u8>,
    source: std::str::Utf8Error,
}

impl ChunkError {
    /// Warning fragment preserving the offending bytes
    pub fn to_fragment(&self) -> DisplayFragment {
        DisplayFragment::warning(
            StepKind::Chunk,
            format!("Could not decode answer chunk ({})", self.source),
            json!({
                "bytes": self.bytes,
                "lossy_text": String::from_utf8_lossy(&self.bytes),
            }),
        )
    }
}

/// Append-only answer for one turn
#[derive(Debug, Default)]
pub struct Accumulator {
    answer: String,
    chunks: usize,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode and append one chunk, returning the text it added
    pub fn push_chunk<'a>(&mut self, bytes: &'a [u8]) -> Result<&'a str, ChunkError> {
        let text = std::str::from_utf8(bytes).map_err(|source| ChunkError {
            bytes: bytes.to_vec(),
            source,
        })?;
        self.answer.push_str(text);
        self.chunks += 1;
        Ok(text)
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// Partial answer as displayed while streaming
    pub fn with_cursor(&self) -> String {
        format!("{}{CURSOR}", self.answer)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    pub fn into_answer(self) -> String {
        self.answer
    }
}
