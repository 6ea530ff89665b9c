//! Newline-delimited JSON framing for completion streams
//!
//! Lines are split as raw bytes so that one bad line on the wire never ends
//! the stream. Invalid UTF-8 is decoded lossily, non-JSON text is passed on as
//! a string value, and an over-long record is replaced by a string marker.
//! Downstream, string values surface as unrecognized-event warnings.

use super::{EventStream, InvokeError, InvokeErrorKind};
use bytes::{Buf, BytesMut};
use futures::{StreamExt, TryStreamExt};
use serde_json::Value;
use std::borrow::Cow;
use tokio::io::AsyncRead;
use tokio_util::codec::{Decoder, FramedRead};

/// Longest single record accepted off the wire
pub const MAX_RECORD_BYTES: usize = 4 * 1024 * 1024;

/// Splits a byte stream into JSON records
#[derive(Debug)]
pub struct RecordCodec {
    max_length: usize,
    /// Where the next newline search starts
    next_index: usize,
    /// Skipping the rest of an over-long record
    discarding: bool,
}

impl RecordCodec {
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
            discarding: false,
        }
    }

    fn oversized(&self) -> Value {
        tracing::warn!(max_bytes = self.max_length, "Event record too long, dropping it");
        Value::String(format!(
            "Event record longer than {} bytes was dropped",
            self.max_length
        ))
    }
}

impl Decoder for RecordCodec {
    type Item = Value;
    type Error = std::io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Value>, Self::Error> {
        loop {
            let newline = buf[self.next_index..]
                .iter()
                .position(|b| *b == b'\n')
                .map(|offset| self.next_index + offset);

            match (self.discarding, newline) {
                (true, Some(end)) => {
                    buf.advance(end + 1);
                    self.next_index = 0;
                    self.discarding = false;
                }
                (true, None) => {
                    buf.clear();
                    self.next_index = 0;
                    return Ok(None);
                }
                (false, Some(end)) => {
                    let line = buf.split_to(end + 1);
                    self.next_index = 0;
                    if end > self.max_length {
                        return Ok(Some(self.oversized()));
                    }
                    if let Some(record) = parse_line(&line[..end]) {
                        return Ok(Some(record));
                    }
                }
                (false, None) if buf.len() > self.max_length => {
                    buf.clear();
                    self.next_index = 0;
                    self.discarding = true;
                    return Ok(Some(self.oversized()));
                }
                (false, None) => {
                    self.next_index = buf.len();
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Value>, Self::Error> {
        if let Some(record) = self.decode(buf)? {
            return Ok(Some(record));
        }
        self.next_index = 0;
        if self.discarding {
            self.discarding = false;
            buf.clear();
            return Ok(None);
        }
        let rest = buf.split();
        Ok(parse_line(&rest))
    }
}

/// `None` for blank lines
fn parse_line(line: &[u8]) -> Option<Value> {
    let text = match std::str::from_utf8(line) {
        Ok(text) => Cow::Borrowed(text),
        Err(e) => {
            tracing::warn!(error = %e, len = line.len(), "Event record is not valid UTF-8");
            String::from_utf8_lossy(line)
        }
    };
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(serde_json::from_str(text).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Event record is not JSON");
        Value::String(text.to_string())
    }))
}

/// Split newline-delimited JSON into records.
///
/// Only a failure of the underlying reader ends the stream with an error.
pub(crate) fn ndjson_records<R>(reader: R) -> EventStream
where
    R: AsyncRead + Send + 'static,
{
    FramedRead::new(reader, RecordCodec::new(MAX_RECORD_BYTES))
        .map_err(|e| {
            InvokeError::from_text(
                format!("Failed to read event stream: {e}"),
                InvokeErrorKind::Network,
            )
        })
        .boxed()
}
