//! Stream demultiplexer for the mixed content/control chunk stream.
//!
//! The remote endpoint interleaves answer text with whole-chunk JSON
//! control objects on one `text/plain` stream. The demultiplexer is a pure
//! per-chunk transform: it never buffers beyond the chunk in hand and
//! emits events in strict arrival order.

use inlet_core::{ControlMessage, StatusData, StreamEvent};

/// Splits raw text chunks into typed stream events.
///
/// Exactly one hidden `Answering` status is emitted, immediately before
/// the first content chunk. Chunks that look like control objects but do
/// not decode (malformed JSON, unrecognized `type`) are reclassified as
/// content rather than surfaced as errors.
#[derive(Debug, Default)]
pub struct Demultiplexer {
    content_started: bool,
}

impl Demultiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one raw chunk, returning the events it produces in order.
    pub fn feed(&mut self, chunk: &str) -> Vec<StreamEvent> {
        if chunk.is_empty() {
            return Vec::new();
        }

        if let Some(control) = decode_control(chunk) {
            return vec![match control {
                ControlMessage::Status(data) => StreamEvent::Status(data),
                ControlMessage::Citation(data) => StreamEvent::Citation(data),
            }];
        }

        if !self.content_started {
            self.content_started = true;
            return vec![
                StreamEvent::Status(StatusData::new("Answering", false, true)),
                StreamEvent::Content(chunk.to_owned()),
            ];
        }
        vec![StreamEvent::Content(chunk.to_owned())]
    }
}

/// Incremental UTF-8 decoding over transport frames.
///
/// A frame can end in the middle of a multibyte character; the dangling
/// prefix is carried into the next frame instead of being replaced with
/// U+FFFD. Truly invalid bytes still become replacement characters.
#[derive(Debug, Default)]
pub struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next frame, prepending any bytes held over from the
    /// previous one.
    pub fn push(&mut self, bytes: &[u8]) -> String {
        let mut buf = std::mem::take(&mut self.pending);
        buf.extend_from_slice(bytes);

        let mut out = String::with_capacity(buf.len());
        let mut rest: &[u8] = &buf;
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&rest[..valid]));
                    match e.error_len() {
                        // Invalid sequence: replace it and keep going.
                        Some(len) => {
                            out.push('\u{FFFD}');
                            rest = &rest[valid + len..];
                        }
                        // Incomplete tail: hold it for the next frame.
                        None => {
                            self.pending = rest[valid..].to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush bytes still pending at end-of-stream. A truncated character
    /// at that point has no continuation coming and decays to U+FFFD.
    pub fn finish(&mut self) -> String {
        let pending = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&pending).into_owned()
    }
}

/// The wire heuristic: trimmed chunk starts with `{`, ends with `}`, parses
/// as JSON, and carries a recognized `type`. Anything else is content.
fn decode_control(chunk: &str) -> Option<ControlMessage> {
    let trimmed = chunk.trim();
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}
