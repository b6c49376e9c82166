//! Event-stream framing of multiplexed events, and the matching client decoder.
//!
//! On the wire every event is one `data: <json>\n\n` record; the stream ends
//! with a `data: [DONE]\n\n` sentinel.

use axum::response::sse::Event;

use crate::domain::{DomainError, StreamEvent};
use crate::infrastructure::sse::{SseData, SseLineBuffer};

pub const DONE_SENTINEL: &str = "[DONE]";

/// Frame one event as an SSE `data:` record
pub fn to_sse_event(event: &StreamEvent) -> Result<Event, DomainError> {
    Event::default()
        .json_data(event)
        .map_err(|e| DomainError::internal(format!("Failed to encode stream event: {}", e)))
}

/// The record closing every stream
pub fn done_event() -> Event {
    Event::default().data(DONE_SENTINEL)
}

/// A record recovered from the event stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedRecord {
    Event(StreamEvent),
    Done,
    /// A `data:` line whose payload is not a valid event
    Malformed { line: String, reason: String },
}

/// Incremental decoder for response bodies of `/chat/stream`.
///
/// Chunks may split records, lines or UTF-8 sequences anywhere; the
/// incomplete remainder is held until the next `push`. Malformed records
/// are reported and decoding carries on.
#[derive(Debug, Default)]
pub struct EventStreamDecoder {
    lines: SseLineBuffer,
}

impl EventStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<DecodedRecord> {
        self.lines.push(chunk).into_iter().map(decode).collect()
    }

    /// Decode whatever is left once the body has ended
    pub fn finish(&mut self) -> Option<DecodedRecord> {
        self.lines.finish().map(decode)
    }
}

fn decode(data: SseData) -> DecodedRecord {
    match data {
        SseData::Done => DecodedRecord::Done,
        SseData::Overflow { limit } => DecodedRecord::Malformed {
            line: String::new(),
            reason: format!("record exceeds {} bytes", limit),
        },
        SseData::Payload(payload) => match serde_json::from_str::<StreamEvent>(&payload) {
            Ok(event) => DecodedRecord::Event(event),
            Err(e) => DecodedRecord::Malformed {
                line: payload,
                reason: e.to_string(),
            },
        },
    }
}
