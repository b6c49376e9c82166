//! Chat-completions streaming: turn `data:` chunks into text fragments

use futures::StreamExt;
use serde::Deserialize;
use tracing::debug;

use super::http_client::ByteStream;
use crate::domain::{DomainError, FragmentStream};
use crate::infrastructure::sse::{SseData, SseLineBuffer};

/// What one upstream payload contributes to the response
#[derive(Debug, PartialEq, Eq)]
enum Delta {
    Text(String),
    Empty,
    Error(String),
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    error: Option<StreamError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Option<StreamDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    message: Option<String>,
}

fn parse_delta(payload: &str) -> Result<Delta, serde_json::Error> {
    let chunk: StreamChunk = serde_json::from_str(payload)?;

    if let Some(error) = chunk.error {
        return Ok(Delta::Error(
            error.message.unwrap_or_else(|| "upstream reported an error".to_string()),
        ));
    }

    let text = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content)
        .unwrap_or_default();

    Ok(if text.is_empty() {
        Delta::Empty
    } else {
        Delta::Text(text)
    })
}

/// Fragments of an OpenAI-style streamed chat completion.
///
/// The stream ends cleanly at `[DONE]`. Malformed payloads are skipped; an
/// upstream error payload, a read failure or a body that ends before
/// `[DONE]` becomes the stream's final `Err`.
pub fn delta_fragments(name: &'static str, bytes: ByteStream) -> FragmentStream {
    Box::pin(async_stream::stream! {
        let mut bytes = bytes;
        let mut lines = SseLineBuffer::new();

        loop {
            let records = match bytes.next().await {
                Some(Ok(chunk)) => lines.push(&chunk),
                Some(Err(e)) => {
                    yield Err(e.attributed_to(name));
                    return;
                }
                None => match lines.finish() {
                    Some(SseData::Done) => return,
                    _ => {
                        yield Err(DomainError::transport(name, "Stream ended before completion"));
                        return;
                    }
                },
            };

            for record in records {
                let payload = match record {
                    SseData::Done => return,
                    SseData::Payload(payload) => payload,
                    SseData::Overflow { limit } => {
                        yield Err(DomainError::transport(
                            name,
                            format!("Stream line exceeds {} bytes", limit),
                        ));
                        return;
                    }
                };

                match parse_delta(&payload) {
                    Ok(Delta::Text(text)) => yield Ok(text),
                    Ok(Delta::Empty) => {}
                    Ok(Delta::Error(message)) => {
                        yield Err(DomainError::transport(name, message));
                        return;
                    }
                    Err(e) => debug!(provider = name, error = %e, "Skipping malformed stream payload"),
                }
            }
        }
    })
}
