//! Chat endpoints: batch fan-out and the multiplexed event stream

use std::convert::Infallible;

use axum::{
    extract::State,
    http::header,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn, Instrument};

use super::framing::{done_event, to_sse_event};
use super::state::AppState;
use super::types::{ApiError, BatchResponse, ChatRequest, Json};
use crate::domain::{aggregate, multiplex, now_millis, MultiplexedStream, Prompt, ProviderId};

/// Validate the request body before any provider is touched
fn accept(request: ChatRequest) -> Result<(Prompt, Vec<ProviderId>), ApiError> {
    let prompt = Prompt::new(request.prompt).map_err(|e| ApiError::from(e).with_param("prompt"))?;

    let providers = request.selected_services.providers();
    if providers.is_empty() {
        return Err(ApiError::bad_request("At least one service must be selected")
            .with_param("selectedServices"));
    }

    Ok((prompt, providers))
}

/// POST /chat
pub async fn chat_batch(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<BatchResponse>, ApiError> {
    let (prompt, providers) = accept(request)?;
    info!(providers = ?providers, prompt_chars = prompt.as_str().len(), "Batch chat request");

    let adapters = state.adapters.adapters_for(&providers);
    let results = aggregate(&prompt, &adapters).await;

    let failed = results.iter().filter(|r| !r.is_success()).count();
    info!(total = results.len(), failed, "Batch chat completed");

    Ok(Json(BatchResponse {
        success: true,
        results,
        timestamp: now_millis(),
    }))
}

/// POST /chat/stream
pub async fn chat_stream(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (prompt, providers) = accept(request)?;
    info!(providers = ?providers, prompt_chars = prompt.as_str().len(), "Streaming chat request");

    let adapters = state.adapters.adapters_for(&providers);
    let events = multiplex(&prompt, &adapters);

    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(state.stream.channel_capacity.max(1));
    tokio::spawn(forward_events(events, tx).in_current_span());

    let sse = Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::default());
    Ok(([(header::CACHE_CONTROL, "no-cache")], sse))
}

/// Pump multiplexed events into the response channel, then the sentinel.
///
/// Returns as soon as the client goes away, dropping the multiplexer and
/// with it every provider stream.
async fn forward_events(mut events: MultiplexedStream, tx: mpsc::Sender<Result<Event, Infallible>>) {
    let mut forwarded = 0usize;

    loop {
        let next = tokio::select! {
            _ = tx.closed() => {
                info!(forwarded, "Client disconnected, abandoning stream");
                return;
            }
            next = events.next() => next,
        };

        let Some(event) = next else { break };

        if event.is_terminal() {
            debug!(service = %event.service, error = ?event.error, "Provider finished");
        }

        let record = match to_sse_event(&event) {
            Ok(record) => record,
            Err(e) => {
                warn!(service = %event.service, error = %e, "Dropping unencodable event");
                continue;
            }
        };

        if tx.send(Ok(record)).await.is_err() {
            info!(forwarded, "Client disconnected, abandoning stream");
            return;
        }
        forwarded += 1;
    }

    if tx.send(Ok(done_event())).await.is_ok() {
        info!(forwarded, "Streaming chat completed");
    }
}
