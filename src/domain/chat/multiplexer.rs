//! Streaming mode: fan N provider streams into one ordered output stream

use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use futures::stream::{self, Stream, StreamExt};
use tracing::{debug, warn};

use crate::domain::{DomainError, Prompt, ProviderAdapter, ProviderId, StreamEvent};

/// Multiplexed output; ends once every provider has produced its terminal event
pub type MultiplexedStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Per-provider bookkeeping while its producer is active
#[derive(Debug)]
struct ProviderRunState {
    provider: ProviderId,
    fragments: usize,
    finished: bool,
}

impl ProviderRunState {
    fn new(provider: ProviderId) -> Self {
        Self {
            provider,
            fragments: 0,
            finished: false,
        }
    }

    /// Accept an event from the producer, pinning it to this provider
    fn accept(&mut self, mut event: StreamEvent) -> StreamEvent {
        if event.service != self.provider {
            warn!(
                provider = %self.provider,
                claimed = %event.service,
                "Producer emitted an event for another provider"
            );
            event.service = self.provider;
        }

        if event.is_terminal() {
            self.finish(event.error.as_deref());
        } else {
            self.fragments += 1;
        }

        event
    }

    /// Synthesize the terminal event for a producer that broke down
    fn abort(&mut self, error: DomainError) -> StreamEvent {
        warn!(provider = %self.provider, error = %error, "Producer failed unexpectedly");
        let event = StreamEvent::failed(self.provider, &error);
        self.finish(event.error.as_deref());
        event
    }

    fn finish(&mut self, error: Option<&str>) {
        self.finished = true;
        debug!(
            provider = %self.provider,
            fragments = self.fragments,
            error = error.unwrap_or(""),
            "Provider stream finished"
        );
    }
}

/// Start one producer per adapter and interleave their events.
///
/// Producers are polled together and whichever is ready first is forwarded,
/// so there is no ordering across providers; each provider's own events keep
/// their order. Nothing is buffered: producers are only advanced when the
/// consumer asks for the next event. Dropping the returned stream drops every
/// producer.
pub fn multiplex(prompt: &Prompt, adapters: &[Arc<dyn ProviderAdapter>]) -> MultiplexedStream {
    let producers = adapters
        .iter()
        .map(|adapter| guard(adapter.clone(), prompt.clone()));

    Box::pin(stream::select_all(producers))
}

/// Open and drain one adapter's producer so it always yields exactly one
/// terminal event and nothing after it, whatever the adapter does.
fn guard(adapter: Arc<dyn ProviderAdapter>, prompt: Prompt) -> MultiplexedStream {
    let provider = adapter.provider();

    Box::pin(async_stream::stream! {
        let mut state = ProviderRunState::new(provider);
        let panicked = || DomainError::internal(format!("{} stream panicked", provider));

        let opened = std::panic::catch_unwind(AssertUnwindSafe(|| adapter.stream(&prompt)));
        let mut producer = match opened {
            Ok(producer) => AssertUnwindSafe(producer).catch_unwind(),
            Err(_) => {
                yield state.abort(panicked());
                return;
            }
        };

        while !state.finished {
            let event = match producer.next().await {
                Some(Ok(Ok(event))) => state.accept(event),
                Some(Ok(Err(e))) => state.abort(e),
                Some(Err(_)) => state.abort(panicked()),
                None => state.abort(DomainError::internal(format!(
                    "{} stream ended without completing",
                    provider
                ))),
            };

            yield event;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MockAdapter;
    use std::collections::HashMap;
    use std::time::Duration;

    fn prompt() -> Prompt {
        Prompt::new("hello").unwrap()
    }

    async fn run(adapters: Vec<Arc<dyn ProviderAdapter>>) -> Vec<StreamEvent> {
        multiplex(&prompt(), &adapters).collect().await
    }

    fn by_provider(events: &[StreamEvent]) -> HashMap<ProviderId, Vec<&StreamEvent>> {
        let mut grouped: HashMap<ProviderId, Vec<&StreamEvent>> = HashMap::new();
        for event in events {
            grouped.entry(event.service).or_default().push(event);
        }
        grouped
    }

    fn assert_single_trailing_terminal(events: &[&StreamEvent]) {
        let terminals = events.iter().filter(|e| e.is_terminal()).count();
        assert_eq!(terminals, 1);
        assert!(events.last().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn test_every_provider_terminates_exactly_once() {
        let events = run(vec![
            Arc::new(MockAdapter::new(ProviderId::ChatGpt)),
            Arc::new(MockAdapter::new(ProviderId::DeepSeek).with_stream_error(&["par"], "dropped")),
            Arc::new(MockAdapter::new(ProviderId::GitHub).with_fragments(&[])),
        ])
        .await;

        let grouped = by_provider(&events);
        assert_eq!(grouped.len(), 3);
        for provider_events in grouped.values() {
            assert_single_trailing_terminal(provider_events);
        }

        let deepseek = &grouped[&ProviderId::DeepSeek];
        assert!(deepseek.last().unwrap().is_error());
    }

    #[tokio::test]
    async fn test_intra_provider_order_is_preserved() {
        let events = run(vec![
            Arc::new(
                MockAdapter::new(ProviderId::ChatGpt)
                    .with_fragments(&["1", "2", "3", "4"])
                    .with_delay(Duration::from_millis(3)),
            ),
            Arc::new(
                MockAdapter::new(ProviderId::Microsoft)
                    .with_fragments(&["a", "b", "c"])
                    .with_delay(Duration::from_millis(2)),
            ),
        ])
        .await;

        let grouped = by_provider(&events);
        let text = |id: ProviderId| -> String {
            grouped[&id].iter().map(|e| e.content.as_str()).collect()
        };

        assert_eq!(text(ProviderId::ChatGpt), "1234");
        assert_eq!(text(ProviderId::Microsoft), "abc");
    }

    #[tokio::test]
    async fn test_faster_provider_is_not_held_back() {
        let events = run(vec![
            Arc::new(
                MockAdapter::new(ProviderId::ChatGpt)
                    .with_fragments(&["slow"])
                    .with_delay(Duration::from_millis(200)),
            ),
            Arc::new(MockAdapter::new(ProviderId::DeepSeek).with_fragments(&["fast"])),
        ])
        .await;

        let deepseek_done = events
            .iter()
            .position(|e| e.service == ProviderId::DeepSeek && e.is_terminal())
            .unwrap();
        let chatgpt_first = events
            .iter()
            .position(|e| e.service == ProviderId::ChatGpt)
            .unwrap();

        assert!(deepseek_done < chatgpt_first);
    }

    #[tokio::test]
    async fn test_interleaving_across_providers_is_possible() {
        let events = run(vec![
            Arc::new(
                MockAdapter::new(ProviderId::ChatGpt)
                    .with_fragments(&["a", "b", "c", "d"])
                    .with_delay(Duration::from_millis(5)),
            ),
            Arc::new(
                MockAdapter::new(ProviderId::DeepSeek)
                    .with_fragments(&["1", "2", "3", "4"])
                    .with_delay(Duration::from_millis(5)),
            ),
        ])
        .await;

        let first_deepseek = events
            .iter()
            .position(|e| e.service == ProviderId::DeepSeek)
            .unwrap();
        let last_chatgpt = events
            .iter()
            .rposition(|e| e.service == ProviderId::ChatGpt)
            .unwrap();

        assert!(first_deepseek < last_chatgpt);
    }

    #[tokio::test]
    async fn test_producer_panic_becomes_terminal_error() {
        let events = run(vec![
            Arc::new(MockAdapter::new(ProviderId::GitHub).with_stream_panic(&["partial"])),
            Arc::new(MockAdapter::new(ProviderId::ChatGpt)),
        ])
        .await;

        let grouped = by_provider(&events);
        let github = &grouped[&ProviderId::GitHub];
        assert_single_trailing_terminal(github);
        assert!(github.last().unwrap().error.as_deref().unwrap().contains("panicked"));

        let chatgpt = &grouped[&ProviderId::ChatGpt];
        assert_single_trailing_terminal(chatgpt);
        assert!(!chatgpt.last().unwrap().is_error());
    }

    #[tokio::test]
    async fn test_panic_while_opening_becomes_terminal_error() {
        let events = run(vec![
            Arc::new(MockAdapter::new(ProviderId::Microsoft).with_panic_on_open()),
            Arc::new(MockAdapter::new(ProviderId::DeepSeek).with_fragments(&["still ", "here"])),
        ])
        .await;

        let grouped = by_provider(&events);
        let microsoft = &grouped[&ProviderId::Microsoft];
        assert_eq!(microsoft.len(), 1);
        assert_eq!(
            microsoft[0].error.as_deref(),
            Some("Internal error: Microsoft Copilot stream panicked")
        );

        let deepseek = &grouped[&ProviderId::DeepSeek];
        assert_single_trailing_terminal(deepseek);
        let text: String = deepseek.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(text, "still here");
    }

    #[tokio::test]
    async fn test_adapters_are_opened_on_first_poll() {
        let adapter = Arc::new(MockAdapter::new(ProviderId::ChatGpt));
        let adapters: Vec<Arc<dyn ProviderAdapter>> = vec![adapter.clone()];

        let mut events = multiplex(&prompt(), &adapters);
        assert_eq!(adapter.calls(), 0);

        events.next().await;
        assert_eq!(adapter.calls(), 1);
    }

    #[tokio::test]
    async fn test_producer_error_item_becomes_terminal_error() {
        let events = run(vec![Arc::new(
            MockAdapter::new(ProviderId::DeepSeek).with_producer_error(&["x"], "decoder bug"),
        )])
        .await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[1].error.as_deref(), Some("Internal error: decoder bug"));
    }

    #[tokio::test]
    async fn test_producer_ending_without_terminal_is_closed_out() {
        let events = run(vec![Arc::new(
            MockAdapter::new(ProviderId::Microsoft).with_abrupt_end(&["M", "S"]),
        )])
        .await;

        assert_eq!(events.len(), 3);
        assert!(events[2].is_terminal());
        assert!(events[2].error.as_deref().unwrap().contains("without completing"));
    }

    #[tokio::test]
    async fn test_nothing_is_forwarded_after_terminal_event() {
        let events = run(vec![Arc::new(
            MockAdapter::new(ProviderId::ChatGpt).with_chatter_after_done(&["hi"]),
        )])
        .await;

        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.content != "stray"));
        assert!(events[1].is_terminal());
    }

    #[tokio::test]
    async fn test_empty_adapter_list_ends_immediately() {
        assert!(run(Vec::new()).await.is_empty());
    }
}
