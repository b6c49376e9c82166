//! Batch mode: run every adapter's `complete` concurrently and wait for all

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use tracing::{debug, warn};

use super::AggregateResult;
use crate::domain::{DomainError, Prompt, ProviderAdapter};

/// Call every adapter concurrently and return one result per adapter.
///
/// Results follow the order of `adapters`, not completion order. A failing
/// or panicking adapter yields a failed entry; its siblings are unaffected.
pub async fn aggregate(
    prompt: &Prompt,
    adapters: &[Arc<dyn ProviderAdapter>],
) -> Vec<AggregateResult> {
    let calls = adapters.iter().map(|adapter| async move {
        let provider = adapter.provider();
        let outcome = AssertUnwindSafe(adapter.complete(prompt))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(text)) => {
                debug!(provider = %provider, chars = text.len(), "Provider completed");
                AggregateResult::success(provider, text)
            }
            Ok(Err(e)) => {
                warn!(provider = %provider, error = %e, "Provider failed");
                AggregateResult::failure(provider, &e)
            }
            Err(_) => {
                let error = DomainError::internal(format!("{} adapter panicked", provider));
                warn!(provider = %provider, "Provider panicked");
                AggregateResult::failure(provider, &error)
            }
        }
    });

    join_all(calls).await
}
