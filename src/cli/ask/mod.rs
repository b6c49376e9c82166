//! Ask command - sends one prompt to a running server
//!
//! Streaming mode decodes `/chat/stream` as it arrives and prints a card per
//! service once that service finishes. `--batch` calls `/chat` instead.

use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::Args;
use futures::StreamExt;
use tracing::{debug, warn};

use crate::api::types::{ApiErrorResponse, BatchResponse, ChatRequest};
use crate::api::{DecodedRecord, EventStreamDecoder};
use crate::config::AppConfig;
use crate::domain::{ProviderId, ProviderSelection, StreamEvent};
use crate::infrastructure::logging::init_logging;

/// Arguments for the ask command
#[derive(Args, Clone)]
pub struct AskArgs {
    /// Prompt to send
    pub prompt: String,

    /// Base URL of the server
    #[arg(long, default_value = "http://localhost:8080")]
    pub url: String,

    /// Comma-separated services, e.g. `chatgpt,github` (default: all)
    #[arg(long, value_delimiter = ',')]
    pub services: Option<Vec<ProviderId>>,

    /// Wait for every service and print the combined result
    #[arg(long)]
    pub batch: bool,
}

pub async fn run(args: AskArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    init_logging(&config.logging, true);

    let selected_services: ProviderSelection = args
        .services
        .clone()
        .unwrap_or_else(|| ProviderId::ALL.to_vec())
        .into_iter()
        .collect();

    let request = ChatRequest {
        prompt: args.prompt.clone(),
        selected_services,
    };

    let client = reqwest::Client::new();
    let base = args.url.trim_end_matches('/');

    if args.batch {
        ask_batch(&client, base, &request).await
    } else {
        ask_stream(&client, base, &request).await
    }
}

async fn send(
    client: &reqwest::Client,
    url: &str,
    request: &ChatRequest,
) -> anyhow::Result<reqwest::Response> {
    let response = client
        .post(url)
        .json(request)
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", url))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(error) => bail!("{} ({})", error.error.message, status),
        Err(_) => bail!("Server answered {}: {}", status, body),
    }
}

async fn ask_batch(client: &reqwest::Client, base: &str, request: &ChatRequest) -> anyhow::Result<()> {
    let started = Instant::now();

    let batch: BatchResponse = send(client, &format!("{}/chat", base), request)
        .await?
        .json()
        .await
        .context("Failed to parse batch response")?;

    for result in &batch.results {
        println!("== {} ==", result.service);
        if !result.response.is_empty() {
            println!("{}", result.response);
        }
        if let Some(error) = &result.error {
            println!("error: {}", error);
        }
        println!();
    }

    println!("Total: {} ms", started.elapsed().as_millis());

    Ok(())
}

async fn ask_stream(client: &reqwest::Client, base: &str, request: &ChatRequest) -> anyhow::Result<()> {
    let response = send(client, &format!("{}/chat/stream", base), request).await?;

    let mut report = StreamReport::new(Instant::now());
    let mut decoder = EventStreamDecoder::new();
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        let chunk = chunk.context("Event stream interrupted")?;

        for record in decoder.push(&chunk) {
            if let Some(service) = report.apply(record, report.elapsed()) {
                print!("{}", report.render(service));
            }
        }
    }

    if let Some(record) = decoder.finish() {
        if let Some(service) = report.apply(record, report.elapsed()) {
            print!("{}", report.render(service));
        }
    }

    for service in report.unfinished() {
        warn!(service = %service, "Stream closed before the service finished");
        print!("{}", report.render(service));
    }

    if !report.saw_done() {
        warn!("Stream closed without the end marker");
    }

    println!("Total: {} ms", report.elapsed().as_millis());

    Ok(())
}

/// What one service has sent so far
#[derive(Debug, Default)]
struct ServiceProgress {
    text: String,
    error: Option<String>,
    first_content: Option<Duration>,
    finished: Option<Duration>,
}

/// Collects decoded records per service, in order of first appearance
#[derive(Debug)]
pub struct StreamReport {
    started: Instant,
    services: Vec<(ProviderId, ServiceProgress)>,
    malformed: usize,
    done: bool,
}

impl StreamReport {
    pub fn new(started: Instant) -> Self {
        Self {
            started,
            services: Vec::new(),
            malformed: 0,
            done: false,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Record one decoded record; returns the service it finished, if any
    pub fn apply(&mut self, record: DecodedRecord, at: Duration) -> Option<ProviderId> {
        match record {
            DecodedRecord::Event(event) => self.apply_event(event, at),
            DecodedRecord::Done => {
                self.done = true;
                None
            }
            DecodedRecord::Malformed { line, reason } => {
                debug!(%line, %reason, "Skipping malformed record");
                self.malformed += 1;
                None
            }
        }
    }

    fn apply_event(&mut self, event: StreamEvent, at: Duration) -> Option<ProviderId> {
        let service = event.service;
        let progress = self.progress_mut(service);

        if progress.finished.is_some() {
            return None;
        }

        if !event.content.is_empty() {
            progress.first_content.get_or_insert(at);
            progress.text.push_str(&event.content);
        }

        if event.done {
            progress.error = event.error;
            progress.finished = Some(at);
            return Some(service);
        }

        None
    }

    fn progress_mut(&mut self, service: ProviderId) -> &mut ServiceProgress {
        let index = match self.services.iter().position(|(id, _)| *id == service) {
            Some(index) => index,
            None => {
                self.services.push((service, ServiceProgress::default()));
                self.services.len() - 1
            }
        };

        &mut self.services[index].1
    }

    pub fn unfinished(&self) -> Vec<ProviderId> {
        self.services
            .iter()
            .filter(|(_, progress)| progress.finished.is_none())
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn saw_done(&self) -> bool {
        self.done
    }

    pub fn malformed(&self) -> usize {
        self.malformed
    }

    /// Card for one service: heading with timings, text, then any error
    pub fn render(&self, service: ProviderId) -> String {
        let Some((_, progress)) = self.services.iter().find(|(id, _)| *id == service) else {
            return String::new();
        };

        let mut timings = Vec::new();
        if let Some(first) = progress.first_content {
            timings.push(format!("first content {} ms", first.as_millis()));
        }
        match progress.finished {
            Some(done) => timings.push(format!("done {} ms", done.as_millis())),
            None => timings.push("unfinished".to_string()),
        }

        let mut card = format!("== {} ({}) ==\n", service, timings.join(", "));
        if !progress.text.is_empty() {
            card.push_str(&progress.text);
            card.push('\n');
        }
        if let Some(error) = &progress.error {
            card.push_str(&format!("error: {}\n", error));
        }
        card.push('\n');

        card
    }
}
