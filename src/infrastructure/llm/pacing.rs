//! Replaying a finished text as a paced fragment stream

use std::time::Duration;

use rand::Rng;

use crate::config::SimulationConfig;
use crate::domain::FragmentStream;

/// Pause inserted between consecutive fragments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    Immediate,
    Fixed(Duration),
    Jitter { min: Duration, max: Duration },
}

impl Pacing {
    /// Fixed pause between fragments from the simulation settings
    pub fn fragments(simulation: &SimulationConfig) -> Self {
        match simulation.fragment_delay() {
            Duration::ZERO => Self::Immediate,
            delay => Self::Fixed(delay),
        }
    }

    /// Randomized per-character pause from the simulation settings
    pub fn characters(simulation: &SimulationConfig) -> Self {
        let min = Duration::from_millis(simulation.char_delay_min_ms);
        let max = Duration::from_millis(simulation.char_delay_max_ms.max(simulation.char_delay_min_ms));

        if max.is_zero() {
            Self::Immediate
        } else {
            Self::Jitter { min, max }
        }
    }

    fn next_delay(&self) -> Duration {
        match *self {
            Self::Immediate => Duration::ZERO,
            Self::Fixed(delay) => delay,
            Self::Jitter { min, max } => random_between(min, max),
        }
    }
}

pub(super) fn random_between(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let millis = rand::thread_rng().gen_range(min.as_millis() as u64..=max.as_millis() as u64);
    Duration::from_millis(millis)
}

/// Split into words, each keeping its trailing whitespace
pub fn words(text: &str) -> Vec<String> {
    text.split_inclusive(char::is_whitespace)
        .map(str::to_string)
        .collect()
}

pub fn characters(text: &str) -> Vec<String> {
    text.chars().map(String::from).collect()
}

/// Emit `pieces` in order, pausing between them
pub fn paced_fragments(pieces: Vec<String>, pacing: Pacing) -> FragmentStream {
    Box::pin(async_stream::stream! {
        for (index, piece) in pieces.into_iter().enumerate() {
            if index > 0 {
                let delay = pacing.next_delay();
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            yield Ok(piece);
        }
    })
}
