//! Fan-out of one prompt across providers, in batch or streaming mode

mod aggregator;
mod event;
mod multiplexer;
mod result;

pub use aggregator::aggregate;
pub use event::{now_millis, StreamEvent};
pub use multiplexer::{multiplex, MultiplexedStream};
pub use result::AggregateResult;
