//! HTTP API layer

pub mod chat;
pub mod framing;
pub mod health;
pub mod middleware;
pub mod router;
pub mod state;
pub mod types;

pub use framing::{DecodedRecord, EventStreamDecoder};
pub use router::create_router;
pub use state::AppState;
