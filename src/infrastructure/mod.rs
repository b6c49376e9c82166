//! Infrastructure layer - upstream clients, stream parsing and logging

pub mod llm;
pub mod logging;
pub mod sse;
