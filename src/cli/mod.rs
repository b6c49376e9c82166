//! CLI module for the fan-out gateway
//!
//! - `serve`: run the HTTP server
//! - `ask`: send one prompt to a running server and print what comes back

pub mod ask;
pub mod serve;

use clap::{Parser, Subcommand};

/// Fan one prompt out to several AI chat providers
#[derive(Parser)]
#[command(name = "fanout-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve,

    /// Ask a running server, streaming by default
    Ask(ask::AskArgs),
}
