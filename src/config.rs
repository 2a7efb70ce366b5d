//! Runtime configuration
//!
//! Everything is taken from the command line; there is no config file.

use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::error::AppError;

/// Default server address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8888";

/// What to do when a client's outbound buffer is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OverflowPolicy {
    /// Evict the slow client from the server
    Disconnect,
    /// Discard the message for that client only
    Drop,
}

/// Server settings
#[derive(Debug, Clone, Parser)]
#[command(name = "room_chat", version, about = "Line-oriented multi-room chat server")]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(value_name = "ADDR", default_value = DEFAULT_ADDR)]
    pub addr: String,

    /// Capacity of the shared command queue
    #[arg(long, default_value_t = 256, value_parser = parse_nonzero)]
    pub command_buffer: usize,

    /// Per-client outbound message buffer
    #[arg(long, default_value_t = 64, value_parser = parse_nonzero)]
    pub outbound_buffer: usize,

    /// Policy applied when a client's outbound buffer overflows
    #[arg(long, value_enum, default_value_t = OverflowPolicy::Disconnect)]
    pub overflow_policy: OverflowPolicy,

    /// Upper bound for a single socket write, in milliseconds
    #[arg(long, default_value_t = 10_000)]
    pub write_timeout_ms: u64,

    /// Longest accepted input line, in bytes
    #[arg(long, default_value_t = 4096, value_parser = parse_nonzero)]
    pub max_line_length: usize,
}

impl ServerConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Reject settings that cannot back a channel or a codec
    ///
    /// The CLI already refuses these; this covers configs built in code.
    pub fn validate(&self) -> Result<(), AppError> {
        let sizes = [
            ("command_buffer", self.command_buffer),
            ("outbound_buffer", self.outbound_buffer),
            ("max_line_length", self.max_line_length),
        ];
        match sizes.iter().find(|(_, value)| *value == 0) {
            Some((field, _)) => Err(AppError::InvalidConfig(format!(
                "{} must be at least 1",
                field
            ))),
            None => Ok(()),
        }
    }
}

/// Buffer sizes must be at least 1 (`mpsc::channel(0)` panics)
fn parse_nonzero(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            command_buffer: 256,
            outbound_buffer: 64,
            overflow_policy: OverflowPolicy::Disconnect,
            write_timeout_ms: 10_000,
            max_line_length: 4096,
        }
    }
}
