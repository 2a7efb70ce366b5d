//! Error types for the chat server
//!
//! Defines application-level errors and outbound delivery errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Covers both fatal errors (connection termination) and
/// usage errors (sent back to the issuing client as a text line).
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send error (fatal - internal channel broken)
    #[error("Channel send error")]
    ChannelSend,

    /// Client is not in any room
    #[error("Not in a room")]
    NotInRoom,

    /// Command was issued without its required argument
    #[error("Missing argument for {0}")]
    MissingArgument(&'static str),

    /// First token is not a known command keyword
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Input line exceeded the configured maximum length
    #[error("Line too long")]
    LineTooLong,

    /// Server settings that cannot be used (fatal at startup)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Outbound delivery errors
///
/// Returned by the non-blocking client send path.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The client's outbound buffer is full
    #[error("Outbound buffer full")]
    BufferFull,
}
