//! Multi-room TCP Chat Server Library
//!
//! A line-oriented chat server built on tokio using the Actor pattern for
//! state management.
//!
//! # Features
//! - Newline-delimited text protocol over TCP
//! - Display names (`/name`)
//! - Named rooms created on first join (`/join`, `/rooms`)
//! - Room broadcast (`/msg`) and member listing (`/members`)
//! - Clean disconnect handling, with or without `/quit`
//! - Bounded per-client outbound buffers with an overflow policy
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` is the central actor owning clients and the room registry
//! - Each connection has a read task and a write task talking to the server
//! - No locks needed - commands are handled one at a time by the actor
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use room_chat::{serve, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig::default();
//!     let listener = TcpListener::bind(&config.addr).await.unwrap();
//!     serve(listener, config).await.unwrap();
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod room;
pub mod server;
pub mod types;

// Re-export main types for convenience
pub use client::Client;
pub use config::{OverflowPolicy, ServerConfig};
pub use error::{AppError, SendError};
pub use handler::{handle_connection, serve};
pub use message::{Command, CommandKind, ServerMessage};
pub use room::Room;
pub use server::{ChatServer, ServerCommand};
pub use types::{ClientId, RoomName};
