//! Client struct definition
//!
//! Represents a connected client with their state and outbound channel.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::{AppError, SendError};
use crate::message::ServerMessage;
use crate::types::{ClientId, RoomName};

/// Display name every client starts with
pub const DEFAULT_NAME: &str = "Anonymous";

/// Connected client information
///
/// Owned by the `ChatServer` actor; only the actor reads or mutates it.
#[derive(Debug)]
pub struct Client {
    /// Unique identifier for this client
    pub id: ClientId,
    /// Display name
    pub name: String,
    /// Room the client is currently in
    pub room: Option<RoomName>,
    /// Server → Client message channel (bounded)
    pub sender: mpsc::Sender<ServerMessage>,
}

impl Client {
    /// Create a new client with the given ID and sender channel
    pub fn new(id: ClientId, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id,
            name: DEFAULT_NAME.to_string(),
            room: None,
            sender,
        }
    }

    /// Queue a message for this client without waiting
    ///
    /// Fails with `BufferFull` when the writer cannot keep up and with
    /// `ChannelClosed` once the connection is gone.
    pub fn send_message(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => SendError::BufferFull,
            TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }

    /// Queue an error line for this client
    pub fn send_error(&self, err: AppError) -> Result<(), SendError> {
        self.send_message(err.into())
    }

    pub fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_creation() {
        let (tx, _rx) = mpsc::channel(32);
        let client = Client::new(ClientId::new(), tx);

        assert_eq!(client.name, "Anonymous");
        assert!(client.room.is_none());
    }

    #[tokio::test]
    async fn test_client_name() {
        let (tx, _rx) = mpsc::channel(32);
        let mut client = Client::new(ClientId::new(), tx);

        client.set_name("Alice".to_string());
        assert_eq!(client.name, "Alice");
    }

    #[tokio::test]
    async fn test_send_message_full_buffer() {
        let (tx, mut rx) = mpsc::channel(1);
        let client = Client::new(ClientId::new(), tx);

        assert!(client.send_message(ServerMessage::Closing).is_ok());
        assert_eq!(
            client.send_message(ServerMessage::Closing),
            Err(SendError::BufferFull)
        );

        assert_eq!(rx.recv().await, Some(ServerMessage::Closing));
    }

    #[tokio::test]
    async fn test_send_error_closed_channel() {
        let (tx, rx) = mpsc::channel(4);
        let client = Client::new(ClientId::new(), tx);
        drop(rx);

        assert_eq!(
            client.send_error(AppError::NotInRoom),
            Err(SendError::ChannelClosed)
        );
    }
}
