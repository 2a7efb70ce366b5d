//! TCP connection handler
//!
//! Handles individual client connections: line framing, command parsing,
//! and bidirectional communication with the ChatServer.

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::message::{Command, CommandKind, ServerMessage};
use crate::server::{ChatServer, ServerCommand};
use crate::types::ClientId;

/// Start the ChatServer actor and accept connections forever
///
/// Accept failures are logged and do not stop the loop.
pub async fn serve(listener: TcpListener, config: ServerConfig) -> Result<(), AppError> {
    config.validate()?;

    let (cmd_tx, cmd_rx) = mpsc::channel(config.command_buffer);
    tokio::spawn(ChatServer::new(cmd_rx, config.overflow_policy).run());

    info!("Chat server listening on {}", listener.local_addr()?);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("Client has connected: {}", addr);
                let cmd_tx = cmd_tx.clone();
                let config = config.clone();

                // Spawn handler task for each connection
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, cmd_tx, config).await {
                        error!("Connection handler error for {}: {}", addr, e);
                    }
                    info!("Client has disconnected: {}", addr);
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Handle a new TCP connection
///
/// Registers the client, then runs a read task (lines -> ServerCommand)
/// and a write task (ServerMessage -> lines) until either ends. The
/// client is always deregistered afterwards, whether or not it sent
/// `/quit`.
///
/// Only the actor holds the outbound sender, so dropping the client on
/// `/quit` or eviction is what ends the writer and closes the socket.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<ServerCommand>,
    config: ServerConfig,
) -> Result<(), AppError> {
    config.validate()?;

    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let framed = Framed::new(stream, LinesCodec::new_with_max_length(config.max_line_length));
    let (mut line_sink, mut line_stream) = framed.split();

    let client_id = ClientId::new();
    debug!("Client {} assigned to {}", client_id, peer_addr);

    // Create channel for server -> client messages
    let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(config.outbound_buffer);

    // Register with ChatServer
    if cmd_tx
        .send(ServerCommand::Connect {
            client_id,
            sender: msg_tx,
        })
        .await
        .is_err()
    {
        error!("Failed to register client {} - server closed", client_id);
        return Err(AppError::ChannelSend);
    }

    let cmd_tx_read = cmd_tx.clone();

    // Spawn read task (lines -> ServerCommand)
    let mut read_task = tokio::spawn(async move {
        while let Some(line_result) = line_stream.next().await {
            let line = match line_result {
                Ok(line) => line,
                // The framed stream ends after any decode error
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    warn!("Line too long from {}", client_id);
                    let _ = cmd_tx_read
                        .send(ServerCommand::Reject {
                            client_id,
                            error: AppError::LineTooLong,
                        })
                        .await;
                    break;
                }
                Err(e) => {
                    debug!("Read error for {}: {}", client_id, e);
                    break;
                }
            };

            let (cmd, is_quit) = match Command::parse(&line) {
                Ok(Some(command)) => {
                    let is_quit = command.kind == CommandKind::Quit;
                    (ServerCommand::Execute { client_id, command }, is_quit)
                }
                Ok(None) => continue,
                Err(error) => (ServerCommand::Reject { client_id, error }, false),
            };

            if cmd_tx_read.send(cmd).await.is_err() {
                debug!("Server closed, ending read task for {}", client_id);
                break;
            }
            if is_quit {
                break;
            }
        }
        debug!("Read task ended for {}", client_id);
    });

    let write_timeout = config.write_timeout();

    // Spawn write task (ServerMessage -> lines)
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            match timeout(write_timeout, line_sink.send(msg.to_string())).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    debug!("Write failed for {}: {}", client_id, e);
                    break;
                }
                Err(_) => {
                    warn!("Write timed out for {}", client_id);
                    break;
                }
            }
        }
        debug!("Write task ended for {}", client_id);

        let _ = timeout(write_timeout, line_sink.close()).await;
    });

    // Wait for either task to complete
    let write_finished = tokio::select! {
        _ = &mut read_task => {
            debug!("Read task completed for {}", client_id);
            false
        }
        _ = &mut write_task => {
            debug!("Write task completed for {}", client_id);
            true
        }
    };

    if write_finished {
        read_task.abort();
    }

    // Deregister; a no-op if the client already quit or was evicted
    let _ = cmd_tx.send(ServerCommand::Disconnect { client_id }).await;

    // Once the actor drops its sender the writer drains and exits
    if !write_finished && timeout(write_timeout, &mut write_task).await.is_err() {
        warn!("Writer for {} did not drain in time", client_id);
        write_task.abort();
    }

    info!("Client {} disconnected", client_id);

    Ok(())
}
