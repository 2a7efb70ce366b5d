//! ChatServer Actor implementation
//!
//! The central actor that owns all shared state: the client table and the
//! room registry. Every command from every connection goes through one
//! mpsc channel and is handled to completion before the next one, so no
//! locks are needed.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::config::OverflowPolicy;
use crate::error::{AppError, SendError};
use crate::message::{Command, CommandKind, ServerMessage};
use crate::room::Room;
use crate::types::{ClientId, RoomName};

/// Commands sent from connection handlers to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New client connected
    Connect {
        client_id: ClientId,
        sender: mpsc::Sender<ServerMessage>,
    },
    /// Parsed command line from a client
    Execute {
        client_id: ClientId,
        command: Command,
    },
    /// Input the reader could not turn into a command
    Reject {
        client_id: ClientId,
        error: AppError,
    },
    /// Client's read loop ended
    Disconnect {
        client_id: ClientId,
    },
}

/// The main ChatServer actor
pub struct ChatServer {
    /// All connected clients: ClientId -> Client
    clients: HashMap<ClientId, Client>,
    /// Room registry: RoomName -> Room
    rooms: HashMap<RoomName, Room>,
    /// Applied to clients whose outbound buffer filled up
    overflow_policy: OverflowPolicy,
    /// Clients that hit a full buffer while handling the current command
    overflowed: Vec<ClientId>,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl ChatServer {
    /// Create a new ChatServer with the given command receiver
    pub fn new(receiver: mpsc::Receiver<ServerCommand>, overflow_policy: OverflowPolicy) -> Self {
        Self {
            clients: HashMap::new(),
            rooms: HashMap::new(),
            overflow_policy,
            overflowed: Vec::new(),
            receiver,
        }
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Connect { client_id, sender } => {
                self.handle_connect(client_id, sender);
            }
            ServerCommand::Execute { client_id, command } => {
                self.handle_execute(client_id, command);
            }
            ServerCommand::Reject { client_id, error } => {
                debug!("Rejected input from {}: {}", client_id, error);
                self.send_error_to(client_id, error);
            }
            ServerCommand::Disconnect { client_id } => {
                self.handle_disconnect(client_id);
            }
        }

        self.apply_overflow_policy();
    }

    /// Handle new client connection
    fn handle_connect(&mut self, client_id: ClientId, sender: mpsc::Sender<ServerMessage>) {
        self.clients.insert(client_id, Client::new(client_id, sender));
        debug!(
            "Client {} registered. Total clients: {}, Total rooms: {}",
            client_id,
            self.clients.len(),
            self.rooms.len()
        );
    }

    /// Handle the end of a client's read loop
    ///
    /// Clients that already quit or were evicted are gone from the table,
    /// which makes this a no-op for them.
    fn handle_disconnect(&mut self, client_id: ClientId) {
        if !self.clients.contains_key(&client_id) {
            return;
        }

        self.leave_current_room(client_id);
        self.clients.remove(&client_id);

        debug!(
            "Client {} removed. Total clients: {}, Total rooms: {}",
            client_id,
            self.clients.len(),
            self.rooms.len()
        );
    }

    /// Dispatch a client command and report usage errors back to the client
    fn handle_execute(&mut self, client_id: ClientId, command: Command) {
        if !self.clients.contains_key(&client_id) {
            debug!("Ignoring {:?} from unregistered client {}", command.kind, client_id);
            return;
        }

        let result = match command.kind {
            CommandKind::Name => self.handle_name(client_id, &command),
            CommandKind::Join => self.handle_join(client_id, &command),
            CommandKind::Rooms => self.handle_rooms(client_id),
            CommandKind::Message => self.handle_message(client_id, &command),
            CommandKind::Members => self.handle_members(client_id),
            CommandKind::Quit => self.handle_quit(client_id),
        };

        if let Err(err) = result {
            debug!("{} failed for {}: {}", command.kind.keyword(), client_id, err);
            self.send_error_to(client_id, err);
        }
    }

    /// `/name <displayName>`
    fn handle_name(&mut self, client_id: ClientId, command: &Command) -> Result<(), AppError> {
        let name = command.first_arg()?.to_string();

        if let Some(client) = self.clients.get_mut(&client_id) {
            client.set_name(name.clone());
        }
        debug!("Client {} set name to '{}'", client_id, name);

        self.send_to(client_id, ServerMessage::NameSet { name });
        Ok(())
    }

    /// `/join <roomName>`
    ///
    /// Joining the current room again runs the full leave + join sequence.
    fn handle_join(&mut self, client_id: ClientId, command: &Command) -> Result<(), AppError> {
        let room_name = RoomName::from(command.first_arg()?);

        if !self.rooms.contains_key(&room_name) {
            info!("Room '{}' created", room_name);
            self.rooms.insert(room_name.clone(), Room::new(room_name.clone()));
        }

        self.leave_current_room(client_id);

        let Some(client) = self.clients.get_mut(&client_id) else {
            return Ok(());
        };
        client.room = Some(room_name.clone());
        let name = client.name.clone();

        if let Some(room) = self.rooms.get_mut(&room_name) {
            room.add_member(client_id);
            info!(
                "Client {} ({}) joined room '{}' ({} members)",
                client_id,
                name,
                room.name,
                room.member_count()
            );
        }

        self.broadcast(&room_name, client_id, ServerMessage::MemberJoined { name: name.clone() });
        self.send_to(client_id, ServerMessage::RoomJoined { name });
        Ok(())
    }

    /// `/rooms`
    fn handle_rooms(&mut self, client_id: ClientId) -> Result<(), AppError> {
        let rooms = self.rooms.keys().map(ToString::to_string).collect();
        self.send_to(client_id, ServerMessage::RoomList { rooms });
        Ok(())
    }

    /// `/msg <text...>`
    fn handle_message(&mut self, client_id: ClientId, command: &Command) -> Result<(), AppError> {
        let (room_name, from) = self.current_room(client_id)?;

        self.broadcast(
            &room_name,
            client_id,
            ServerMessage::Chat {
                from,
                content: command.text(),
            },
        );
        Ok(())
    }

    /// `/members`
    fn handle_members(&mut self, client_id: ClientId) -> Result<(), AppError> {
        let (room_name, _) = self.current_room(client_id)?;

        let members = self
            .rooms
            .get(&room_name)
            .map(|room| room.members_list(&self.clients, client_id))
            .unwrap_or_default();

        self.send_to(client_id, ServerMessage::MemberList { members });
        Ok(())
    }

    /// `/quit`
    ///
    /// Dropping the client drops its sender, which lets the writer task
    /// flush "Closing connection" and close the socket.
    fn handle_quit(&mut self, client_id: ClientId) -> Result<(), AppError> {
        info!("Client {} quit", client_id);

        self.leave_current_room(client_id);
        self.send_to(client_id, ServerMessage::Closing);
        self.clients.remove(&client_id);
        Ok(())
    }

    /// Helper: Room name and display name of a client that must be in a room
    fn current_room(&self, client_id: ClientId) -> Result<(RoomName, String), AppError> {
        let client = self.clients.get(&client_id).ok_or(AppError::NotInRoom)?;
        let room_name = client.room.clone().ok_or(AppError::NotInRoom)?;
        Ok((room_name, client.name.clone()))
    }

    /// Helper: Remove a client from its room, if any, and tell the others
    fn leave_current_room(&mut self, client_id: ClientId) {
        let Some(client) = self.clients.get_mut(&client_id) else {
            return;
        };
        let Some(room_name) = client.room.take() else {
            return;
        };
        let name = client.name.clone();

        if let Some(room) = self.rooms.get_mut(&room_name) {
            room.remove_member(client_id);
            info!("Client {} ({}) left room '{}'", client_id, name, room.name);
            if room.is_empty() {
                debug!("Room '{}' is now empty", room.name);
            }
        }

        self.broadcast(&room_name, client_id, ServerMessage::MemberLeft { name });
    }

    /// Helper: Broadcast to a room, remembering members that overflowed
    fn broadcast(&mut self, room_name: &RoomName, sender: ClientId, msg: ServerMessage) {
        if let Some(room) = self.rooms.get(room_name) {
            let overflowed = room.broadcast(&self.clients, sender, &msg);
            self.overflowed.extend(overflowed);
        }
    }

    /// Helper: Queue a message for one client, remembering an overflow
    fn send_to(&mut self, client_id: ClientId, msg: ServerMessage) {
        let Some(client) = self.clients.get(&client_id) else {
            return;
        };

        match client.send_message(msg) {
            Ok(()) => {}
            Err(SendError::BufferFull) => self.overflowed.push(client_id),
            Err(SendError::ChannelClosed) => {
                debug!("Client {} channel already closed", client_id);
            }
        }
    }

    /// Helper: Queue an error line for one client, remembering an overflow
    fn send_error_to(&mut self, client_id: ClientId, err: AppError) {
        let Some(client) = self.clients.get(&client_id) else {
            return;
        };

        match client.send_error(err) {
            Ok(()) => {}
            Err(SendError::BufferFull) => self.overflowed.push(client_id),
            Err(SendError::ChannelClosed) => {
                debug!("Client {} channel already closed", client_id);
            }
        }
    }

    /// Helper: Drop messages for, or evict, clients that could not keep up
    ///
    /// Evicting broadcasts a left notice, which can overflow further
    /// clients, so this runs until the list is empty.
    fn apply_overflow_policy(&mut self) {
        while let Some(client_id) = self.overflowed.pop() {
            match self.overflow_policy {
                OverflowPolicy::Drop => {
                    warn!("Outbound buffer full, dropped message for {}", client_id);
                }
                OverflowPolicy::Disconnect => {
                    if !self.clients.contains_key(&client_id) {
                        continue;
                    }
                    warn!("Outbound buffer full, evicting {}", client_id);
                    self.leave_current_room(client_id);
                    self.clients.remove(&client_id);
                }
            }
        }
    }
}
