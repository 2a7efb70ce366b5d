//! Room struct definition
//!
//! A named set of members. Rooms only store client IDs; the client
//! table lives in the `ChatServer` actor and is passed in when a room
//! needs to reach its members.

use std::collections::{HashMap, HashSet};

use crate::client::Client;
use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::{ClientId, RoomName};

/// Chat room
///
/// Created on the first join to an unseen name and never removed,
/// even after the last member leaves.
#[derive(Debug)]
pub struct Room {
    /// Room name
    pub name: RoomName,
    /// Current members
    members: HashSet<ClientId>,
}

impl Room {
    /// Create an empty room
    pub fn new(name: RoomName) -> Self {
        Self {
            name,
            members: HashSet::new(),
        }
    }

    pub fn add_member(&mut self, client_id: ClientId) {
        self.members.insert(client_id);
    }

    /// Returns false if the client wasn't a member
    pub fn remove_member(&mut self, client_id: ClientId) -> bool {
        self.members.remove(&client_id)
    }

    pub fn contains(&self, client_id: ClientId) -> bool {
        self.members.contains(&client_id)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Send `msg` to every member except `sender`
    ///
    /// Never waits on a client. Returns the members whose outbound
    /// buffer was full so the caller can apply its overflow policy.
    pub fn broadcast(
        &self,
        clients: &HashMap<ClientId, Client>,
        sender: ClientId,
        msg: &ServerMessage,
    ) -> Vec<ClientId> {
        self.members
            .iter()
            .filter(|id| **id != sender)
            .filter_map(|id| clients.get(id))
            .filter_map(|member| match member.send_message(msg.clone()) {
                Err(SendError::BufferFull) => Some(member.id),
                // Closed channels are cleaned up by the pending Disconnect
                Err(SendError::ChannelClosed) | Ok(()) => None,
            })
            .collect()
    }

    /// Display names of every member except `excluding` (unspecified order)
    pub fn members_list(
        &self,
        clients: &HashMap<ClientId, Client>,
        excluding: ClientId,
    ) -> Vec<String> {
        self.members
            .iter()
            .filter(|id| **id != excluding)
            .filter_map(|id| clients.get(id))
            .map(|member| member.name.clone())
            .collect()
    }
}
