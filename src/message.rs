//! Message protocol definitions
//!
//! Newline-delimited text protocol. Client lines are tokenized into a
//! [`Command`]; server lines are rendered from [`ServerMessage`] through
//! its `Display` impl.

use std::fmt;

use crate::error::AppError;

/// Command keyword recognized by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// `/name <displayName>`
    Name,
    /// `/join <roomName>`
    Join,
    /// `/rooms`
    Rooms,
    /// `/msg <text...>`
    Message,
    /// `/members`
    Members,
    /// `/quit`
    Quit,
}

impl CommandKind {
    /// Look up a keyword (case-sensitive)
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "/name" => Some(Self::Name),
            "/join" => Some(Self::Join),
            "/rooms" => Some(Self::Rooms),
            "/msg" => Some(Self::Message),
            "/members" => Some(Self::Members),
            "/quit" => Some(Self::Quit),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Name => "/name",
            Self::Join => "/join",
            Self::Rooms => "/rooms",
            Self::Message => "/msg",
            Self::Members => "/members",
            Self::Quit => "/quit",
        }
    }
}

/// Client → Server command
///
/// `args` holds every token of the line, the keyword included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub kind: CommandKind,
    pub args: Vec<String>,
}

impl Command {
    /// Tokenize one input line
    ///
    /// Returns `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Self>, AppError> {
        let args: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        let Some(keyword) = args.first() else {
            return Ok(None);
        };

        let kind = CommandKind::from_keyword(keyword)
            .ok_or_else(|| AppError::UnknownCommand(keyword.clone()))?;

        Ok(Some(Self { kind, args }))
    }

    /// First argument after the keyword, required by `/name` and `/join`
    pub fn first_arg(&self) -> Result<&str, AppError> {
        self.args
            .get(1)
            .map(String::as_str)
            .ok_or(AppError::MissingArgument(self.kind.keyword()))
    }

    /// Remaining tokens joined by single spaces
    pub fn text(&self) -> String {
        self.args.get(1..).unwrap_or_default().join(" ")
    }
}

/// Server → Client message
///
/// Each variant renders to exactly one line of text (without the newline).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Display name changed
    NameSet { name: String },
    /// Someone else joined the room
    MemberJoined { name: String },
    /// Join confirmation; carries the joiner's own name
    RoomJoined { name: String },
    /// All known room names
    RoomList { rooms: Vec<String> },
    /// Chat message from another member
    Chat { from: String, content: String },
    /// Names of the other members
    MemberList { members: Vec<String> },
    /// Someone left the room
    MemberLeft { name: String },
    /// Sent right before the server closes the connection
    Closing,
    /// Usage error
    Error { message: String },
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameSet { name } => write!(f, "Name is {}", name),
            Self::MemberJoined { name } => write!(f, "{} has joined the room", name),
            Self::RoomJoined { name } => write!(f, "You have joined the room {}", name),
            Self::RoomList { rooms } => write!(f, "Open rooms: {}", rooms.join(", ")),
            Self::Chat { from, content } => write!(f, "{}: {}", from, content),
            Self::MemberList { members } => write!(f, "Members in room: {}", members.join(", ")),
            Self::MemberLeft { name } => write!(f, "{} has left the room", name),
            Self::Closing => f.write_str("Closing connection"),
            Self::Error { message } => f.write_str(message),
        }
    }
}

/// Convert AppError to ServerMessage for client notification
impl From<AppError> for ServerMessage {
    fn from(err: AppError) -> Self {
        ServerMessage::Error {
            message: err.to_string(),
        }
    }
}
