//! Server → client message definitions
//!
//! Every line the server writes is one `ServerMessage`. The `Display`
//! impl is the wire format; multi-line replies contain embedded newlines
//! and the line codec terminates the whole message.

use std::fmt;

use crate::error::AppError;
use crate::types::{DisplayTag, RESET};

/// Server → Client message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Channel broadcast
    Chat {
        tag: DisplayTag,
        from: String,
        content: String,
    },
    /// Private message, delivered to the target only
    PrivateMessage {
        tag: DisplayTag,
        from: String,
        content: String,
    },
    /// Channel joined
    Joined { channel: String },
    /// Channel left
    Left,
    /// Reply to `/list`
    ChannelList { channels: Vec<String> },
    /// Reply to `/who`, names already decorated
    UserList { users: Vec<String> },
    /// Error occurred
    Error { code: ErrorCode, message: String },
}

/// Error codes for ServerMessage::Error
///
/// Represents different error scenarios that can be communicated to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Name rejected by the identifier policy
    InvalidName,
    /// Name held by another client
    NameTaken,
    /// Registry at capacity
    ServerFull,
    /// Malformed or unknown command
    UnrecognizedInput,
    /// Channel rejected by the identifier policy
    InvalidChannel,
    /// Chat attempted without joining a channel
    ChannelRequired,
    /// Channel query without joining a channel
    NotInChannel,
    /// Private message target unknown
    UserNotFound,
    /// Anything fatal that still gets reported
    Internal,
}

/// Convert AppError to ServerMessage for client notification
impl From<&AppError> for ServerMessage {
    fn from(err: &AppError) -> Self {
        let (code, message) = match err {
            AppError::InvalidName => (ErrorCode::InvalidName, "Invalid username."),
            AppError::NameTaken => (ErrorCode::NameTaken, "Username already taken."),
            AppError::ServerFull => (ErrorCode::ServerFull, "Server is full."),
            AppError::UnrecognizedInput => (ErrorCode::UnrecognizedInput, "Unrecognized input"),
            AppError::InvalidChannelName => (ErrorCode::InvalidChannel, "Invalid channel name."),
            AppError::ChannelRequired => {
                (ErrorCode::ChannelRequired, "Join a channel to send messages.")
            }
            AppError::NotInChannel => (ErrorCode::NotInChannel, "You're not in a channel."),
            AppError::UserNotFound(_) => (ErrorCode::UserNotFound, "User not found."),
            // Fatal errors; the connection closes after this reply
            _ => (ErrorCode::Internal, "Internal error"),
        };
        ServerMessage::Error {
            code,
            message: message.to_string(),
        }
    }
}

impl From<AppError> for ServerMessage {
    fn from(err: AppError) -> Self {
        Self::from(&err)
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Chat { tag, from, content } => {
                write!(f, "{tag}{from}{RESET}: {content}")
            }
            ServerMessage::PrivateMessage { tag, from, content } => {
                write!(f, "{tag}[PM from {from}]:{RESET} {content}")
            }
            ServerMessage::Joined { channel } => write!(f, "Joined channel {channel}"),
            ServerMessage::Left => f.write_str("You have left the channel."),
            ServerMessage::ChannelList { channels } => {
                f.write_str("Channels:")?;
                if channels.is_empty() {
                    return f.write_str("\n (none)");
                }
                for channel in channels {
                    write!(f, "\n - {channel}")?;
                }
                Ok(())
            }
            ServerMessage::UserList { users } => {
                f.write_str("Users:")?;
                for name in users {
                    write!(f, "\n - {name}")?;
                }
                Ok(())
            }
            ServerMessage::Error { message, .. } => f.write_str(message),
        }
    }
}
