//! Error types for the chat server
//!
//! Defines application-level errors, registry rejections, message send
//! errors and configuration errors. Uses thiserror for ergonomic error
//! definitions.

use thiserror::Error;
use tokio_util::codec::AnyDelimiterCodecError;

/// Application-level errors
///
/// Covers both fatal errors (connection termination) and
/// business errors (send error message to client).
#[derive(Debug, Error)]
pub enum AppError {
    /// Read failure, including over-long lines (fatal)
    #[error("Line codec error: {0}")]
    Codec(#[from] AnyDelimiterCodecError),

    /// Registry actor is gone (fatal)
    #[error("Registry unavailable")]
    RegistryUnavailable,

    /// Outbound queue of this connection is closed (fatal)
    #[error("Connection closed")]
    ConnectionClosed,

    /// Proposed name fails the identifier policy
    #[error("Invalid username")]
    InvalidName,

    /// Proposed name is held by another client
    #[error("Username already taken")]
    NameTaken,

    /// Registry is at capacity
    #[error("Server is full")]
    ServerFull,

    /// Malformed or unknown command
    #[error("Unrecognized input")]
    UnrecognizedInput,

    /// Channel name fails the identifier policy
    #[error("Invalid channel name")]
    InvalidChannelName,

    /// Chat text sent while not in a channel
    #[error("Channel required to send messages")]
    ChannelRequired,

    /// Channel query issued while not in a channel
    #[error("Not in channel")]
    NotInChannel,

    /// Private message target is not registered
    #[error("User not found: {0}")]
    UserNotFound(String),
}

impl AppError {
    /// Whether this error ends the connection
    ///
    /// Registration errors are terminal too, but only before the
    /// connection is active; the handler deals with them separately.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Codec(_)
                | AppError::RegistryUnavailable
                | AppError::ConnectionClosed
        )
    }
}

/// Registry rejections
///
/// Expected, recoverable outcomes of `register`; the registry is left
/// unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Another record already holds the name
    #[error("Name already registered")]
    NameTaken,

    /// Registry holds the maximum number of records
    #[error("Registry is full")]
    Full,
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NameTaken => AppError::NameTaken,
            RegistryError::Full => AppError::ServerFull,
        }
    }
}

/// Message send errors
///
/// Occurs when attempting to send messages through closed channels.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}

impl From<SendError> for AppError {
    fn from(_: SendError) -> Self {
        AppError::ConnectionClosed
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for `Config`
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Environment override could not be parsed
    #[error("Invalid value {value:?} for {key}")]
    InvalidEnv { key: String, value: String },

    /// A limit was set to zero
    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),
}
