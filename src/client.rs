//! Client record definition
//!
//! One registered connection: its identity, current channel, and the
//! outbound queue used to deliver lines to it.

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::{ConnectionId, DisplayTag};

/// Registered client information
///
/// `name` and `display_tag` are fixed at registration. Only `channel`
/// changes afterwards, and only through the registry.
#[derive(Debug, Clone)]
pub struct ClientRecord {
    /// Connection this record belongs to (registry key)
    pub connection: ConnectionId,
    /// Unique display name
    pub name: String,
    /// Current channel, `None` when not in any
    pub channel: Option<String>,
    /// Presentation color derived from `name`
    pub display_tag: DisplayTag,
    /// Server → Client message queue
    pub outbox: mpsc::Sender<ServerMessage>,
}

impl ClientRecord {
    /// Create a record with no channel and a freshly derived tag
    pub fn new(connection: ConnectionId, name: String, outbox: mpsc::Sender<ServerMessage>) -> Self {
        let display_tag = DisplayTag::for_name(&name);
        Self {
            connection,
            name,
            channel: None,
            display_tag,
            outbox,
        }
    }

    /// Send a message to this client
    ///
    /// Returns an error if the channel is closed (client disconnected).
    pub async fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.outbox
            .send(msg)
            .await
            .map_err(|_| SendError::ChannelClosed)
    }

    /// Name wrapped in the display tag
    pub fn decorated_name(&self) -> String {
        self.display_tag.decorate(&self.name)
    }

    /// Whether this client is currently in `channel`
    pub fn is_in(&self, channel: &str) -> bool {
        self.channel.as_deref() == Some(channel)
    }
}
