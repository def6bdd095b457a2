//! Routing & command engine
//!
//! A connection moves through three states:
//! - unregistered: no [`Session`] exists yet
//! - active: [`Session::register`] succeeded; every line goes through
//!   [`Session::handle_line`]
//! - terminated: [`Session::close`] consumed the session and removed its
//!   record
//!
//! Deliveries to other clients always go over an owned registry snapshot,
//! after the registry actor has replied. A client that changes channel
//! while a broadcast is in flight may or may not receive it.

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::chat_log::ChatLog;
use crate::client::ClientRecord;
use crate::command::{decode_line, Command};
use crate::error::AppError;
use crate::message::ServerMessage;
use crate::server::RegistryHandle;
use crate::types::{is_valid_channel, is_valid_name, ConnectionId};

/// What the connection loop should do after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading lines
    Continue,
    /// Client asked to quit
    Quit,
}

/// An active, registered connection
#[derive(Debug)]
pub struct Session {
    /// Record as registered; its channel field is not kept current
    record: ClientRecord,
    registry: RegistryHandle,
    chat_log: ChatLog,
}

impl Session {
    /// Validate `name` and register the connection under it
    ///
    /// Any error means the connection never becomes active.
    pub async fn register(
        registry: RegistryHandle,
        chat_log: ChatLog,
        connection: ConnectionId,
        name: &str,
        outbox: mpsc::Sender<ServerMessage>,
    ) -> Result<Self, AppError> {
        if !is_valid_name(name) {
            return Err(AppError::InvalidName);
        }
        let record = registry.register(connection, name, outbox).await??;
        info!("Client {} registered as '{}'", connection, name);

        Ok(Self {
            record,
            registry,
            chat_log,
        })
    }

    /// Registered name
    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// Connection this session belongs to
    pub fn connection(&self) -> ConnectionId {
        self.record.connection
    }

    /// Classify and execute one inbound line
    ///
    /// Command and routing errors are replied to this client and the
    /// session continues. Only fatal errors are returned.
    pub async fn handle_line(&self, line: &str) -> Result<Flow, AppError> {
        let command = Command::parse(line);
        debug!("{} -> {:?}, payload {:?}", self.record.name, command, command.payload());

        let result = match command {
            Command::Plain(text) => self.broadcast(text).await,
            Command::Join(channel) => self.join(channel).await,
            Command::Leave => self.leave().await,
            Command::List => self.list().await,
            Command::Who => self.who().await,
            Command::Msg { target, text } => self.private_message(target, text).await,
            Command::Quit => return Ok(Flow::Quit),
            Command::Invalid | Command::Unknown(_) => Err(AppError::UnrecognizedInput),
        };

        match result {
            Ok(()) => Ok(Flow::Continue),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                debug!("{} command error: {}", self.record.name, e);
                self.reply(e.into()).await?;
                Ok(Flow::Continue)
            }
        }
    }

    /// Decode and execute one raw inbound line
    ///
    /// A line that is not UTF-8 is answered as unrecognized input.
    pub async fn handle_raw(&self, raw: &[u8]) -> Result<Flow, AppError> {
        match decode_line(raw) {
            Some(line) => self.handle_line(line).await,
            None => {
                debug!("{} sent a line that is not UTF-8", self.record.name);
                self.reply(AppError::UnrecognizedInput.into()).await?;
                Ok(Flow::Continue)
            }
        }
    }

    /// Remove this session's record from the registry
    pub async fn close(self) -> Result<(), AppError> {
        self.registry.unregister(self.record.connection).await?;
        info!("Client '{}' unregistered", self.record.name);
        Ok(())
    }

    /// Send chat text to every member of the sender's channel, sender included
    async fn broadcast(&self, text: &str) -> Result<(), AppError> {
        let channel = self.current_channel().await?.ok_or(AppError::ChannelRequired)?;
        let members = self.registry.snapshot_by_channel(&channel).await?;

        self.chat_log.record(&channel, &self.record.name, text);

        let msg = ServerMessage::Chat {
            tag: self.record.display_tag,
            from: self.record.name.clone(),
            content: text.to_string(),
        };
        deliver(&members, &msg).await;
        Ok(())
    }

    async fn join(&self, channel: &str) -> Result<(), AppError> {
        if !is_valid_channel(channel) {
            return Err(AppError::InvalidChannelName);
        }
        self.registry.set_channel(self.connection(), channel).await?;
        info!("'{}' joined {}", self.record.name, channel);

        self.reply(ServerMessage::Joined {
            channel: channel.to_string(),
        })
        .await
    }

    async fn leave(&self) -> Result<(), AppError> {
        self.registry.clear_channel(self.connection()).await?;
        info!("'{}' left their channel", self.record.name);
        self.reply(ServerMessage::Left).await
    }

    async fn list(&self) -> Result<(), AppError> {
        let channels = self.registry.channels().await?;
        self.reply(ServerMessage::ChannelList { channels }).await
    }

    async fn who(&self) -> Result<(), AppError> {
        let channel = self.current_channel().await?.ok_or(AppError::NotInChannel)?;
        let users = self
            .registry
            .snapshot_by_channel(&channel)
            .await?
            .iter()
            .map(ClientRecord::decorated_name)
            .collect();
        self.reply(ServerMessage::UserList { users }).await
    }

    /// Deliver to the named client only; the sender gets no copy
    async fn private_message(&self, target: &str, text: &str) -> Result<(), AppError> {
        let recipient = self
            .registry
            .find_by_name(target)
            .await?
            .ok_or_else(|| AppError::UserNotFound(target.to_string()))?;

        let msg = ServerMessage::PrivateMessage {
            tag: self.record.display_tag,
            from: self.record.name.clone(),
            content: text.to_string(),
        };
        deliver(std::slice::from_ref(&recipient), &msg).await;
        Ok(())
    }

    async fn current_channel(&self) -> Result<Option<String>, AppError> {
        Ok(self
            .registry
            .find(self.connection())
            .await?
            .and_then(|record| record.channel))
    }

    async fn reply(&self, msg: ServerMessage) -> Result<(), AppError> {
        self.record.send(msg).await.map_err(AppError::from)
    }
}

/// Best-effort delivery; a recipient that went away is skipped
async fn deliver(recipients: &[ClientRecord], msg: &ServerMessage) {
    for recipient in recipients {
        if recipient.send(msg.clone()).await.is_err() {
            debug!("Delivery to '{}' dropped, connection closing", recipient.name);
        }
    }
}
