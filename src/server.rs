//! Registry actor implementation
//!
//! The central actor that owns the [`Registry`]. Connection tasks never
//! touch the table directly: they send `RegistryCommand`s through a
//! [`RegistryHandle`] and receive results on oneshot channels. The actor
//! processes one command at a time, which linearizes every registry read
//! and mutation.
//!
//! The actor performs no network I/O. Delivery to other clients happens
//! in the caller, over the owned snapshot the actor replied with.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::client::ClientRecord;
use crate::error::{AppError, RegistryError};
use crate::message::ServerMessage;
use crate::registry::Registry;
use crate::types::ConnectionId;

/// Channel buffer size for registry commands
const COMMAND_BUFFER_SIZE: usize = 256;

/// Commands sent from connection tasks to the registry actor
#[derive(Debug)]
pub enum RegistryCommand {
    /// Register a connection under a name
    Register {
        connection: ConnectionId,
        name: String,
        outbox: mpsc::Sender<ServerMessage>,
        reply: oneshot::Sender<Result<ClientRecord, RegistryError>>,
    },
    /// Remove a connection's record
    Unregister {
        connection: ConnectionId,
        reply: oneshot::Sender<Option<ClientRecord>>,
    },
    /// Look up by connection
    Find {
        connection: ConnectionId,
        reply: oneshot::Sender<Option<ClientRecord>>,
    },
    /// Look up by exact name
    FindByName {
        name: String,
        reply: oneshot::Sender<Option<ClientRecord>>,
    },
    /// Set a connection's channel
    SetChannel {
        connection: ConnectionId,
        channel: String,
        reply: oneshot::Sender<bool>,
    },
    /// Clear a connection's channel
    ClearChannel {
        connection: ConnectionId,
        reply: oneshot::Sender<bool>,
    },
    /// Records currently in a channel
    SnapshotByChannel {
        channel: String,
        reply: oneshot::Sender<Vec<ClientRecord>>,
    },
    /// Distinct active channels
    Channels { reply: oneshot::Sender<Vec<String>> },
}

/// The registry actor
///
/// Owns the table and processes commands until every handle is dropped.
pub struct RegistryServer {
    registry: Registry,
    receiver: mpsc::Receiver<RegistryCommand>,
}

impl RegistryServer {
    /// Create a new actor over `registry` with the given command receiver
    pub fn new(registry: Registry, receiver: mpsc::Receiver<RegistryCommand>) -> Self {
        Self { registry, receiver }
    }

    /// Run the actor event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!(capacity = self.registry.capacity(), "Registry started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("Registry shutting down");
    }

    /// Process a single command
    ///
    /// A dropped reply receiver means the caller went away; the command's
    /// effect on the table still stands.
    fn handle_command(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::Register {
                connection,
                name,
                outbox,
                reply,
            } => {
                let result = self.registry.register(connection, &name, outbox);
                if result.is_ok() {
                    debug!(
                        "Registered {} as '{}', total clients: {}",
                        connection,
                        name,
                        self.registry.len()
                    );
                }
                let _ = reply.send(result);
            }
            RegistryCommand::Unregister { connection, reply } => {
                let removed = self.registry.unregister(connection);
                if let Some(record) = &removed {
                    debug!(
                        "Unregistered '{}', total clients: {}",
                        record.name,
                        self.registry.len()
                    );
                }
                let _ = reply.send(removed);
            }
            RegistryCommand::Find { connection, reply } => {
                let _ = reply.send(self.registry.find(connection).cloned());
            }
            RegistryCommand::FindByName { name, reply } => {
                let _ = reply.send(self.registry.find_by_name(&name).cloned());
            }
            RegistryCommand::SetChannel {
                connection,
                channel,
                reply,
            } => {
                let _ = reply.send(self.registry.set_channel(connection, &channel));
            }
            RegistryCommand::ClearChannel { connection, reply } => {
                let _ = reply.send(self.registry.clear_channel(connection));
            }
            RegistryCommand::SnapshotByChannel { channel, reply } => {
                let _ = reply.send(self.registry.snapshot_by_channel(&channel));
            }
            RegistryCommand::Channels { reply } => {
                let _ = reply.send(self.registry.channels());
            }
        }
    }
}

/// Cloneable handle to the registry actor
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    sender: mpsc::Sender<RegistryCommand>,
}

impl RegistryHandle {
    /// Spawn a registry actor holding at most `capacity` clients
    ///
    /// Must be called within a tokio runtime.
    pub fn spawn(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(COMMAND_BUFFER_SIZE);
        tokio::spawn(RegistryServer::new(Registry::new(capacity), receiver).run());
        Self { sender }
    }

    /// Register `connection` under `name`
    ///
    /// The outer error is fatal (actor gone); the inner one is the
    /// registry's rejection.
    pub async fn register(
        &self,
        connection: ConnectionId,
        name: &str,
        outbox: mpsc::Sender<ServerMessage>,
    ) -> Result<Result<ClientRecord, RegistryError>, AppError> {
        self.request(|reply| RegistryCommand::Register {
            connection,
            name: name.to_string(),
            outbox,
            reply,
        })
        .await
    }

    /// Remove `connection`'s record; a no-op if absent
    pub async fn unregister(
        &self,
        connection: ConnectionId,
    ) -> Result<Option<ClientRecord>, AppError> {
        self.request(|reply| RegistryCommand::Unregister { connection, reply })
            .await
    }

    /// Look up by connection
    pub async fn find(&self, connection: ConnectionId) -> Result<Option<ClientRecord>, AppError> {
        self.request(|reply| RegistryCommand::Find { connection, reply })
            .await
    }

    /// Look up by exact name
    pub async fn find_by_name(&self, name: &str) -> Result<Option<ClientRecord>, AppError> {
        self.request(|reply| RegistryCommand::FindByName {
            name: name.to_string(),
            reply,
        })
        .await
    }

    /// Set `connection`'s channel
    pub async fn set_channel(&self, connection: ConnectionId, channel: &str) -> Result<bool, AppError> {
        self.request(|reply| RegistryCommand::SetChannel {
            connection,
            channel: channel.to_string(),
            reply,
        })
        .await
    }

    /// Clear `connection`'s channel
    pub async fn clear_channel(&self, connection: ConnectionId) -> Result<bool, AppError> {
        self.request(|reply| RegistryCommand::ClearChannel { connection, reply })
            .await
    }

    /// Records in `channel` at a single instant
    pub async fn snapshot_by_channel(&self, channel: &str) -> Result<Vec<ClientRecord>, AppError> {
        self.request(|reply| RegistryCommand::SnapshotByChannel {
            channel: channel.to_string(),
            reply,
        })
        .await
    }

    /// Distinct active channels in first-seen order
    pub async fn channels(&self) -> Result<Vec<String>, AppError> {
        self.request(|reply| RegistryCommand::Channels { reply })
            .await
    }

    /// Send a command and wait for its reply
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RegistryCommand,
    ) -> Result<T, AppError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(make(reply))
            .await
            .map_err(|_| AppError::RegistryUnavailable)?;
        response.await.map_err(|_| AppError::RegistryUnavailable)
    }
}

#[cfg(test)]
impl RegistryHandle {
    /// Handle whose commands arrive on a receiver the test drives by hand
    pub(crate) fn from_sender(sender: mpsc::Sender<RegistryCommand>) -> Self {
        Self { sender }
    }
}
