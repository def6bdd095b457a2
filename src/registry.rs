//! Client registry table
//!
//! The bounded table of registered clients. Records are kept in
//! registration order and scanned linearly, which is fine at the stated
//! capacity. The table itself is not synchronized: it is owned by the
//! registry actor in [`crate::server`], which serializes every operation.
//!
//! Channels are not stored anywhere else. A channel exists while at least
//! one record holds its name.

use tokio::sync::mpsc;

use crate::client::ClientRecord;
use crate::error::RegistryError;
use crate::message::ServerMessage;
use crate::types::ConnectionId;

/// Default maximum number of registered clients
pub const DEFAULT_MAX_CLIENTS: usize = 10;

/// Bounded table of registered clients
#[derive(Debug)]
pub struct Registry {
    records: Vec<ClientRecord>,
    capacity: usize,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CLIENTS)
    }
}

impl Registry {
    /// Create an empty registry holding at most `capacity` records
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Register a connection under `name`
    ///
    /// Capacity is checked before uniqueness. Names compare exactly
    /// (case-sensitive). On failure the table is unchanged.
    pub fn register(
        &mut self,
        connection: ConnectionId,
        name: &str,
        outbox: mpsc::Sender<ServerMessage>,
    ) -> Result<ClientRecord, RegistryError> {
        if self.records.len() >= self.capacity {
            return Err(RegistryError::Full);
        }
        if self.records.iter().any(|r| r.name == name) {
            return Err(RegistryError::NameTaken);
        }

        let record = ClientRecord::new(connection, name.to_string(), outbox);
        self.records.push(record.clone());
        Ok(record)
    }

    /// Remove the record for `connection`, returning it if present
    pub fn unregister(&mut self, connection: ConnectionId) -> Option<ClientRecord> {
        let index = self.position(connection)?;
        Some(self.records.remove(index))
    }

    /// Look up a record by connection
    pub fn find(&self, connection: ConnectionId) -> Option<&ClientRecord> {
        self.records.iter().find(|r| r.connection == connection)
    }

    /// Look up a record by exact name
    pub fn find_by_name(&self, name: &str) -> Option<&ClientRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Put `connection` in `channel`, replacing any previous channel
    ///
    /// Returns false if the connection is not registered.
    pub fn set_channel(&mut self, connection: ConnectionId, channel: &str) -> bool {
        match self.find_mut(connection) {
            Some(record) => {
                record.channel = Some(channel.to_string());
                true
            }
            None => false,
        }
    }

    /// Take `connection` out of its channel, if any
    ///
    /// Returns false if the connection is not registered.
    pub fn clear_channel(&mut self, connection: ConnectionId) -> bool {
        match self.find_mut(connection) {
            Some(record) => {
                record.channel = None;
                true
            }
            None => false,
        }
    }

    /// Owned copies of every record currently in `channel`
    pub fn snapshot_by_channel(&self, channel: &str) -> Vec<ClientRecord> {
        self.records
            .iter()
            .filter(|r| r.is_in(channel))
            .cloned()
            .collect()
    }

    /// Distinct non-empty channels, in first-seen order
    pub fn channels(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for channel in self.records.iter().filter_map(|r| r.channel.as_deref()) {
            if !seen.iter().any(|c| c == channel) {
                seen.push(channel.to_string());
            }
        }
        seen
    }

    /// Number of registered clients
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no client is registered
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Maximum number of records
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn position(&self, connection: ConnectionId) -> Option<usize> {
        self.records.iter().position(|r| r.connection == connection)
    }

    fn find_mut(&mut self, connection: ConnectionId) -> Option<&mut ClientRecord> {
        self.records.iter_mut().find(|r| r.connection == connection)
    }
}
