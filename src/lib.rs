//! Line-Oriented Channel Chat Server Library
//!
//! A multi-client TCP chat server built on tokio. Clients send one
//! line per command: the first line is their name, later lines are plain
//! chat for their current channel or `/` commands.
//!
//! # Features
//! - Unique name registration, bounded number of clients
//! - Free-form channels that exist while someone is in them
//! - Channel broadcast, `/join`, `/leave`, `/list`, `/who`
//! - Private messages with `/msg @name text`
//! - Append-only chat log of every broadcast
//! - Operator shutdown that stops admitting new connections
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `RegistryServer` is the actor owning the client registry
//! - Each connection has a `handler` task driving its `Session`
//! - Each connection has a write task draining its outbound queue
//! - Deliveries go over registry snapshots, never while the actor works
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use line_chat_server::{serve, Config, ServerContext};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!     let listener = TcpListener::bind(&config.bind_addr).await.unwrap();
//!     let ctx = ServerContext::start(&config);
//!
//!     serve(listener, ctx, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await;
//! }
//! ```

pub mod chat_log;
pub mod client;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod handler;
pub mod message;
pub mod registry;
pub mod server;
pub mod supervisor;
pub mod types;

// Re-export main types for convenience
pub use chat_log::ChatLog;
pub use client::ClientRecord;
pub use command::Command;
pub use config::Config;
pub use engine::{Flow, Session};
pub use error::{AppError, ConfigError, RegistryError, SendError};
pub use handler::{handle_connection, ServerContext};
pub use message::{ErrorCode, ServerMessage};
pub use registry::Registry;
pub use server::{RegistryCommand, RegistryHandle, RegistryServer};
pub use supervisor::serve;
pub use types::{ConnectionId, DisplayTag};
