//! Connection handler
//!
//! Runs one connection through registration, the command loop and
//! teardown. Reads happen on the handler task itself; writes go through
//! the connection's outbound queue to a dedicated write task, so other
//! connections can deliver to this one without touching its socket.

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio_util::codec::{AnyDelimiterCodec, FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, info, warn};

use crate::chat_log::ChatLog;
use crate::command::decode_line;
use crate::config::Config;
use crate::engine::{Flow, Session};
use crate::error::AppError;
use crate::message::ServerMessage;
use crate::server::RegistryHandle;
use crate::types::ConnectionId;

/// Pending outbound messages per connection
const OUTBOX_SIZE: usize = 32;

/// Shared state handed to every connection task
#[derive(Debug, Clone)]
pub struct ServerContext {
    pub registry: RegistryHandle,
    pub chat_log: ChatLog,
    pub max_line_length: usize,
}

impl ServerContext {
    /// Spawn the registry actor and chat log writer for `config`
    ///
    /// Must be called within a tokio runtime.
    pub fn start(config: &Config) -> Self {
        let chat_log = match &config.chat_log {
            Some(path) => ChatLog::spawn(path.clone()),
            None => ChatLog::disabled(),
        };
        Self {
            registry: RegistryHandle::spawn(config.max_clients),
            chat_log,
            max_line_length: config.max_line_length,
        }
    }
}

type LineReader<S> = FramedRead<ReadHalf<S>, AnyDelimiterCodec>;

/// Handle one accepted connection until it quits or drops
///
/// Transport errors end the connection like a clean quit. The record is
/// always removed before the connection is released.
pub async fn handle_connection<S>(
    stream: S,
    peer: String,
    ctx: ServerContext,
) -> Result<(), AppError>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let connection = ConnectionId::new();
    debug!("Connection {} from {}", connection, peer);

    let (read_half, write_half) = tokio::io::split(stream);
    // Raw chunks, so a line that is not UTF-8 does not end the stream
    let mut lines = FramedRead::new(
        read_half,
        AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), Vec::new(), ctx.max_line_length),
    );

    // Create channel for server -> client messages
    let (msg_tx, msg_rx) = mpsc::channel::<ServerMessage>(OUTBOX_SIZE);
    let write_task = tokio::spawn(write_loop(write_half, msg_rx, connection));

    let result = match register(&mut lines, connection, msg_tx, &ctx).await {
        Ok(Some(session)) => {
            info!("'{}' connected from {}", session.name(), peer);
            let outcome = run_session(&session, &mut lines).await;
            // Unregister even after a transport error
            if let Err(e) = session.close().await {
                warn!("Failed to unregister {}: {}", connection, e);
            }
            if let Err(e) = &outcome {
                debug!("Connection {} ended with error: {}", connection, e);
            }
            outcome
        }
        Ok(None) => Ok(()),
        Err(e) => Err(e),
    };

    // The write task ends once every queue sender is gone
    drop(lines);
    if let Err(e) = write_task.await {
        warn!("Write task for {} failed: {}", connection, e);
    }

    info!("Connection {} from {} closed", connection, peer);
    result
}

/// Read the proposed name and register it
///
/// Returns `Ok(None)` if the peer left first or registration was
/// rejected; the rejection has been queued for the client by then.
/// Fatal errors are queued as well and then returned.
async fn register<S>(
    lines: &mut LineReader<S>,
    connection: ConnectionId,
    msg_tx: mpsc::Sender<ServerMessage>,
    ctx: &ServerContext,
) -> Result<Option<Session>, AppError>
where
    S: AsyncRead,
{
    let raw = match lines.next().await {
        Some(Ok(raw)) => raw,
        Some(Err(e)) => {
            debug!("Connection {} failed before registering: {}", connection, e);
            return Ok(None);
        }
        None => {
            debug!("Connection {} closed before registering", connection);
            return Ok(None);
        }
    };

    let result = match decode_line(&raw) {
        Some(name) => {
            Session::register(
                ctx.registry.clone(),
                ctx.chat_log.clone(),
                connection,
                name,
                msg_tx.clone(),
            )
            .await
        }
        None => Err(AppError::InvalidName),
    };

    match result {
        Ok(session) => Ok(Some(session)),
        Err(e) => {
            warn!("Rejected registration of {:?} on {}: {}", raw, connection, e);
            let _ = msg_tx.send(ServerMessage::from(&e)).await;
            if e.is_fatal() {
                Err(e)
            } else {
                Ok(None)
            }
        }
    }
}

/// Feed lines to the session until quit, EOF or a fatal error
///
/// EOF and quit are clean; read and delivery failures are returned so the
/// caller can report them after teardown.
async fn run_session<S>(session: &Session, lines: &mut LineReader<S>) -> Result<(), AppError>
where
    S: AsyncRead,
{
    while let Some(raw) = lines.next().await {
        if let Flow::Quit = session.handle_raw(&raw?).await? {
            info!("'{}' quit", session.name());
            return Ok(());
        }
    }

    debug!("'{}' closed the connection", session.name());
    Ok(())
}

/// Drain the outbound queue onto the socket, then shut down the write side
async fn write_loop<S>(
    write_half: WriteHalf<S>,
    mut msg_rx: mpsc::Receiver<ServerMessage>,
    connection: ConnectionId,
) where
    S: AsyncWrite,
{
    let mut sink = FramedWrite::new(write_half, LinesCodec::new());

    while let Some(msg) = msg_rx.recv().await {
        if let Err(e) = sink.send(msg.to_string()).await {
            debug!("Send to {} failed, ending write task: {}", connection, e);
            break;
        }
    }

    let mut write_half = sink.into_inner();
    let _ = write_half.shutdown().await;
    debug!("Write task ended for {}", connection);
}
