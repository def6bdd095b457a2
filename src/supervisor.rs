//! Accept loop
//!
//! Accepts connections and spawns one detached handler task per
//! connection. Shutdown only stops admitting new connections; tasks that
//! are already running keep going until their peers leave.

use std::future::Future;

use tokio::net::TcpListener;
use tracing::{error, info};

use crate::handler::{handle_connection, ServerContext};

/// Accept connections on `listener` until `shutdown` resolves
///
/// The listener is dropped on return, which closes the listening socket.
pub async fn serve<F>(listener: TcpListener, ctx: ServerContext, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested, no longer accepting connections");
                break;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, addr)) => {
                        info!("New connection from {}", addr);
                        let ctx = ctx.clone();

                        // Spawn handler task for each connection
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, addr.to_string(), ctx).await {
                                error!("Connection handler error: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                }
            }
        }
    }
}
