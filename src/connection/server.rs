//! The TCP connection server: accept loop, per-connection read loop, and
//! structured shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::pipeline::handle_message;
use super::registry::{NoopPlayerRegistry, PlayerRegistry};
use super::sink::Connection;
use crate::dispatch::{ConnectionSink, HandlerDispatcher};
use crate::format::FormatRegistry;
use crate::reserved::UNDETERMINED_PLAYER_ID;

/// Failure establishing the listening socket.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not be bound to the requested address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that failed to bind.
        addr: SocketAddr,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// The read chunk size for per-connection socket reads.
const READ_BUFFER_SIZE: usize = 8192;

/// Owns the listening socket and the format/dispatch tables connections are
/// served against. One [`ConnectionServer`] corresponds to the root
/// supervisor for the connection subsystem.
pub struct ConnectionServer {
    formats: Arc<FormatRegistry>,
    dispatcher: Arc<HandlerDispatcher>,
    player_registry: Arc<dyn PlayerRegistry>,
}

impl ConnectionServer {
    /// Build a server over the given format registry and handler dispatcher,
    /// with no player-registry bookkeeping.
    #[must_use]
    pub fn new(formats: FormatRegistry, dispatcher: HandlerDispatcher) -> Self {
        Self::with_player_registry(formats, dispatcher, Arc::new(NoopPlayerRegistry))
    }

    /// Build a server with a custom [`PlayerRegistry`] collaborator.
    #[must_use]
    pub fn with_player_registry(
        formats: FormatRegistry,
        dispatcher: HandlerDispatcher,
        player_registry: Arc<dyn PlayerRegistry>,
    ) -> Self {
        Self {
            formats: Arc::new(formats),
            dispatcher: Arc::new(dispatcher),
            player_registry,
        }
    }

    /// Bind `addr` and serve connections until `shutdown` fires.
    ///
    /// Convenience wrapper around [`ConnectionServer::bind`] followed by
    /// [`ConnectionServer::run`] for callers that don't need the bound
    /// listener's address (e.g. to resolve an ephemeral port) up front.
    ///
    /// # Errors
    /// Returns [`ServerError::Bind`] if the listener cannot be created.
    pub async fn serve(&self, addr: SocketAddr, shutdown: watch::Receiver<bool>) -> Result<(), ServerError> {
        self.bind(addr).await?.run(shutdown).await;
        Ok(())
    }

    /// Bind the listening socket without serving yet. Splitting bind from
    /// run lets callers discover an OS-assigned port (`addr`'s port `0`)
    /// before connections start arriving — mainly useful in tests. The
    /// returned handle owns clones of this server's shared state, so it is
    /// `'static` and can be handed to [`tokio::spawn`] directly.
    ///
    /// # Errors
    /// Returns [`ServerError::Bind`] if the listener cannot be created.
    pub async fn bind(&self, addr: SocketAddr) -> Result<BoundConnectionServer, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        info!(addr = %listener.local_addr().unwrap_or(addr), "listening");
        Ok(BoundConnectionServer {
            formats: Arc::clone(&self.formats),
            dispatcher: Arc::clone(&self.dispatcher),
            player_registry: Arc::clone(&self.player_registry),
            listener,
        })
    }
}

/// A [`ConnectionServer`] with its listening socket already bound; owns its
/// own clones of the server's shared state, so it is `'static`.
pub struct BoundConnectionServer {
    formats: Arc<FormatRegistry>,
    dispatcher: Arc<HandlerDispatcher>,
    player_registry: Arc<dyn PlayerRegistry>,
    listener: TcpListener,
}

impl BoundConnectionServer {
    /// The address the listener is actually bound to (resolves an ephemeral
    /// port `0` to the one the OS assigned).
    ///
    /// # Errors
    /// Returns the underlying I/O error if the socket's address cannot be
    /// queried.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> { self.listener.local_addr() }

    /// Serve connections until `shutdown` fires. Each accepted socket runs
    /// in its own task, a per-connection child scope: a failing or
    /// finished connection never cancels its siblings or the accept loop.
    /// Returns once every in-flight connection task has completed.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let Self {
            formats,
            dispatcher,
            player_registry,
            listener,
        } = self;
        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((socket, peer)) => {
                            let formats = Arc::clone(&formats);
                            let dispatcher = Arc::clone(&dispatcher);
                            let player_registry = Arc::clone(&player_registry);
                            let conn_shutdown = shutdown.clone();
                            connections.spawn(async move {
                                serve_connection(socket, peer, &formats, &dispatcher, player_registry.as_ref(), conn_shutdown).await;
                            });
                        }
                        Err(err) => warn!(error = %err, "accept failed"),
                    }
                }
            }
        }

        info!("shutting down: draining connections");
        while connections.join_next().await.is_some() {}
    }
}

async fn serve_connection(
    socket: TcpStream,
    peer: SocketAddr,
    formats: &FormatRegistry,
    dispatcher: &HandlerDispatcher,
    player_registry: &dyn PlayerRegistry,
    mut shutdown: watch::Receiver<bool>,
) {
    let (mut reader, writer) = socket.into_split();
    let connection = Connection::new(writer);
    let mut buf = vec![0_u8; READ_BUFFER_SIZE];

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            read = reader.read(&mut buf) => {
                let n = match read {
                    Ok(n) => n,
                    Err(err) => {
                        debug!(%peer, error = %err, "read error; closing connection");
                        break;
                    }
                };
                if n == 0 {
                    break;
                }

                let player_id = connection.player_id();
                player_registry.update_last_activity(&player_id).await;

                let label = if player_id == UNDETERMINED_PLAYER_ID {
                    peer.to_string()
                } else {
                    player_id
                };
                let started = Instant::now();
                match handle_message(formats, dispatcher, &buf[..n], &connection).await {
                    Ok(message_type) => {
                        debug!(
                            r#type = message_type.as_deref().unwrap_or("<none>"),
                            player = %label,
                            duration_ms = started.elapsed().as_millis(),
                            "handled message"
                        );
                    }
                    Err(err) => {
                        warn!(player = %label, error = %err, "handler failed; closing connection");
                        break;
                    }
                }
            }
        }
    }

    let player_id = connection.player_id();
    if player_id != UNDETERMINED_PLAYER_ID {
        player_registry.mark_offline(&player_id).await;
        player_registry.clear_player_context(&player_id).await;
    }
    connection.shutdown().await;
}
