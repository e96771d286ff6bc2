//! The production [`ConnectionSink`] implementation over a live TCP socket.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tracing::debug;

use crate::dispatch::ConnectionSink;
use crate::format::hex_ascii_preview;
use crate::reserved::UNDETERMINED_PLAYER_ID;

/// One accepted socket's write half plus its mutable player id.
///
/// `player_id` starts at [`UNDETERMINED_PLAYER_ID`] and is expected to
/// transition at most once, on successful authentication.
pub struct Connection {
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    player_id: Mutex<String>,
}

impl Connection {
    /// Wrap a socket's write half as a fresh, unauthenticated connection.
    #[must_use]
    pub fn new(writer: OwnedWriteHalf) -> Self {
        Self {
            writer: tokio::sync::Mutex::new(writer),
            player_id: Mutex::new(UNDETERMINED_PLAYER_ID.to_owned()),
        }
    }

    /// Whether this connection has transitioned past the sentinel player id.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.player_id
            .lock()
            .is_ok_and(|id| id.as_str() != UNDETERMINED_PLAYER_ID)
    }

    /// Flush and close the underlying socket. Idempotent; safe to call even
    /// if the peer already disconnected.
    pub async fn shutdown(&self) {
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
    }
}

#[async_trait]
impl ConnectionSink for Connection {
    async fn send_raw(&self, bytes: &[u8], log_output: bool, log_full: bool) {
        if log_output {
            if log_full {
                debug!(len = bytes.len(), preview = %hex_ascii_preview(bytes), "sending");
            } else {
                debug!(len = bytes.len(), "sending");
            }
        }
        let mut writer = self.writer.lock().await;
        if let Err(err) = writer.write_all(bytes).await {
            debug!(error = %err, "write failed");
        }
    }

    fn update_player_id(&self, new_id: String) {
        if let Ok(mut guard) = self.player_id.lock() {
            *guard = new_id;
        }
    }

    fn player_id(&self) -> String {
        self.player_id
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_else(|_| UNDETERMINED_PLAYER_ID.to_owned())
    }
}
