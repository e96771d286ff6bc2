//! Per-dispatch context handed to handlers.

use async_trait::async_trait;

use crate::format::Message;

/// The raw byte sink and player-id cell a connection exposes to handlers.
///
/// [`crate::connection::Connection`] is the production implementation;
/// tests substitute a recording stub.
#[async_trait]
pub trait ConnectionSink: Send + Sync {
    /// Write `bytes` back to the peer. `log_output`/`log_full` control
    /// whether and how verbosely the write itself is logged.
    async fn send_raw(&self, bytes: &[u8], log_output: bool, log_full: bool);

    /// Transition the connection's player id. Expected to happen at most
    /// once per connection; implementations are free to assert that.
    fn update_player_id(&self, new_id: String);

    /// The connection's current player id.
    fn player_id(&self) -> String;
}

/// Context built fresh for each `(message, handler)` pairing and passed to
/// [`super::Handler::handle_unsafe`].
pub struct HandlerContext<'a> {
    message: &'a dyn Message,
    sink: &'a dyn ConnectionSink,
}

impl<'a> HandlerContext<'a> {
    /// Build a context for one handler invocation.
    #[must_use]
    pub fn new(message: &'a dyn Message, sink: &'a dyn ConnectionSink) -> Self { Self { message, sink } }

    /// The message being dispatched.
    ///
    /// Returns a borrow tied to the context's own lifetime `'a`, not to
    /// `&self`, so callers can hold the result across a later `&mut self`
    /// reborrow (as [`super::Handler::handle_unsafe`] does to downcast the
    /// message before invoking a handler's typed `handle`).
    #[must_use]
    pub fn message(&self) -> &'a dyn Message { self.message }

    /// The connection's player id at the time of this call.
    #[must_use]
    pub fn player_id(&self) -> String { self.sink.player_id() }

    /// Write bytes back to the peer.
    pub async fn send_raw(&self, bytes: &[u8], log_output: bool, log_full: bool) {
        self.sink.send_raw(bytes, log_output, log_full).await;
    }

    /// Transition the connection's player id.
    pub fn update_player_id(&self, new_id: impl Into<String>) { self.sink.update_player_id(new_id.into()); }
}
