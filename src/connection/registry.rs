//! The player registry external collaborator.

use async_trait::async_trait;

/// Per-player bookkeeping the connection server delegates to the embedding
/// application: activity timestamps, online/offline state, per-player
/// context, and per-player task cancellation.
///
/// [`NoopPlayerRegistry`] is the default when an embedder has nothing to
/// track; production deployments supply their own implementation.
#[async_trait]
pub trait PlayerRegistry: Send + Sync {
    /// Record that `player_id` was just active.
    async fn update_last_activity(&self, player_id: &str);

    /// Mark `player_id` offline and update its last-login time. Called once,
    /// on per-connection cleanup, for every connection that authenticated.
    async fn mark_offline(&self, player_id: &str);

    /// Remove any per-player context associated with `player_id` and stop
    /// its per-player tasks. Called alongside [`PlayerRegistry::mark_offline`].
    async fn clear_player_context(&self, player_id: &str);
}

/// A [`PlayerRegistry`] that does nothing; the default when an embedder
/// registers no player bookkeeping.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPlayerRegistry;

#[async_trait]
impl PlayerRegistry for NoopPlayerRegistry {
    async fn update_last_activity(&self, _player_id: &str) {}

    async fn mark_offline(&self, _player_id: &str) {}

    async fn clear_player_context(&self, _player_id: &str) {}
}
