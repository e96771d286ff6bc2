//! The session manager: token issuance, verification, refresh, and the
//! background sweeper that enforces absolute session lifetime.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use super::clock::{Clock, RealClock};
use crate::reserved::{ADMIN_TOKEN, ADMIN_USER_ID};

/// Default duration a freshly-issued session remains valid for.
pub const DEFAULT_SESSION_DURATION: Duration = Duration::from_secs(60 * 60);
/// Default absolute lifetime a session may reach, regardless of refreshes.
pub const DEFAULT_ABSOLUTE_LIFETIME: Duration = Duration::from_secs(6 * 60 * 60);
/// Default interval between sweeper passes.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// A live session record, returned to callers of [`SessionManager::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Opaque bearer token identifying this session.
    pub token: String,
    /// The authenticated user id this session belongs to.
    pub user_id: String,
    /// When this session was issued, in milliseconds since the epoch.
    pub issued_at: u64,
    /// When the current validity window expires, in milliseconds since the
    /// epoch.
    pub expires_at: u64,
}

struct Entry {
    user_id: String,
    issued_at: u64,
    expires_at: u64,
    valid_for_millis: u64,
    lifetime_millis: u64,
}

/// Tunables for a [`SessionManager`].
#[derive(Debug, Clone, Copy)]
pub struct SessionManagerConfig {
    /// How often the sweeper removes absolutely-expired entries.
    pub cleanup_interval: Duration,
    /// Default per-session validity window when the caller omits one.
    pub default_valid_for: Duration,
    /// Cap on a session's total lifetime, regardless of refreshes.
    pub absolute_lifetime: Duration,
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self {
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            default_valid_for: DEFAULT_SESSION_DURATION,
            absolute_lifetime: DEFAULT_ABSOLUTE_LIFETIME,
        }
    }
}

struct Inner<C> {
    clock: C,
    config: SessionManagerConfig,
    sessions: RwLock<HashMap<String, Entry>>,
}

/// Issues and tracks time-bounded session tokens.
///
/// `create`/`verify`/`refresh`/`get_user_id` are synchronous and
/// non-suspending by design; only the sweeper, started via
/// [`SessionManager::spawn_sweeper`], runs as a background task.
pub struct SessionManager<C: Clock = RealClock> {
    inner: Arc<Inner<C>>,
    sweeper: Option<(CancellationToken, JoinHandle<()>)>,
}

impl<C: Clock + 'static> SessionManager<C> {
    /// Build a manager over the given clock and configuration, without
    /// starting its sweeper.
    #[must_use]
    pub fn new(clock: C, config: SessionManagerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                clock,
                config,
                sessions: RwLock::new(HashMap::new()),
            }),
            sweeper: None,
        }
    }

    /// Issue a session for `user_id`, valid for `valid_for` (or the
    /// configured default) with an absolute cap of `lifetime` (or the
    /// configured default). The reserved admin user id always receives
    /// [`ADMIN_TOKEN`] rather than a fresh UUID.
    #[must_use]
    pub fn create(&self, user_id: impl Into<String>, valid_for: Option<Duration>, lifetime: Option<Duration>) -> Session {
        let user_id = user_id.into();
        let valid_for = valid_for.unwrap_or(self.inner.config.default_valid_for);
        let lifetime = lifetime.unwrap_or(self.inner.config.absolute_lifetime);
        let now = self.inner.clock.now_millis();
        let token = if user_id == ADMIN_USER_ID {
            ADMIN_TOKEN.to_owned()
        } else {
            Uuid::new_v4().to_string()
        };
        let valid_for_millis = duration_millis(valid_for);
        let expires_at = now.saturating_add(valid_for_millis);
        let entry = Entry {
            user_id: user_id.clone(),
            issued_at: now,
            expires_at,
            valid_for_millis,
            lifetime_millis: duration_millis(lifetime),
        };
        if let Ok(mut sessions) = self.inner.sessions.write() {
            sessions.insert(token.clone(), entry);
        }
        Session {
            token,
            user_id,
            issued_at: now,
            expires_at,
        }
    }

    /// True iff `token` is known and its validity window has not elapsed.
    #[must_use]
    pub fn verify(&self, token: &str) -> bool {
        let now = self.inner.clock.now_millis();
        self.inner
            .sessions
            .read()
            .ok()
            .and_then(|sessions| sessions.get(token).map(|entry| now < entry.expires_at))
            .unwrap_or(false)
    }

    /// Extend `token`'s validity window by the session's own `valid_for`
    /// (captured at [`SessionManager::create`], not the manager-wide
    /// default), unless its absolute lifetime has elapsed (in which case the
    /// entry is evicted and `false` is returned). Returns `false` for an
    /// unknown token.
    pub fn refresh(&self, token: &str) -> bool {
        let now = self.inner.clock.now_millis();
        let Ok(mut sessions) = self.inner.sessions.write() else {
            return false;
        };
        let Some(entry) = sessions.get_mut(token) else {
            return false;
        };
        if now.saturating_sub(entry.issued_at) > entry.lifetime_millis {
            sessions.remove(token);
            return false;
        }
        entry.expires_at = now.saturating_add(entry.valid_for_millis);
        true
    }

    /// The user id owning `token`, iff it exists and has not expired.
    /// Expired entries are left for the sweeper rather than removed here.
    #[must_use]
    pub fn get_user_id(&self, token: &str) -> Option<String> {
        let now = self.inner.clock.now_millis();
        self.inner.sessions.read().ok().and_then(|sessions| {
            sessions
                .get(token)
                .filter(|entry| now < entry.expires_at)
                .map(|entry| entry.user_id.clone())
        })
    }

    /// Start the background sweeper, if not already running. Removes every
    /// entry whose absolute lifetime has elapsed, every `cleanup_interval`.
    pub fn spawn_sweeper(&mut self) {
        if self.sweeper.is_some() {
            return;
        }
        let token = CancellationToken::new();
        let child_token = token.clone();
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let mut ticker = interval(inner.config.cleanup_interval);
            loop {
                tokio::select! {
                    () = child_token.cancelled() => break,
                    _ = ticker.tick() => sweep_once(&inner),
                }
            }
        });
        self.sweeper = Some((token, handle));
    }

    /// Cancel the sweeper, wait for it to finish, and clear all sessions.
    pub async fn shutdown(&mut self) {
        if let Some((token, handle)) = self.sweeper.take() {
            token.cancel();
            let _ = handle.await;
        }
        if let Ok(mut sessions) = self.inner.sessions.write() {
            sessions.clear();
        }
    }
}

fn sweep_once<C: Clock>(inner: &Inner<C>) {
    let now = inner.clock.now_millis();
    if let Ok(mut sessions) = inner.sessions.write() {
        let before = sessions.len();
        sessions.retain(|_, entry| now.saturating_sub(entry.issued_at) <= entry.lifetime_millis);
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, "swept expired sessions");
        }
    }
}

fn duration_millis(d: Duration) -> u64 { u64::try_from(d.as_millis()).unwrap_or(u64::MAX) }

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::session::FakeClock;

    fn manager_with(clock: Arc<FakeClock>) -> SessionManager<FakeClockWrapper> {
        SessionManager::new(FakeClockWrapper(clock), SessionManagerConfig::default())
    }

    struct FakeClockWrapper(Arc<FakeClock>);
    impl Clock for FakeClockWrapper {
        fn now_millis(&self) -> u64 { self.0.now_millis() }
    }

    #[test]
    fn s5_session_lifecycle_with_fake_clock() {
        let clock = Arc::new(FakeClock::new(0));
        let manager = manager_with(Arc::clone(&clock));
        let session = manager.create("player1", None, None);
        assert!(manager.verify(&session.token));

        clock.advance(61 * 60 * 1000);
        assert!(!manager.verify(&session.token));
        assert!(manager.refresh(&session.token));
        assert!(manager.verify(&session.token));

        clock.advance(6 * 60 * 60 * 1000);
        assert!(!manager.refresh(&session.token));
        assert!(!manager.verify(&session.token));
    }

    #[test]
    fn admin_user_always_receives_the_reserved_token() {
        let clock = Arc::new(FakeClock::new(0));
        let manager = manager_with(clock);
        let session = manager.create(ADMIN_USER_ID, None, None);
        assert_eq!(session.token, ADMIN_TOKEN);
    }

    #[test]
    fn refresh_extends_by_the_session_s_own_valid_for_not_the_manager_default() {
        let clock = Arc::new(FakeClock::new(0));
        let manager = manager_with(Arc::clone(&clock));
        let session = manager.create("player1", Some(Duration::from_secs(30 * 60)), Some(Duration::from_secs(6 * 60 * 60)));

        clock.advance(29 * 60 * 1000);
        assert!(manager.refresh(&session.token));

        // Had refresh used the manager's 1h default instead of this
        // session's own 30min window, the session would still be valid
        // here; it must not be.
        clock.advance(31 * 60 * 1000);
        assert!(!manager.verify(&session.token));
    }

    #[test]
    fn get_user_id_does_not_remove_expired_entries() {
        let clock = Arc::new(FakeClock::new(0));
        let manager = manager_with(Arc::clone(&clock));
        let session = manager.create("player1", Some(Duration::from_secs(60)), None);
        clock.advance(61 * 1000);
        assert_eq!(manager.get_user_id(&session.token), None);
        // still present for refresh to revive, not evicted by get_user_id
        assert!(manager.refresh(&session.token));
    }
}
