//! Time-bounded authentication tokens.
//!
//! [`SessionManager`] issues, verifies, and refreshes opaque bearer tokens
//! against an injectable [`Clock`], and runs a background sweeper that
//! enforces each session's absolute lifetime independent of its shorter,
//! refreshable validity window.

mod clock;
mod manager;

pub use clock::{Clock, FakeClock, RealClock};
pub use manager::{
    DEFAULT_ABSOLUTE_LIFETIME, DEFAULT_CLEANUP_INTERVAL, DEFAULT_SESSION_DURATION, Session, SessionManager,
    SessionManagerConfig,
};
