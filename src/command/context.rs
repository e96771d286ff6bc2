//! Per-invocation context handed to a command's `execute` body.

/// Identifies who asked for a command to run. Commands are internal
/// operator actions; this is the minimal context an
/// embedder needs to authorize or audit one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandContext {
    /// The user id that invoked this command, if known.
    pub invoked_by: Option<String>,
}

impl CommandContext {
    /// Build a context attributed to `user_id`.
    #[must_use]
    pub fn invoked_by(user_id: impl Into<String>) -> Self {
        Self {
            invoked_by: Some(user_id.into()),
        }
    }
}
