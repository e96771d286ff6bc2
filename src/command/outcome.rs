//! The closed result taxonomy a command dispatch resolves to.

/// The outcome of one `handle_command` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The command ran to completion without a domain-level rejection.
    Executed,
    /// `args` did not match the command's declared schema.
    SerializationFails(String),
    /// No command is registered under the requested name.
    CommandNotFound(String),
    /// The command body rejected the request for a domain/logic reason.
    ExecutionFailure(String),
    /// The command body panicked; the message renders the cause.
    Error(String),
}

impl CommandOutcome {
    /// True for [`CommandOutcome::Executed`].
    #[must_use]
    pub fn is_success(&self) -> bool { matches!(self, CommandOutcome::Executed) }
}
