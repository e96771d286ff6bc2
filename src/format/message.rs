//! The high-level, typed surface dispatched to handlers.

use std::any::Any;
use std::fmt::Debug;

/// A decoded, dispatchable unit produced by a [`super::Format`].
///
/// Two different formats may produce two different concrete [`Message`]
/// implementations that report the same [`Message::message_type`] — see the
/// dispatcher's one-class-per-type invariant in [`crate::dispatch`].
pub trait Message: Debug + Send + Sync {
    /// The logical type this message carries, used as the dispatch key.
    fn message_type(&self) -> &str;

    /// Expose the concrete type for the dispatcher's downcast bridge.
    fn as_any(&self) -> &dyn Any;
}
