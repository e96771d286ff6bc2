//! Handler traits: the typed, ergonomic surface implementors write against,
//! and the type-erased surface the dispatcher stores.

use std::any::TypeId;

use async_trait::async_trait;

use super::context::HandlerContext;
use crate::format::Message;

/// Error returned by a handler's `handle` body. Propagates out of the
/// per-packet step and terminates only the offending connection.
#[derive(Debug, thiserror::Error)]
#[error("handler failed: {0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    /// Wrap an arbitrary message as a handler failure.
    pub fn new(msg: impl Into<String>) -> Self { Self(msg.into()) }
}

/// A handler bound to exactly one `(messageType, expectedMessageClass)` pair.
///
/// Implement this directly for handlers that do not need the downcast
/// machinery (e.g. [`super::DefaultHandler`]); most handlers should instead
/// implement [`TypedHandler`] and register through
/// [`super::HandlerDispatcher::register_typed`], which wraps them in an
/// adapter implementing this trait.
#[async_trait]
pub trait Handler: Send + Sync {
    /// The logical message type this handler is bound to.
    fn message_type(&self) -> &str;

    /// Identity of the concrete message class this handler expects.
    fn expected_message_class(&self) -> TypeId;

    /// Human-readable name of the expected class, used in registration
    /// conflict errors.
    fn expected_message_class_name(&self) -> &'static str;

    /// Whether this handler should run for `message`: `messageType` must
    /// match and `message` must downcast to the expected concrete class.
    /// [`TypedHandler`] implementors additionally run their
    /// `should_handle` predicate here, after the cast.
    fn matches(&self, message: &dyn Message) -> bool;

    /// Centralized downcast-then-invoke bridge. Re-verifies the expected
    /// class at runtime via `Any::downcast_ref` before calling the typed
    /// `handle` body — the safe equivalent of an unsafe-cast-and-dispatch
    /// discipline.
    ///
    /// # Errors
    /// Returns whatever [`HandlerError`] the handler body produces.
    async fn handle_unsafe(&self, ctx: &mut HandlerContext<'_>) -> Result<(), HandlerError>;
}

/// The ergonomic interface most handlers implement: bound to one concrete
/// expected [`Message`] subtype, with an optional secondary predicate that
/// runs after the cast.
#[async_trait]
pub trait TypedHandler: Send + Sync + 'static {
    /// The concrete message class this handler expects.
    type Expected: Message + 'static;

    /// The logical message type this handler is bound to.
    fn message_type(&self) -> &str;

    /// Secondary domain predicate evaluated after the downcast succeeds.
    /// Returning `false` skips the handler silently. Defaults to always-run.
    fn should_handle(&self, _typed: &Self::Expected) -> bool { true }

    /// Handle the typed message.
    ///
    /// # Errors
    /// Any failure terminates only the owning connection.
    async fn handle(&self, ctx: &mut HandlerContext<'_>, typed: &Self::Expected) -> Result<(), HandlerError>;
}

/// Erases a [`TypedHandler`]'s expected message type so it can be stored as
/// `Arc<dyn Handler>`.
pub(super) struct HandlerAdapter<H>(pub(super) H);

#[async_trait]
impl<H: TypedHandler> Handler for HandlerAdapter<H> {
    fn message_type(&self) -> &str { self.0.message_type() }

    fn expected_message_class(&self) -> TypeId { TypeId::of::<H::Expected>() }

    fn expected_message_class_name(&self) -> &'static str { std::any::type_name::<H::Expected>() }

    fn matches(&self, message: &dyn Message) -> bool {
        if message.message_type() != self.0.message_type() {
            return false;
        }
        message
            .as_any()
            .downcast_ref::<H::Expected>()
            .is_some_and(|typed| self.0.should_handle(typed))
    }

    async fn handle_unsafe(&self, ctx: &mut HandlerContext<'_>) -> Result<(), HandlerError> {
        let Some(typed) = ctx.message().as_any().downcast_ref::<H::Expected>() else {
            return Err(HandlerError::new(format!(
                "expected message class {} did not match at dispatch time",
                std::any::type_name::<H::Expected>()
            )));
        };
        self.0.handle(ctx, typed).await
    }
}
