//! The always-present fallback handler.

use std::any::TypeId;

use async_trait::async_trait;
use tracing::warn;

use super::context::HandlerContext;
use super::handler::{Handler, HandlerError};
use crate::format::Message;

/// Matches any message that no registered handler claims. Logs a warning
/// naming the unknown type and performs no writes, guaranteeing
/// [`super::HandlerDispatcher::find_handlers_for`] is total.
pub struct DefaultHandler;

#[async_trait]
impl Handler for DefaultHandler {
    fn message_type(&self) -> &str { "*" }

    fn expected_message_class(&self) -> TypeId { TypeId::of::<()>() }

    fn expected_message_class_name(&self) -> &'static str { "<any>" }

    fn matches(&self, _message: &dyn Message) -> bool { true }

    async fn handle_unsafe(&self, ctx: &mut HandlerContext<'_>) -> Result<(), HandlerError> {
        warn!(
            message_type = ctx.message().message_type(),
            "no handler registered for message type"
        );
        Ok(())
    }
}
