//! The typed handler table: registration, the one-class-per-type invariant,
//! and dispatch resolution.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::default_handler::DefaultHandler;
use super::handler::{Handler, HandlerAdapter, TypedHandler};
use crate::format::Message;

/// In-process dispatch counters.
///
/// Plain counters, not a wire-facing metrics exporter.
#[derive(Debug, Default)]
pub struct DispatcherStats {
    messages_processed: AtomicU64,
    messages_unhandled: AtomicU64,
}

impl DispatcherStats {
    /// Total messages resolved through [`HandlerDispatcher::find_handlers_for`].
    #[must_use]
    pub fn messages_processed(&self) -> u64 { self.messages_processed.load(Ordering::Relaxed) }

    /// Messages that fell through to [`DefaultHandler`] because no bucket or
    /// predicate matched.
    #[must_use]
    pub fn messages_unhandled(&self) -> u64 { self.messages_unhandled.load(Ordering::Relaxed) }
}

/// Registration-time failure: violating the one-class-per-type handler
/// invariant is a programmer mistake, so it fails registration rather than
/// dispatch.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Two handlers were registered for the same `messageType` with
    /// different expected message classes.
    #[error(
        "conflicting expected class for message type {message_type:?}: already registered as \
         {existing}, attempted to register {attempted}"
    )]
    ConflictingExpectedClass {
        /// The message type both handlers were registered for.
        message_type: String,
        /// The expected class already bound to this type.
        existing: &'static str,
        /// The expected class the new registration attempted to bind.
        attempted: &'static str,
    },
}

struct Bucket {
    expected_class: TypeId,
    expected_class_name: &'static str,
    handlers: Vec<Arc<dyn Handler>>,
}

/// Holds registered handlers keyed by logical message type and resolves the
/// list to invoke for an incoming message.
pub struct HandlerDispatcher {
    buckets: HashMap<String, Bucket>,
    default_handler: Arc<dyn Handler>,
    stats: DispatcherStats,
}

impl Default for HandlerDispatcher {
    fn default() -> Self { Self::new() }
}

impl HandlerDispatcher {
    /// Create an empty dispatcher. [`DefaultHandler`] is always available as
    /// the fallback and does not need separate registration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: HashMap::new(),
            default_handler: Arc::new(DefaultHandler),
            stats: DispatcherStats::default(),
        }
    }

    /// In-process dispatch counters accumulated since this dispatcher was
    /// created.
    #[must_use]
    pub const fn stats(&self) -> &DispatcherStats { &self.stats }

    /// Register an already type-erased handler.
    ///
    /// # Errors
    /// Returns [`DispatchError::ConflictingExpectedClass`] if a handler is
    /// already registered for this handler's `messageType` with a different
    /// expected message class.
    pub fn register(&mut self, handler: Arc<dyn Handler>) -> Result<(), DispatchError> {
        let message_type = handler.message_type().to_owned();
        let bucket = self.buckets.entry(message_type.clone()).or_insert_with(|| Bucket {
            expected_class: handler.expected_message_class(),
            expected_class_name: handler.expected_message_class_name(),
            handlers: Vec::new(),
        });
        if !bucket.handlers.is_empty() && bucket.expected_class != handler.expected_message_class() {
            return Err(DispatchError::ConflictingExpectedClass {
                message_type,
                existing: bucket.expected_class_name,
                attempted: handler.expected_message_class_name(),
            });
        }
        bucket.expected_class = handler.expected_message_class();
        bucket.expected_class_name = handler.expected_message_class_name();
        bucket.handlers.push(handler);
        Ok(())
    }

    /// Register a handler expressed through the ergonomic [`TypedHandler`]
    /// interface.
    ///
    /// # Errors
    /// See [`HandlerDispatcher::register`].
    pub fn register_typed<H: TypedHandler>(&mut self, handler: H) -> Result<(), DispatchError> {
        self.register(Arc::new(HandlerAdapter(handler)))
    }

    /// Resolve the non-empty list of handlers to invoke for `message`, in
    /// registration order. Falls back to [`DefaultHandler`] when the bucket
    /// for `message`'s type is absent or every handler's predicate rejects
    /// it: an unregistered type always falls through to the default
    /// handler, without a secondary bucket scan.
    #[must_use]
    pub fn find_handlers_for(&self, message: &dyn Message) -> Vec<Arc<dyn Handler>> {
        self.stats.messages_processed.fetch_add(1, Ordering::Relaxed);
        let Some(bucket) = self.buckets.get(message.message_type()) else {
            self.stats.messages_unhandled.fetch_add(1, Ordering::Relaxed);
            return vec![Arc::clone(&self.default_handler)];
        };
        let matched: Vec<Arc<dyn Handler>> = bucket
            .handlers
            .iter()
            .filter(|h| h.matches(message))
            .cloned()
            .collect();
        if matched.is_empty() {
            self.stats.messages_unhandled.fetch_add(1, Ordering::Relaxed);
            vec![Arc::clone(&self.default_handler)]
        } else {
            matched
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::dispatch::{HandlerContext, HandlerError};

    #[derive(Debug)]
    struct MsgA;
    impl Message for MsgA {
        fn message_type(&self) -> &str { "t" }

        fn as_any(&self) -> &dyn std::any::Any { self }
    }

    #[derive(Debug)]
    struct MsgB;
    impl Message for MsgB {
        fn message_type(&self) -> &str { "t" }

        fn as_any(&self) -> &dyn std::any::Any { self }
    }

    struct HandlerA;
    #[async_trait]
    impl TypedHandler for HandlerA {
        type Expected = MsgA;

        fn message_type(&self) -> &str { "t" }

        async fn handle(&self, _ctx: &mut HandlerContext<'_>, _typed: &MsgA) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    struct HandlerB;
    #[async_trait]
    impl TypedHandler for HandlerB {
        type Expected = MsgB;

        fn message_type(&self) -> &str { "t" }

        async fn handle(&self, _ctx: &mut HandlerContext<'_>, _typed: &MsgB) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    #[test]
    fn registering_same_type_with_different_class_fails() {
        let mut dispatcher = HandlerDispatcher::new();
        dispatcher.register_typed(HandlerA).unwrap();
        let err = dispatcher.register_typed(HandlerB).unwrap_err();
        assert!(matches!(err, DispatchError::ConflictingExpectedClass { .. }));
    }

    #[test]
    fn registering_same_type_with_same_class_succeeds() {
        let mut dispatcher = HandlerDispatcher::new();
        dispatcher.register_typed(HandlerA).unwrap();
        dispatcher.register_typed(HandlerA).unwrap();
    }

    #[test]
    fn find_handlers_for_falls_back_to_default_for_unregistered_type() {
        let dispatcher = HandlerDispatcher::new();
        let handlers = dispatcher.find_handlers_for(&MsgA);
        assert_eq!(handlers.len(), 1);
        assert_eq!(handlers[0].message_type(), "*");
    }

    #[test]
    fn stats_count_processed_and_unhandled_messages() {
        let mut dispatcher = HandlerDispatcher::new();
        dispatcher.register_typed(HandlerA).unwrap();

        dispatcher.find_handlers_for(&MsgA);
        dispatcher.find_handlers_for(&MsgB);

        assert_eq!(dispatcher.stats().messages_processed(), 2);
        assert_eq!(dispatcher.stats().messages_unhandled(), 1);
    }

    #[test]
    fn find_handlers_for_filters_by_type_and_class() {
        let mut dispatcher = HandlerDispatcher::new();
        dispatcher.register_typed(HandlerA).unwrap();

        struct HandlerOther;
        #[async_trait]
        impl TypedHandler for HandlerOther {
            type Expected = MsgA;

            fn message_type(&self) -> &str { "other" }

            async fn handle(&self, _ctx: &mut HandlerContext<'_>, _typed: &MsgA) -> Result<(), HandlerError> {
                Ok(())
            }
        }
        dispatcher.register_typed(HandlerOther).unwrap();

        let handlers = dispatcher.find_handlers_for(&MsgA);
        assert_eq!(handlers.len(), 1);
        assert_eq!(handlers[0].message_type(), "t");
    }
}
