//! Typed handler dispatch: resolving and invoking the handlers registered
//! for an incoming [`Message`](crate::format::Message).
//!
//! Mirrors [`crate::format`]'s two-trait shape: implementors write against
//! [`TypedHandler`], bound to one concrete message subtype; [`Handler`] is
//! the type-erased surface [`HandlerDispatcher`] stores and calls. Dispatch
//! is total — an unregistered type, or one every predicate rejects, always
//! resolves to [`DefaultHandler`].

mod context;
mod default_handler;
mod handler;
mod registry;

pub use context::{ConnectionSink, HandlerContext};
pub use default_handler::DefaultHandler;
pub use handler::{Handler, HandlerError, TypedHandler};
pub use registry::{DispatchError, DispatcherStats, HandlerDispatcher};
