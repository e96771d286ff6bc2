//! The TCP connection server: accepting sockets, the per-packet decode and
//! dispatch pipeline, and the player-registry contract connections report
//! activity through.
//!
//! [`ConnectionServer::serve`] owns the accept loop; each accepted socket is
//! wrapped in a [`Connection`] (the concrete [`crate::dispatch::ConnectionSink`])
//! and runs [`handle_message`] once per read. No framing is imposed here —
//! each socket read yields one packet.

mod pipeline;
mod registry;
mod server;
mod sink;

pub use pipeline::{EMPTY_DATA_TYPE, handle_message};
pub use registry::{NoopPlayerRegistry, PlayerRegistry};
pub use server::{BoundConnectionServer, ConnectionServer, ServerError};
pub use sink::Connection;
