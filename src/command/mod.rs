//! Internal operator commands: a typed, schema-validated argument struct
//! dispatched by name.
//!
//! Mirrors [`crate::format`] and [`crate::dispatch`]'s two-trait shape:
//! implementors write against [`TypedCommand`]; the dispatcher stores a
//! type-erased adapter internally. Registration validates the command's
//! declared [`ArgumentSpec`]s against its argument type's natural default,
//! so a malformed schema fails at startup rather than at dispatch time.

mod codec;
mod context;
mod outcome;
mod registry;
mod schema;
mod traits;

pub use codec::JsonCodec;
pub use traits::TypedCommand;
pub use context::CommandContext;
pub use outcome::CommandOutcome;
pub use registry::{CommandDispatcher, CommandRegistrationError, CommandRequest};
pub use schema::{ArgumentSpec, SchemaError};
