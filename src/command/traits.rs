//! Command traits: the typed, ergonomic surface implementors write against,
//! and the type-erased surface the dispatcher stores.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::codec::JsonCodec;
use super::context::CommandContext;
use super::outcome::CommandOutcome;
use super::schema::ArgumentSpec;

/// An internal operator action with a typed, schema-validated argument
/// struct.
#[async_trait]
pub trait TypedCommand: Send + Sync + 'static {
    /// The argument struct this command deserializes requests into.
    ///
    /// Must implement `Default` so its natural default can be checked
    /// against the declared [`ArgumentSpec`]s at registration time.
    type Args: Default + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// The unique name requests address this command by.
    fn name(&self) -> &str;

    /// Declared per-field registration metadata, validated against
    /// `Self::Args`'s natural default at registration time.
    fn argument_specs(&self) -> Vec<ArgumentSpec>;

    /// Run the command body. Returning [`CommandOutcome::SerializationFails`]
    /// or [`CommandOutcome::CommandNotFound`] here has no special meaning —
    /// those variants are reserved for the dispatcher itself.
    async fn execute(&self, ctx: &CommandContext, args: Self::Args) -> CommandOutcome;
}

/// Erases a [`TypedCommand`]'s argument type so it can be stored as
/// `Arc<dyn CommandObject>`.
#[async_trait]
pub(super) trait CommandObject: Send + Sync {
    fn name(&self) -> &str;

    fn argument_specs(&self) -> Vec<ArgumentSpec>;

    fn natural_default(&self) -> Result<Value, String>;

    async fn handle(&self, ctx: &CommandContext, args: &Value, codec: &JsonCodec) -> CommandOutcome;
}

pub(super) struct CommandAdapter<C>(pub(super) C);

#[async_trait]
impl<C: TypedCommand> CommandObject for CommandAdapter<C> {
    fn name(&self) -> &str { self.0.name() }

    fn argument_specs(&self) -> Vec<ArgumentSpec> { self.0.argument_specs() }

    fn natural_default(&self) -> Result<Value, String> {
        serde_json::to_value(C::Args::default()).map_err(|err| err.to_string())
    }

    async fn handle(&self, ctx: &CommandContext, args: &Value, codec: &JsonCodec) -> CommandOutcome {
        let specs = self.0.argument_specs();
        let required: HashSet<&str> = specs.iter().filter(|spec| spec.required).map(|spec| spec.name.as_str()).collect();
        let typed: C::Args = match codec.decode(args, &required) {
            Ok(typed) => typed,
            Err(err) => return CommandOutcome::SerializationFails(err),
        };
        self.0.execute(ctx, typed).await
    }
}
