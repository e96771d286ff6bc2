//! The command table: registration with schema validation, and dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use super::codec::JsonCodec;
use super::context::CommandContext;
use super::outcome::CommandOutcome;
use super::schema::{SchemaError, validate_schema};
use super::traits::{CommandAdapter, CommandObject, TypedCommand};

/// A `handle_command` request: a command name plus its raw JSON arguments.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    /// The registered command name to invoke.
    pub name: String,
    /// The request's arguments, decoded against the command's schema.
    pub args: Value,
}

impl CommandRequest {
    /// Build a request for `name` with `args`.
    #[must_use]
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self { name: name.into(), args }
    }
}

/// Registration-time failure: a programmer mistake, surfaced before serving
/// begins.
#[derive(Debug, thiserror::Error)]
pub enum CommandRegistrationError {
    /// A command is already registered under this name.
    #[error("command {0:?} is already registered")]
    DuplicateName(String),
    /// The command's declared argument schema failed validation.
    #[error("command {name:?} has an invalid argument schema: {source}")]
    InvalidSchema {
        /// The offending command's name.
        name: String,
        /// The specific rule violated.
        #[source]
        source: SchemaError,
    },
}

/// Holds registered commands and resolves/runs them against incoming
/// requests.
#[derive(Default)]
pub struct CommandDispatcher {
    commands: HashMap<String, Arc<dyn CommandObject>>,
    codec: JsonCodec,
}

impl CommandDispatcher {
    /// Build an empty dispatcher using the default [`JsonCodec`].
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Build an empty dispatcher with custom JSON decode options.
    #[must_use]
    pub fn with_codec(codec: JsonCodec) -> Self {
        Self {
            commands: HashMap::new(),
            codec,
        }
    }

    /// Register a command, validating its declared argument schema against
    /// its argument type's natural default.
    ///
    /// # Errors
    /// Returns [`CommandRegistrationError::DuplicateName`] if `command.name()`
    /// is already registered, or
    /// [`CommandRegistrationError::InvalidSchema`] if its schema fails
    /// validation.
    pub fn register<C: TypedCommand>(&mut self, command: C) -> Result<(), CommandRegistrationError> {
        let name = command.name().to_owned();
        if self.commands.contains_key(&name) {
            return Err(CommandRegistrationError::DuplicateName(name));
        }
        let adapter = CommandAdapter(command);
        let natural = adapter
            .natural_default()
            .map_err(|err| CommandRegistrationError::InvalidSchema {
                name: name.clone(),
                source: SchemaError::SerializeFailed(err),
            })?;
        validate_schema(&adapter.argument_specs(), &natural).map_err(|source| CommandRegistrationError::InvalidSchema {
            name: name.clone(),
            source,
        })?;
        self.commands.insert(name, Arc::new(adapter));
        Ok(())
    }

    /// Resolve and run `request`. Never panics: a panicking command body is
    /// isolated onto its own task and converted to
    /// [`CommandOutcome::Error`].
    pub async fn handle_command(&self, ctx: CommandContext, request: CommandRequest) -> CommandOutcome {
        let Some(command) = self.commands.get(&request.name).cloned() else {
            return CommandOutcome::CommandNotFound(format!("unknown command {:?}", request.name));
        };
        info!(name = %request.name, "dispatching command");
        let codec = self.codec;
        let args = request.args;
        match tokio::spawn(async move { command.handle(&ctx, &args, &codec).await }).await {
            Ok(outcome) => outcome,
            Err(join_err) => CommandOutcome::Error(format!("command panicked: {join_err}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::*;
    use crate::command::ArgumentSpec;

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct ExampleArgs {
        field1: String,
        field2: i64,
        #[serde(default)]
        field3: bool,
    }

    struct Example;

    #[async_trait]
    impl TypedCommand for Example {
        type Args = ExampleArgs;

        fn name(&self) -> &str { "example" }

        fn argument_specs(&self) -> Vec<ArgumentSpec> {
            vec![
                ArgumentSpec::required("field1"),
                ArgumentSpec::required("field2"),
                ArgumentSpec::optional("field3", json!(false)),
            ]
        }

        async fn execute(&self, _ctx: &CommandContext, args: ExampleArgs) -> CommandOutcome {
            if args.field2 == 1 {
                panic!("boom");
            }
            if args.field2 == 1002 {
                return CommandOutcome::ExecutionFailure("field2 out of range".to_owned());
            }
            CommandOutcome::Executed
        }
    }

    fn dispatcher() -> CommandDispatcher {
        let mut dispatcher = CommandDispatcher::new();
        dispatcher.register(Example).unwrap();
        dispatcher
    }

    #[tokio::test]
    async fn s4_executed_on_a_fully_specified_request() {
        let outcome = dispatcher()
            .handle_command(
                CommandContext::default(),
                CommandRequest::new("example", json!({"field1": "pid123", "field2": 12, "field3": true})),
            )
            .await;
        assert_eq!(outcome, CommandOutcome::Executed);
    }

    #[tokio::test]
    async fn s4_panicking_execute_becomes_error() {
        let outcome = dispatcher()
            .handle_command(
                CommandContext::default(),
                CommandRequest::new("example", json!({"field1": "pid123", "field2": 1})),
            )
            .await;
        assert!(matches!(outcome, CommandOutcome::Error(_)));
    }

    #[tokio::test]
    async fn s4_domain_rejection_becomes_execution_failure() {
        let outcome = dispatcher()
            .handle_command(
                CommandContext::default(),
                CommandRequest::new("example", json!({"field1": "pid123", "field2": 1002})),
            )
            .await;
        assert!(matches!(outcome, CommandOutcome::ExecutionFailure(_)));
    }

    #[tokio::test]
    async fn s4_missing_required_field_is_a_serialization_failure() {
        let outcome = dispatcher()
            .handle_command(CommandContext::default(), CommandRequest::new("example", json!({"field2": 12})))
            .await;
        assert!(matches!(outcome, CommandOutcome::SerializationFails(_)));
    }

    #[tokio::test]
    async fn s4_unknown_command_name_is_not_found() {
        let outcome = dispatcher()
            .handle_command(CommandContext::default(), CommandRequest::new("missing", json!({})))
            .await;
        assert!(matches!(outcome, CommandOutcome::CommandNotFound(_)));
    }

    #[test]
    fn registering_a_duplicate_name_fails() {
        let mut dispatcher = CommandDispatcher::new();
        dispatcher.register(Example).unwrap();
        let err = dispatcher.register(Example).unwrap_err();
        assert!(matches!(err, CommandRegistrationError::DuplicateName(_)));
    }
}
