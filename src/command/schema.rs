//! Argument-schema declaration and the registration-time validation rules
//! for registering a command's declared arguments.

use serde_json::Value;

/// Declares one argument field's registration metadata.
#[derive(Debug, Clone)]
pub struct ArgumentSpec {
    /// The field name, matching the command's argument struct.
    pub name: String,
    /// Whether the field must be present in every request.
    pub required: bool,
    /// The field's default value when `required` is false. Must be present,
    /// non-null, and equal to the type's natural default.
    pub default: Option<Value>,
}

impl ArgumentSpec {
    /// Declare a required field with no default.
    #[must_use]
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
            default: None,
        }
    }

    /// Declare an optional field with the given default value.
    #[must_use]
    pub fn optional(name: impl Into<String>, default: Value) -> Self {
        Self {
            name: name.into(),
            required: false,
            default: Some(default),
        }
    }
}

/// A registration-time schema violation; these are programmer mistakes and
/// must surface before serving begins.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchemaError {
    /// A field on the argument type has no corresponding [`ArgumentSpec`].
    #[error("field {0:?} has no registered argument metadata")]
    MissingMetadata(String),
    /// An optional field declared no default value.
    #[error("optional field {0:?} declares no default value")]
    MissingDefault(String),
    /// An optional field declared a `null` default value.
    #[error("optional field {0:?} declares a null default value")]
    NullDefault(String),
    /// An optional field's declared default does not match the type's
    /// natural (post-`Default`) value.
    #[error("optional field {0:?} declares a default that does not match the type's natural default")]
    DefaultMismatch(String),
    /// An [`ArgumentSpec`] names a field the argument type does not have.
    #[error("argument metadata names unknown field {0:?}")]
    UnknownField(String),
    /// The argument type's natural default did not serialize to a JSON
    /// object, so it has no per-field structure to validate against.
    #[error("argument type's default value is not a JSON object")]
    NotAnObject,
    /// The argument type's natural default could not be serialized at all.
    #[error("argument type's default value could not be serialized: {0}")]
    SerializeFailed(String),
}

/// Validate `specs` against `natural_default`, the argument type's
/// `serde_json::to_value(&T::default())`.
///
/// # Errors
/// Returns the first [`SchemaError`] found.
pub fn validate_schema(specs: &[ArgumentSpec], natural_default: &Value) -> Result<(), SchemaError> {
    let Value::Object(fields) = natural_default else {
        return Err(SchemaError::NotAnObject);
    };

    for field_name in fields.keys() {
        let Some(spec) = specs.iter().find(|s| &s.name == field_name) else {
            return Err(SchemaError::MissingMetadata(field_name.clone()));
        };
        if !spec.required {
            let Some(default) = &spec.default else {
                return Err(SchemaError::MissingDefault(field_name.clone()));
            };
            if default.is_null() {
                return Err(SchemaError::NullDefault(field_name.clone()));
            }
            if default != &fields[field_name] {
                return Err(SchemaError::DefaultMismatch(field_name.clone()));
            }
        }
    }

    for spec in specs {
        if !fields.contains_key(&spec.name) {
            return Err(SchemaError::UnknownField(spec.name.clone()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accepts_a_fully_described_schema() {
        let natural = json!({"field1": "", "field2": 0, "field3": false});
        let specs = vec![
            ArgumentSpec::required("field1"),
            ArgumentSpec::required("field2"),
            ArgumentSpec::optional("field3", json!(false)),
        ];
        assert_eq!(validate_schema(&specs, &natural), Ok(()));
    }

    #[test]
    fn rejects_a_field_with_no_metadata() {
        let natural = json!({"field1": ""});
        assert_eq!(
            validate_schema(&[], &natural),
            Err(SchemaError::MissingMetadata("field1".to_owned()))
        );
    }

    #[test]
    fn rejects_an_optional_field_with_no_default() {
        let natural = json!({"field1": ""});
        let specs = vec![ArgumentSpec {
            name: "field1".to_owned(),
            required: false,
            default: None,
        }];
        assert_eq!(
            validate_schema(&specs, &natural),
            Err(SchemaError::MissingDefault("field1".to_owned()))
        );
    }

    #[test]
    fn rejects_a_default_that_disagrees_with_the_natural_default() {
        let natural = json!({"field3": false});
        let specs = vec![ArgumentSpec::optional("field3", json!(true))];
        assert_eq!(
            validate_schema(&specs, &natural),
            Err(SchemaError::DefaultMismatch("field3".to_owned()))
        );
    }

    #[test]
    fn rejects_metadata_for_an_unknown_field() {
        let natural = json!({"field1": ""});
        let specs = vec![ArgumentSpec::required("field1"), ArgumentSpec::required("ghost")];
        assert_eq!(
            validate_schema(&specs, &natural),
            Err(SchemaError::UnknownField("ghost".to_owned()))
        );
    }
}
