//! The per-subsystem JSON codec options consumed by the command dispatcher.

use std::collections::HashSet;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decode options for command argument deserialization, expressed as a
/// small injected struct rather than a process-wide handle.
#[derive(Debug, Clone, Copy)]
pub struct JsonCodec {
    /// Unknown keys in the input are ignored rather than rejected.
    pub ignore_unknown_keys: bool,
    /// Missing optional fields are filled from the argument type's natural
    /// default before deserializing, rather than failing outright.
    pub lenient: bool,
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self {
            ignore_unknown_keys: true,
            lenient: true,
        }
    }
}

impl JsonCodec {
    /// Decode `input` as `T`, applying [`JsonCodec::lenient`] default-filling
    /// to fields absent from `required_fields` and
    /// [`JsonCodec::ignore_unknown_keys`] filtering first.
    ///
    /// A field named in `required_fields` is never default-filled: missing
    /// it is a decode failure regardless of [`JsonCodec::lenient`], since
    /// leniency only covers the schema's declared optional fields.
    ///
    /// # Errors
    /// Returns a description of the mismatch when `input` does not satisfy
    /// `required_fields` or does not otherwise decode as `T`.
    pub fn decode<T>(&self, input: &Value, required_fields: &HashSet<&str>) -> Result<T, String>
    where
        T: Default + Serialize + DeserializeOwned,
    {
        let natural = serde_json::to_value(T::default()).map_err(|err| err.to_string())?;
        let merged = self.merge(input, &natural, required_fields)?;
        serde_json::from_value(merged).map_err(|err| err.to_string())
    }

    fn merge(&self, input: &Value, natural: &Value, required_fields: &HashSet<&str>) -> Result<Value, String> {
        let (Value::Object(natural_fields), Value::Object(input_fields)) = (natural, input) else {
            return Ok(input.clone());
        };
        let mut merged = serde_json::Map::new();
        for (key, default) in natural_fields {
            match input_fields.get(key) {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None if self.lenient && !required_fields.contains(key.as_str()) => {
                    merged.insert(key.clone(), default.clone());
                }
                None => return Err(format!("missing required field {key:?}")),
            }
        }
        if !self.ignore_unknown_keys {
            for key in input_fields.keys() {
                if !natural_fields.contains_key(key) {
                    return Err(format!("unknown field {key:?}"));
                }
            }
        }
        Ok(Value::Object(merged))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
    struct Example {
        field1: String,
        field2: i64,
        #[serde(default)]
        field3: bool,
    }

    fn required() -> HashSet<&'static str> { HashSet::from(["field1", "field2"]) }

    #[test]
    fn decodes_a_fully_specified_payload() {
        let codec = JsonCodec::default();
        let decoded: Example = codec
            .decode(&json!({"field1": "pid123", "field2": 12, "field3": true}), &required())
            .unwrap();
        assert_eq!(
            decoded,
            Example {
                field1: "pid123".to_owned(),
                field2: 12,
                field3: true,
            }
        );
    }

    #[test]
    fn lenient_mode_fills_missing_optional_fields_from_the_natural_default() {
        let codec = JsonCodec::default();
        let decoded: Example = codec
            .decode(&json!({"field1": "pid123", "field2": 1}), &required())
            .unwrap();
        assert!(!decoded.field3);
    }

    #[test]
    fn lenient_mode_still_rejects_a_missing_required_field() {
        let codec = JsonCodec::default();
        let result: Result<Example, String> = codec.decode(&json!({"field2": 12}), &required());
        assert!(result.is_err());
    }

    #[test]
    fn strict_mode_rejects_a_missing_required_field() {
        let codec = JsonCodec {
            ignore_unknown_keys: true,
            lenient: false,
        };
        let result: Result<Example, String> = codec.decode(&json!({"field2": 12}), &required());
        assert!(result.is_err());
    }

    #[test]
    fn strict_mode_rejects_a_missing_optional_field_too() {
        let codec = JsonCodec {
            ignore_unknown_keys: true,
            lenient: false,
        };
        let result: Result<Example, String> =
            codec.decode(&json!({"field1": "pid123", "field2": 12}), &required());
        assert!(result.is_err());
    }
}
