//! Declarative input schemas.
//!
//! Each action declares the payload fields it accepts. Validation runs
//! before the handler is invoked and reports the first violated constraint;
//! unknown fields are ignored.

use serde_json::Value;

/// Expected type of a payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Number,
    Bool,
    Str,
    Array,
    Object,
}

impl FieldKind {
    fn name(&self) -> &'static str {
        match self {
            FieldKind::Int => "integer",
            FieldKind::Number => "number",
            FieldKind::Bool => "boolean",
            FieldKind::Str => "string",
            FieldKind::Array => "array",
            FieldKind::Object => "object",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldKind::Int => value.is_i64() || value.is_u64(),
            FieldKind::Number => value.is_number(),
            FieldKind::Bool => value.is_boolean(),
            FieldKind::Str => value.is_string(),
            FieldKind::Array => value.is_array(),
            FieldKind::Object => value.is_object(),
        }
    }
}

#[derive(Debug, Clone)]
struct FieldSpec {
    name: String,
    kind: FieldKind,
    required: bool,
}

/// Input schema of one action.
#[derive(Debug, Clone, Default)]
pub struct InputSchema {
    fields: Vec<FieldSpec>,
}

impl InputSchema {
    /// Schema that accepts anything (actions without declared inputs).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a required field.
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            kind,
            required: true,
        });
        self
    }

    /// Declare an optional field (type-checked when present).
    pub fn optional(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            kind,
            required: false,
        });
        self
    }

    /// Validate a payload, reporting the first violated constraint.
    pub fn validate(&self, payload: &Value) -> Result<(), String> {
        if self.fields.is_empty() {
            return Ok(());
        }

        let object = match payload {
            Value::Object(map) => map,
            Value::Null => {
                if let Some(field) = self.fields.iter().find(|f| f.required) {
                    return Err(format!("{}: This field is required.", field.name));
                }
                return Ok(());
            }
            _ => return Err("Request payload must be a JSON object.".to_string()),
        };

        for field in &self.fields {
            match object.get(&field.name) {
                None | Some(Value::Null) => {
                    if field.required {
                        return Err(format!("{}: This field is required.", field.name));
                    }
                }
                Some(value) => {
                    if !field.kind.accepts(value) {
                        return Err(format!(
                            "{}: A valid {} is required.",
                            field.name,
                            field.kind.name()
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_schema_accepts_anything() {
        assert!(InputSchema::empty().validate(&Value::Null).is_ok());
        assert!(InputSchema::empty().validate(&json!({"x": 1})).is_ok());
    }

    #[test]
    fn test_required_field_missing() {
        let schema = InputSchema::new().field("group_id", FieldKind::Int);
        let err = schema.validate(&json!({})).unwrap_err();
        assert_eq!(err, "group_id: This field is required.");
        let err = schema.validate(&Value::Null).unwrap_err();
        assert_eq!(err, "group_id: This field is required.");
    }

    #[test]
    fn test_type_mismatch_reports_first_violation() {
        let schema = InputSchema::new()
            .field("group_id", FieldKind::Int)
            .field("comment", FieldKind::Str);
        let err = schema
            .validate(&json!({"group_id": "7", "comment": 5}))
            .unwrap_err();
        assert_eq!(err, "group_id: A valid integer is required.");
    }

    #[test]
    fn test_optional_field_checked_when_present() {
        let schema = InputSchema::new().optional("current", FieldKind::Bool);
        assert!(schema.validate(&json!({})).is_ok());
        assert!(schema.validate(&json!({"current": true})).is_ok());
        assert!(schema.validate(&json!({"current": "yes"})).is_err());
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let schema = InputSchema::new().field("sport_id", FieldKind::Int);
        assert!(schema.validate(&json!({"sport_id": 3, "extra": "x"})).is_ok());
    }
}
