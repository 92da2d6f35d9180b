//! Request payload validation against a model definition.

use crate::config::ModelDefinition;
use crate::error::AppError;
use crate::store::Document;
use serde_json::Value;

pub struct RequestValidator;

impl RequestValidator {
    /// Full payload (create): no unknown fields, required fields present unless defaulted,
    /// kinds match.
    pub fn validate(body: &Document, definition: &ModelDefinition) -> Result<(), AppError> {
        reject_unknown(body, definition)?;
        for f in &definition.fields {
            let val = body.get(&f.name);
            let missing = val.is_none() || val == Some(&Value::Null);
            if f.required && missing && f.default.is_none() {
                return Err(AppError::Validation(format!("{} is required", f.name)));
            }
            if let Some(v) = val {
                validate_field(&f.name, v, &f.kind)?;
            }
        }
        Ok(())
    }

    /// Only the fields present (update, filters). Explicit null on a required field is rejected
    /// when `null_checks` is set.
    pub fn validate_partial(
        body: &Document,
        definition: &ModelDefinition,
        null_checks: bool,
    ) -> Result<(), AppError> {
        reject_unknown(body, definition)?;
        for (name, v) in body {
            let Some(f) = definition.field(name) else { continue };
            if null_checks && f.required && v.is_null() {
                return Err(AppError::Validation(format!("{} cannot be null", name)));
            }
            validate_field(name, v, &f.kind)?;
        }
        Ok(())
    }
}

fn reject_unknown(body: &Document, definition: &ModelDefinition) -> Result<(), AppError> {
    match body.keys().find(|k| definition.field(k).is_none()) {
        Some(k) => Err(AppError::Validation(format!("unknown field '{}'", k))),
        None => Ok(()),
    }
}

fn validate_field(name: &str, v: &Value, kind: &crate::config::FieldKind) -> Result<(), AppError> {
    if v.is_null() || kind.accepts(v) {
        return Ok(());
    }
    Err(AppError::Validation(format!(
        "{} has the wrong type for {:?}",
        name, kind
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve_definition, FieldConfig, ModelDefinitionConfig};
    use serde_json::json;

    fn definition() -> ModelDefinition {
        resolve_definition(
            &ModelDefinitionConfig::new("Task")
                .field("title", FieldConfig::new("string").required())
                .field("status", FieldConfig::new("string").required().with_default(json!("open")))
                .field("due", FieldConfig::new("date")),
        )
        .unwrap()
    }

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn create_requires_non_defaulted_fields() {
        let def = definition();
        assert!(RequestValidator::validate(&doc(json!({"title": "x"})), &def).is_ok());
        let err = RequestValidator::validate(&doc(json!({"status": "done"})), &def).unwrap_err();
        assert_eq!(err.to_string(), "validation: title is required");
        assert!(RequestValidator::validate(&doc(json!({"title": null})), &def).is_err());
    }

    #[test]
    fn rejects_unknown_fields_and_bad_kinds() {
        let def = definition();
        let validate = |v: Value| RequestValidator::validate(&doc(v), &def);
        assert!(validate(json!({"title": "x", "extra": 1})).is_err());
        assert!(validate(json!({"title": "x", "due": "tomorrow"})).is_err());
        assert!(validate(json!({"title": 5})).is_err());
    }

    #[test]
    fn partial_checks_only_present_fields() {
        let def = definition();
        let partial =
            |v: Value, nulls: bool| RequestValidator::validate_partial(&doc(v), &def, nulls);
        assert!(partial(json!({"due": null}), true).is_ok());
        assert!(partial(json!({"title": null}), true).is_err());
        assert!(partial(json!({"title": null}), false).is_ok());
    }
}
