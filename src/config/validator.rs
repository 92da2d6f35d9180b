//! Definition validation: supported types, names, references and defaults.
//! Both schema builders go through here so they never disagree on a field.

use crate::config::{
    DefaultValue, FieldConfig, FieldDef, FieldKind, ModelDefinition, ModelDefinitionConfig,
};
use crate::error::ConfigError;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;

/// Keys the store assigns itself; user fields may not shadow them.
pub const RESERVED_FIELDS: &[&str] = &["id", "createdAt", "updatedAt", "created_at", "updated_at"];

/// GraphQL type names the schema already defines; a model of the same name would replace them.
pub const RESERVED_MODEL_NAMES: &[&str] = &[
    "Query",
    "Mutation",
    "Subscription",
    "DateTime",
    "PaginationInput",
    "String",
    "Int",
    "Float",
    "Boolean",
    "ID",
];

const NAME_PATTERN: &str = r"^[_A-Za-z][_0-9A-Za-z]*$";

fn check_name(kind: &str, name: &str) -> Result<(), ConfigError> {
    let re = Regex::new(NAME_PATTERN).map_err(|e| ConfigError::Validation(e.to_string()))?;
    if !re.is_match(name) || name.starts_with("__") {
        return Err(ConfigError::Validation(format!(
            "invalid {} name '{}'",
            kind, name
        )));
    }
    Ok(())
}

/// Validate a whole definition set. References must point at models in the same set.
pub fn resolve_definitions(
    configs: &[ModelDefinitionConfig],
) -> Result<Vec<ModelDefinition>, ConfigError> {
    if configs.is_empty() {
        return Err(ConfigError::Validation(
            "at least one model definition required".into(),
        ));
    }
    let known: HashSet<&str> = configs.iter().map(|c| c.name.as_str()).collect();
    configs
        .iter()
        .map(|c| resolve_definition_with(c, &known))
        .collect()
}

/// Validate a single definition. References are only checked to name a valid model identifier.
pub fn resolve_definition(config: &ModelDefinitionConfig) -> Result<ModelDefinition, ConfigError> {
    resolve_definition_inner(config, None)
}

fn resolve_definition_with(
    config: &ModelDefinitionConfig,
    known: &HashSet<&str>,
) -> Result<ModelDefinition, ConfigError> {
    resolve_definition_inner(config, Some(known))
}

fn resolve_definition_inner(
    config: &ModelDefinitionConfig,
    known: Option<&HashSet<&str>>,
) -> Result<ModelDefinition, ConfigError> {
    check_name("model", &config.name)?;
    if RESERVED_MODEL_NAMES.contains(&config.name.as_str()) {
        return Err(ConfigError::Validation(format!(
            "model name '{}' is reserved",
            config.name
        )));
    }
    if config.fields.is_empty() {
        return Err(ConfigError::Validation(format!(
            "model '{}' declares no fields",
            config.name
        )));
    }
    let mut fields = Vec::with_capacity(config.fields.len());
    for (name, field) in &config.fields {
        check_name("field", name)?;
        if RESERVED_FIELDS.contains(&name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "model '{}': field name '{}' is reserved",
                config.name, name
            )));
        }
        let kind = parse_kind(&config.name, name, field, known)?;
        let default = match &field.default {
            None | Some(Value::Null) => None,
            Some(v) => Some(parse_default(&config.name, name, &kind, v)?),
        };
        fields.push(FieldDef {
            name: name.clone(),
            kind,
            required: field.required.unwrap_or(false),
            default,
        });
    }
    Ok(ModelDefinition {
        name: config.name.clone(),
        fields,
    })
}

fn parse_kind(
    model: &str,
    field: &str,
    config: &FieldConfig,
    known: Option<&HashSet<&str>>,
) -> Result<FieldKind, ConfigError> {
    let kind = parse_scalar(model, field, &config.type_, config.ref_.as_deref(), known)?;
    match kind {
        Some(k) => Ok(k),
        None => {
            let items = config.items.as_deref().ok_or_else(|| {
                ConfigError::Validation(format!(
                    "model '{}': array field '{}' must declare items",
                    model, field
                ))
            })?;
            let item = parse_scalar(model, field, items, config.ref_.as_deref(), known)?
                .ok_or_else(|| ConfigError::UnsupportedType {
                    model: model.to_string(),
                    field: field.to_string(),
                    type_name: format!("array of {}", items),
                })?;
            Ok(FieldKind::Array(Box::new(item)))
        }
    }
}

/// Scalar kind for a type name; `Ok(None)` means `array`.
fn parse_scalar(
    model: &str,
    field: &str,
    type_name: &str,
    ref_: Option<&str>,
    known: Option<&HashSet<&str>>,
) -> Result<Option<FieldKind>, ConfigError> {
    Ok(Some(match type_name.to_lowercase().as_str() {
        "string" => FieldKind::String,
        "number" => FieldKind::Number,
        "boolean" => FieldKind::Boolean,
        "date" => FieldKind::Date,
        "reference" | "ref" | "objectid" => {
            let target = ref_.ok_or_else(|| {
                ConfigError::Validation(format!(
                    "model '{}': reference field '{}' must declare ref",
                    model, field
                ))
            })?;
            check_name("model", target)?;
            if let Some(known) = known {
                if !known.contains(target) {
                    return Err(ConfigError::MissingReference {
                        model: model.to_string(),
                        field: field.to_string(),
                        target: target.to_string(),
                    });
                }
            }
            FieldKind::Reference {
                model: target.to_string(),
            }
        }
        "array" => return Ok(None),
        _ => {
            return Err(ConfigError::UnsupportedType {
                model: model.to_string(),
                field: field.to_string(),
                type_name: type_name.to_string(),
            })
        }
    }))
}

fn parse_default(
    model: &str,
    field: &str,
    kind: &FieldKind,
    v: &Value,
) -> Result<DefaultValue, ConfigError> {
    let is_now = v.as_str().map(|s| s.eq_ignore_ascii_case("now")).unwrap_or(false);
    if *kind == FieldKind::Date && is_now {
        return Ok(DefaultValue::Now);
    }
    if !kind.accepts(v) {
        return Err(ConfigError::Validation(format!(
            "model '{}': default for field '{}' does not match its type",
            model, field
        )));
    }
    Ok(DefaultValue::Literal(v.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task() -> ModelDefinitionConfig {
        ModelDefinitionConfig::new("Task")
            .field("title", FieldConfig::new("string").required())
            .field("done", FieldConfig::new("boolean").with_default(json!(false)))
    }

    #[test]
    fn resolves_fields_in_name_order() {
        let def = resolve_definition(&task()).unwrap();
        let names: Vec<_> = def.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["done", "title"]);
        assert!(def.field("title").unwrap().required);
        assert_eq!(
            def.field("done").unwrap().default,
            Some(DefaultValue::Literal(json!(false)))
        );
    }

    #[test]
    fn rejects_unsupported_type() {
        let cfg = ModelDefinitionConfig::new("Task").field("blob", FieldConfig::new("buffer"));
        let err = resolve_definition(&cfg).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnsupportedType { ref type_name, .. } if type_name == "buffer"
        ));
    }

    #[test]
    fn type_names_are_case_insensitive() {
        let cfg = ModelDefinitionConfig::new("Event")
            .field("at", FieldConfig::new("Date").with_default(json!("now")))
            .field("count", FieldConfig::new("Number"));
        let def = resolve_definition(&cfg).unwrap();
        assert_eq!(def.field("at").unwrap().kind, FieldKind::Date);
        assert_eq!(def.field("at").unwrap().default, Some(DefaultValue::Now));
        assert_eq!(def.field("count").unwrap().kind, FieldKind::Number);
    }

    #[test]
    fn arrays_need_items_and_reject_nesting() {
        let missing = ModelDefinitionConfig::new("Post").field("tags", FieldConfig::new("array"));
        assert!(matches!(resolve_definition(&missing), Err(ConfigError::Validation(_))));

        let nested = ModelDefinitionConfig::new("Post")
            .field("tags", FieldConfig::new("array").with_items("array"));
        assert!(matches!(resolve_definition(&nested), Err(ConfigError::UnsupportedType { .. })));

        let ok = ModelDefinitionConfig::new("Post")
            .field("tags", FieldConfig::new("array").with_items("string"));
        let def = resolve_definition(&ok).unwrap();
        assert_eq!(
            def.field("tags").unwrap().kind,
            FieldKind::Array(Box::new(FieldKind::String))
        );
    }

    #[test]
    fn references_must_name_a_known_model() {
        let post = ModelDefinitionConfig::new("Post")
            .field("author", FieldConfig::new("reference").with_ref("User"));
        let err = resolve_definitions(&[post.clone()]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingReference { ref target, .. } if target == "User"
        ));

        let user = ModelDefinitionConfig::new("User").field("name", FieldConfig::new("string"));
        let defs = resolve_definitions(&[user, post]).unwrap();
        assert_eq!(
            defs[1].field("author").unwrap().kind,
            FieldKind::Reference { model: "User".into() }
        );
    }

    #[test]
    fn rejects_reserved_and_invalid_names() {
        let reserved = ModelDefinitionConfig::new("Task").field("id", FieldConfig::new("string"));
        assert!(resolve_definition(&reserved).is_err());
        let bad_model =
            ModelDefinitionConfig::new("my-task").field("a", FieldConfig::new("string"));
        assert!(resolve_definition(&bad_model).is_err());
        let empty = ModelDefinitionConfig::new("Task");
        assert!(resolve_definition(&empty).is_err());
        assert!(resolve_definitions(&[]).is_err());
    }

    #[test]
    fn rejects_model_names_that_shadow_schema_types() {
        for name in ["Query", "Mutation", "DateTime", "PaginationInput", "String", "ID"] {
            let cfg = ModelDefinitionConfig::new(name).field("a", FieldConfig::new("string"));
            let err = resolve_definition(&cfg).unwrap_err();
            let reserved = matches!(err, ConfigError::Validation(ref m) if m.contains("reserved"));
            assert!(reserved, "{name}");
        }
    }

    #[test]
    fn default_must_match_kind() {
        let cfg = ModelDefinitionConfig::new("Task")
            .field("done", FieldConfig::new("boolean").with_default(json!("no")));
        assert!(matches!(resolve_definition(&cfg), Err(ConfigError::Validation(_))));
    }
}
