//! Resolved model definitions: validated once, then read by both schema builders.

use serde_json::Value;

/// Closed set of supported field kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Date,
    /// Id of a record in another model's collection.
    Reference { model: String },
    /// Elements are never arrays themselves.
    Array(Box<FieldKind>),
}

impl FieldKind {
    pub fn is_array(&self) -> bool {
        matches!(self, FieldKind::Array(_))
    }

    /// Whether a JSON value has the shape of this kind. Null is handled by the caller.
    pub fn accepts(&self, v: &Value) -> bool {
        match self {
            FieldKind::String => v.is_string(),
            FieldKind::Number => v.is_number(),
            FieldKind::Boolean => v.is_boolean(),
            FieldKind::Date => v
                .as_str()
                .map(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok())
                .unwrap_or(false),
            FieldKind::Reference { .. } => v.as_str().map(|s| !s.is_empty()).unwrap_or(false),
            FieldKind::Array(item) => v
                .as_array()
                .map(|items| items.iter().all(|i| item.accepts(i)))
                .unwrap_or(false),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DefaultValue {
    Literal(Value),
    /// Current time at insert (date fields only).
    Now,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<DefaultValue>,
}

impl FieldDef {
    /// Single source of optionality for storage columns and GraphQL object fields.
    pub fn nullable(&self) -> bool {
        !self.required
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ModelDefinition {
    pub name: String,
    /// Sorted by field name.
    pub fields: Vec<FieldDef>,
}

impl ModelDefinition {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}
