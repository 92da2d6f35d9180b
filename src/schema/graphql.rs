//! GraphQL type set for a model: descriptors plus their dynamic-schema registration.

use crate::config::{
    resolve_definition, FieldDef, FieldKind, ModelDefinition, ModelDefinitionConfig,
};
use crate::error::ConfigError;
use crate::store::Document;
use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, InputObject, InputValue, Object, Scalar, SchemaBuilder, TypeRef,
};
use async_graphql::Value as ConstValue;
use serde_json::Value;

pub const DATE_TIME: &str = "DateTime";
pub const PAGINATION_INPUT: &str = "PaginationInput";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphqlField {
    pub name: String,
    /// Named type, or the element type when `list` is set.
    pub type_name: String,
    pub list: bool,
    pub non_null: bool,
}

impl GraphqlField {
    fn new(name: &str, type_name: &str, non_null: bool) -> Self {
        GraphqlField {
            name: name.to_string(),
            type_name: type_name.to_string(),
            list: false,
            non_null,
        }
    }

    fn from_def(def: &FieldDef, non_null: bool) -> Self {
        let (type_name, list) = match &def.kind {
            FieldKind::Array(item) => (scalar_name(item), true),
            kind => (scalar_name(kind), false),
        };
        GraphqlField {
            name: def.name.clone(),
            type_name: type_name.to_string(),
            list,
            non_null,
        }
    }

    pub fn type_ref(&self) -> TypeRef {
        match (self.list, self.non_null) {
            (true, true) => TypeRef::named_nn_list_nn(self.type_name.clone()),
            (true, false) => TypeRef::named_nn_list(self.type_name.clone()),
            (false, true) => TypeRef::named_nn(self.type_name.clone()),
            (false, false) => TypeRef::named(self.type_name.clone()),
        }
    }

    /// SDL spelling of the type, e.g. `[String!]!`.
    pub fn sdl_type(&self) -> String {
        let base = if self.list {
            format!("[{}!]", self.type_name)
        } else {
            self.type_name.clone()
        };
        if self.non_null {
            format!("{}!", base)
        } else {
            base
        }
    }
}

fn scalar_name(kind: &FieldKind) -> &'static str {
    match kind {
        FieldKind::String => TypeRef::STRING,
        FieldKind::Number => TypeRef::FLOAT,
        FieldKind::Boolean => TypeRef::BOOLEAN,
        FieldKind::Date => DATE_TIME,
        FieldKind::Reference { .. } => TypeRef::ID,
        // nested arrays are rejected during validation
        FieldKind::Array(item) => scalar_name(item),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphqlTypeDesc {
    pub name: String,
    pub fields: Vec<GraphqlField>,
}

impl GraphqlTypeDesc {
    pub fn field(&self, name: &str) -> Option<&GraphqlField> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn input_object(&self) -> InputObject {
        self.fields.iter().fold(InputObject::new(self.name.clone()), |obj, f| {
            obj.field(InputValue::new(f.name.clone(), f.type_ref()))
        })
    }
}

/// Entity object type plus the input types its endpoints accept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphqlTypeSet {
    pub object: GraphqlTypeDesc,
    pub create_input: GraphqlTypeDesc,
    pub update_input: GraphqlTypeDesc,
    /// None when the model has no filterable (non-array) fields.
    pub filter_input: Option<GraphqlTypeDesc>,
}

impl GraphqlTypeSet {
    pub fn type_names(&self) -> Vec<&str> {
        let mut names = vec![
            self.object.name.as_str(),
            self.create_input.name.as_str(),
            self.update_input.name.as_str(),
        ];
        if let Some(f) = &self.filter_input {
            names.push(f.name.as_str());
        }
        names
    }

    /// Object type whose fields read from a [`Document`] parent value.
    pub fn object_type(&self) -> Object {
        self.object
            .fields
            .iter()
            .fold(Object::new(self.object.name.clone()), |obj, f| {
                obj.field(document_field(f.name.clone(), f.type_ref()))
            })
    }

    pub fn register(&self, builder: SchemaBuilder) -> SchemaBuilder {
        let mut builder = builder
            .register(self.object_type())
            .register(self.create_input.input_object())
            .register(self.update_input.input_object());
        if let Some(filter) = &self.filter_input {
            builder = builder.register(filter.input_object());
        }
        builder
    }
}

fn document_field(name: String, ty: TypeRef) -> Field {
    Field::new(name.clone(), ty, move |ctx| {
        let name = name.clone();
        FieldFuture::new(async move {
            let doc = ctx.parent_value.try_downcast_ref::<Document>()?;
            json_to_field_value(doc.get(&name))
        })
    })
}

/// JSON document value to a resolver result; missing and null both resolve to null.
pub fn json_to_field_value<'a>(v: Option<&Value>) -> async_graphql::Result<Option<FieldValue<'a>>> {
    match v {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => {
            let values = items
                .iter()
                .map(|i| ConstValue::from_json(i.clone()).map(FieldValue::value))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Some(FieldValue::list(values)))
        }
        Some(v) => Ok(Some(FieldValue::value(ConstValue::from_json(v.clone())?))),
    }
}

/// Types shared by every model: the `DateTime` scalar and `PaginationInput`.
pub fn register_shared_types(builder: SchemaBuilder) -> SchemaBuilder {
    let date_time = Scalar::new(DATE_TIME)
        .description("RFC 3339 timestamp")
        .validator(|v| match v {
            ConstValue::String(s) => chrono::DateTime::parse_from_rfc3339(s).is_ok(),
            _ => false,
        });
    let pagination = InputObject::new(PAGINATION_INPUT)
        .field(InputValue::new("limit", TypeRef::named(TypeRef::INT)))
        .field(InputValue::new("offset", TypeRef::named(TypeRef::INT)));
    builder.register(date_time).register(pagination)
}

pub struct GraphqlTypeBuilder;

impl GraphqlTypeBuilder {
    /// Validate a raw definition and build its GraphQL types.
    pub fn build(config: &ModelDefinitionConfig) -> Result<GraphqlTypeSet, ConfigError> {
        let definition = resolve_definition(config)?;
        Ok(Self::from_definition(&definition))
    }

    pub fn from_definition(definition: &ModelDefinition) -> GraphqlTypeSet {
        let name = &definition.name;

        let mut object_fields = vec![
            GraphqlField::new("id", TypeRef::ID, true),
            GraphqlField::new("createdAt", DATE_TIME, true),
            GraphqlField::new("updatedAt", DATE_TIME, true),
        ];
        object_fields.extend(
            definition
                .fields
                .iter()
                .map(|f| GraphqlField::from_def(f, !f.nullable())),
        );

        let create_fields = definition
            .fields
            .iter()
            .map(|f| GraphqlField::from_def(f, f.required && f.default.is_none()))
            .collect();
        let update_fields = definition
            .fields
            .iter()
            .map(|f| GraphqlField::from_def(f, false))
            .collect();
        let filter_fields: Vec<_> = definition
            .fields
            .iter()
            .filter(|f| !f.kind.is_array())
            .map(|f| GraphqlField::from_def(f, false))
            .collect();

        GraphqlTypeSet {
            object: GraphqlTypeDesc {
                name: name.clone(),
                fields: object_fields,
            },
            create_input: GraphqlTypeDesc {
                name: format!("Create{}Input", name),
                fields: create_fields,
            },
            update_input: GraphqlTypeDesc {
                name: format!("Update{}Input", name),
                fields: update_fields,
            },
            filter_input: (!filter_fields.is_empty()).then(|| GraphqlTypeDesc {
                name: format!("{}Filter", name),
                fields: filter_fields,
            }),
        }
    }
}
