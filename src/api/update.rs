//! `update<Name>(id, input)`: partial merge into an existing record.

use super::{
    document_arg, id_arg, request_auth, Endpoint, EndpointOptions, HookContext, Operation,
    RequestValidator,
};
use crate::error::AppError;
use crate::model::CompiledModel;
use crate::store::Document;
use async_graphql::dynamic::{Field, FieldFuture, FieldValue, InputValue, TypeRef};
use async_graphql::ErrorExtensions;
use std::sync::Arc;

pub struct UpdateApi;

impl UpdateApi {
    pub fn build(model: &Arc<CompiledModel>, options: &EndpointOptions) -> Endpoint {
        let name = Operation::Update.field_name(&model.name);
        let input_type = model.graphql.update_input.name.clone();
        let resolver_model = model.clone();
        let resolver_options = options.clone();
        let field = Field::new(
            name.clone(),
            TypeRef::named_nn(model.graphql.object.name.clone()),
            move |ctx| {
                let model = resolver_model.clone();
                let options = resolver_options.clone();
                FieldFuture::new(async move {
                    let id = id_arg(&ctx)?;
                    let patch = document_arg(&ctx, "input")?;
                    let auth = request_auth(&ctx);
                    let doc = Self::update(&model, &options, &id, patch, auth.as_deref())
                        .await
                        .map_err(|e| e.extend())?;
                    Ok(Some(FieldValue::owned_any(doc)))
                })
            },
        )
        .argument(InputValue::new("id", TypeRef::named_nn(TypeRef::ID)))
        .argument(InputValue::new("input", TypeRef::named_nn(input_type)));
        Endpoint {
            root: Operation::Update.root(),
            name,
            model: model.name.clone(),
            operation: Operation::Update,
            field,
        }
    }

    pub async fn update(
        model: &CompiledModel,
        options: &EndpointOptions,
        id: &str,
        mut patch: Document,
        auth: Option<&str>,
    ) -> Result<Document, AppError> {
        let hook_ctx = HookContext {
            operation: Operation::Update,
            model: &model.name,
            id: Some(id),
            auth,
        };
        options.authorize(&hook_ctx).await?;
        RequestValidator::validate_partial(&patch, &model.definition, true)?;
        options.before_save(&hook_ctx, &mut patch).await?;
        RequestValidator::validate_partial(&patch, &model.definition, true)?;
        let doc = model
            .collection
            .update(id, patch)
            .await?
            .ok_or_else(|| AppError::not_found(&model.name, id))?;
        tracing::debug!(model = %model.name, id = %id, "updated record");
        options.after_save(&hook_ctx, &doc).await?;
        Ok(doc)
    }
}
