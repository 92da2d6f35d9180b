//! `create<Name>(input)`: validate, persist, return the stored record.

use super::{
    document_arg, request_auth, Endpoint, EndpointOptions, HookContext, Operation, RequestValidator,
};
use crate::error::AppError;
use crate::model::CompiledModel;
use crate::store::Document;
use async_graphql::dynamic::{Field, FieldFuture, FieldValue, InputValue, TypeRef};
use async_graphql::ErrorExtensions;
use std::sync::Arc;

pub struct CreateApi;

impl CreateApi {
    pub fn build(model: &Arc<CompiledModel>, options: &EndpointOptions) -> Endpoint {
        let name = Operation::Create.field_name(&model.name);
        let input_type = model.graphql.create_input.name.clone();
        let resolver_model = model.clone();
        let resolver_options = options.clone();
        let field = Field::new(
            name.clone(),
            TypeRef::named_nn(model.graphql.object.name.clone()),
            move |ctx| {
                let model = resolver_model.clone();
                let options = resolver_options.clone();
                FieldFuture::new(async move {
                    let input = document_arg(&ctx, "input")?;
                    let auth = request_auth(&ctx);
                    let doc = Self::create(&model, &options, input, auth.as_deref())
                        .await
                        .map_err(|e| e.extend())?;
                    Ok(Some(FieldValue::owned_any(doc)))
                })
            },
        )
        .argument(InputValue::new("input", TypeRef::named_nn(input_type)));
        Endpoint {
            root: Operation::Create.root(),
            name,
            model: model.name.clone(),
            operation: Operation::Create,
            field,
        }
    }

    pub async fn create(
        model: &CompiledModel,
        options: &EndpointOptions,
        mut input: Document,
        auth: Option<&str>,
    ) -> Result<Document, AppError> {
        let hook_ctx = HookContext {
            operation: Operation::Create,
            model: &model.name,
            id: None,
            auth,
        };
        options.authorize(&hook_ctx).await?;
        RequestValidator::validate(&input, &model.definition)?;
        options.before_save(&hook_ctx, &mut input).await?;
        RequestValidator::validate(&input, &model.definition)?;
        let doc = model.collection.insert(input).await?;
        tracing::debug!(model = %model.name, "created record");
        options.after_save(&hook_ctx, &doc).await?;
        Ok(doc)
    }
}
