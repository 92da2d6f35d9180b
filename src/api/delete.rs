//! `delete<Name>(id)`: remove a record; true on success, NotFound when absent.

use super::{id_arg, request_auth, Endpoint, EndpointOptions, HookContext, Operation};
use crate::error::AppError;
use crate::model::CompiledModel;
use async_graphql::dynamic::{Field, FieldFuture, FieldValue, InputValue, TypeRef};
use async_graphql::ErrorExtensions;
use std::sync::Arc;

pub struct DeleteApi;

impl DeleteApi {
    pub fn build(model: &Arc<CompiledModel>, options: &EndpointOptions) -> Endpoint {
        let name = Operation::Delete.field_name(&model.name);
        let resolver_model = model.clone();
        let resolver_options = options.clone();
        let field = Field::new(name.clone(), TypeRef::named_nn(TypeRef::BOOLEAN), move |ctx| {
            let model = resolver_model.clone();
            let options = resolver_options.clone();
            FieldFuture::new(async move {
                let id = id_arg(&ctx)?;
                let auth = request_auth(&ctx);
                Self::delete(&model, &options, &id, auth.as_deref())
                    .await
                    .map_err(|e| e.extend())?;
                Ok(Some(FieldValue::value(true)))
            })
        })
        .argument(InputValue::new("id", TypeRef::named_nn(TypeRef::ID)));
        Endpoint {
            root: Operation::Delete.root(),
            name,
            model: model.name.clone(),
            operation: Operation::Delete,
            field,
        }
    }

    pub async fn delete(
        model: &CompiledModel,
        options: &EndpointOptions,
        id: &str,
        auth: Option<&str>,
    ) -> Result<(), AppError> {
        let hook_ctx = HookContext {
            operation: Operation::Delete,
            model: &model.name,
            id: Some(id),
            auth,
        };
        options.authorize(&hook_ctx).await?;
        if !model.collection.delete(id).await? {
            return Err(AppError::not_found(&model.name, id));
        }
        tracing::debug!(model = %model.name, id = %id, "deleted record");
        Ok(())
    }
}
