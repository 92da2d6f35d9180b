//! GraphQL over HTTP. Requests are parsed by hand and executed against the dynamic schema.

use crate::api::RequestAuth;
use crate::state::AppState;
use async_graphql::http::{playground_source, GraphQLPlaygroundConfig};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Json, Response};
use serde_json::{json, Value};

/// POST /graphql. Body: `{"query": "...", "variables": {...}, "operationName": "..."}`.
/// A malformed body is a 400; GraphQL errors are returned with 200.
pub async fn graphql(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let request = match parse_request(&body) {
        Ok(req) => req,
        Err(msg) => {
            tracing::warn!(error = %msg, "rejected graphql request");
            let body = json!({ "errors": [{ "message": msg }] });
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }
    };
    let request = match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(auth) => request.data(RequestAuth(auth.to_string())),
        None => request,
    };
    let response = state.schema.execute(request).await;
    let body = serde_json::to_value(&response)
        .unwrap_or_else(|_| json!({ "errors": [{ "message": "serialization error" }] }));
    (StatusCode::OK, Json(body)).into_response()
}

/// GET /graphql
pub async fn playground() -> impl IntoResponse {
    Html(playground_source(GraphQLPlaygroundConfig::new("/graphql")))
}

fn parse_request(body: &[u8]) -> Result<async_graphql::Request, String> {
    let val: Value = serde_json::from_slice(body).map_err(|e| format!("invalid JSON: {}", e))?;
    let query = val
        .get("query")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing 'query'".to_string())?;
    let mut req = async_graphql::Request::new(query);
    match val.get("variables") {
        None | Some(Value::Null) => {}
        Some(vars @ Value::Object(_)) => {
            req = req.variables(async_graphql::Variables::from_json(vars.clone()));
        }
        Some(_) => return Err("'variables' must be an object".into()),
    }
    if let Some(op) = val.get("operationName").and_then(Value::as_str) {
        req = req.operation_name(op);
    }
    Ok(req)
}
