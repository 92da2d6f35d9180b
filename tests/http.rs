mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{memory_schema, startup_config, task_model};
use dryer::api::{EndpointHooks, HookContext};
use dryer::{app_routes, AppError, AppState, Dryer, EndpointOptions};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn router(dryer: Dryer) -> Router {
    let body_limit = dryer.config().body_limit;
    let (schema, connection) = memory_schema(&dryer).await;
    app_routes(AppState { schema, connection }, body_limit)
}

async fn post_graphql(app: Router, body: String, auth: Option<&str>) -> (StatusCode, Value) {
    let mut req = Request::post("/graphql").header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        req = req.header(header::AUTHORIZATION, auth);
    }
    let res = app.oneshot(req.body(Body::from(body)).unwrap()).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn health_ready_and_version() {
    let app = router(Dryer::init(startup_config(vec![task_model()]))).await;
    for path in ["/health", "/ready", "/version"] {
        let res = app
            .clone()
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "{path}");
    }
}

#[tokio::test]
async fn graphql_round_trip_over_http() {
    let app = router(Dryer::init(startup_config(vec![task_model()]))).await;
    let body = json!({
        "query": "mutation($t: String!) { createTask(input: { title: $t }) { title done } }",
        "variables": { "t": "x" }
    });
    let (status, res) = post_graphql(app, body.to_string(), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res["data"]["createTask"], json!({ "title": "x", "done": false }));
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let app = router(Dryer::init(startup_config(vec![task_model()]))).await;
    let (status, res) = post_graphql(app, "{not json".into(), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(res["errors"][0]["message"].is_string());
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let dryer = Dryer::init(startup_config(vec![task_model()]).body_limit(64));
    let app = router(dryer).await;
    let query = format!("{{ listTask {{ id }} }} # {}", "x".repeat(256));
    let (status, _) = post_graphql(app, json!({ "query": query }).to_string(), None).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

struct RequireToken;

#[async_trait::async_trait]
impl EndpointHooks for RequireToken {
    async fn authorize(&self, ctx: &HookContext<'_>) -> Result<(), AppError> {
        match ctx.auth {
            Some("Bearer secret") => Ok(()),
            _ => Err(AppError::Forbidden(format!("{} {}", ctx.operation, ctx.model))),
        }
    }
}

#[tokio::test]
async fn authorization_header_reaches_hooks() {
    let dryer = Dryer::init(startup_config(vec![task_model()]))
        .endpoint_options("Task", EndpointOptions::with_hooks(Arc::new(RequireToken)));
    let app = router(dryer).await;
    let body = json!({ "query": "{ listTask { id } }" }).to_string();

    let (_, denied) = post_graphql(app.clone(), body.clone(), None).await;
    assert_eq!(denied["errors"][0]["extensions"]["code"], "FORBIDDEN");

    let (_, allowed) = post_graphql(app, body, Some("Bearer secret")).await;
    assert_eq!(allowed["data"]["listTask"], json!([]));
}
