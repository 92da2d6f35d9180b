//! GraphQL route: POST executes, GET serves the playground.

use crate::handlers;
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

pub fn graphql_routes(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/graphql", post(handlers::graphql).get(handlers::playground))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}
