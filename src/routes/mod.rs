//! Route tables.

pub mod common;
pub mod graphql;

pub use common::common_routes;
pub use graphql::graphql_routes;

use crate::state::AppState;
use axum::Router;

/// Every route the server mounts.
pub fn app_routes(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .merge(common_routes(state.clone()))
        .merge(graphql_routes(state, body_limit))
}
