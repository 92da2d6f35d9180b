//! Shared application state for all routes.

use crate::store::Connection;
use async_graphql::dynamic::Schema;

#[derive(Clone)]
pub struct AppState {
    pub schema: Schema,
    pub connection: Connection,
}
