//! HTTP handlers for the GraphQL endpoint.

pub mod graphql;
pub use graphql::*;
