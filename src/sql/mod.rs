//! Safe parameterized SQL builder for collections stored in PostgreSQL.

mod builder;
mod params;

pub use builder::{columns, delete, insert, select_by_id, select_list, update, Column, QueryBuf};
pub use params::PgBindValue;
