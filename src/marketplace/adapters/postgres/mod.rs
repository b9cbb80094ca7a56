//! `PostgreSQL` adapters for marketplace task persistence.

mod models;
mod repository;
mod schema;

pub use repository::{MarketPgPool, PostgresTaskRepository};
