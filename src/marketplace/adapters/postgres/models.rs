//! Diesel row models for marketplace task persistence.

use super::schema::market_tasks;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for task records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = market_tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Sequential task identifier.
    pub id: i64,
    /// Posting provider.
    pub provider: String,
    /// Assigned developer, if any.
    pub developer: Option<String>,
    /// Auditor applicants.
    pub auditors: Vec<String>,
    /// Lifecycle status.
    pub status: String,
    /// Serialized aggregate.
    pub record: Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert model for task records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = market_tasks)]
pub struct NewTaskRow {
    /// Sequential task identifier.
    pub id: i64,
    /// Posting provider.
    pub provider: String,
    /// Assigned developer, if any.
    pub developer: Option<String>,
    /// Auditor applicants.
    pub auditors: Vec<String>,
    /// Lifecycle status.
    pub status: String,
    /// Serialized aggregate.
    pub record: Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Row returned by identifier-only lookups and sequence reads.
#[derive(Debug, Clone, QueryableByName)]
pub struct TaskIdRow {
    /// Task identifier.
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub id: i64,
}
