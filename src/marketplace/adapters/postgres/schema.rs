//! Diesel schema for marketplace task persistence.

diesel::table! {
    /// Task aggregates with indexed participant columns.
    market_tasks (id) {
        /// Sequential task identifier.
        id -> Int8,
        /// Posting provider.
        #[max_length = 255]
        provider -> Varchar,
        /// Assigned developer, if any.
        #[max_length = 255]
        developer -> Nullable<Varchar>,
        /// Auditor applicants in application order.
        auditors -> Array<Text>,
        /// Lifecycle status.
        #[max_length = 50]
        status -> Varchar,
        /// Serialized task aggregate including escrow and ballots.
        record -> Jsonb,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}
