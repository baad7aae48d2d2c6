//! Diesel schema for conversion upload persistence.

diesel::table! {
    /// Offline conversion upload records.
    conversion_uploads (id) {
        /// Internal upload identifier.
        id -> Uuid,
        /// Task the rows came from.
        task_id -> Nullable<Uuid>,
        /// Target counter.
        counter_id -> Int8,
        /// Goal name.
        target -> Text,
        /// API token used for reconciliation.
        token -> Text,
        /// Upload lifecycle status.
        #[max_length = 20]
        status -> Varchar,
        /// Rows sent.
        total -> Int4,
        /// Rows processed remotely.
        processed -> Int4,
        /// Error details as a JSON array of strings.
        errors -> Nullable<Jsonb>,
        /// Remote upload identifier.
        external_id -> Nullable<Int8>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}
