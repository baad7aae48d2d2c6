//! Diesel schema for task lifecycle persistence.

diesel::table! {
    /// Scoring task records.
    tasks (id) {
        /// Internal task identifier.
        id -> Uuid,
        /// Day whose visits are scored.
        date -> Date,
        /// Analytics counter identifier.
        counter_id -> Int8,
        /// API token used by the worker.
        token -> Text,
        /// Task lifecycle status.
        #[max_length = 20]
        status -> Varchar,
        /// Progress percentage.
        progress -> Int2,
        /// Last reported step.
        message -> Text,
        /// Failure description.
        error -> Nullable<Text>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// First running timestamp.
        started_at -> Nullable<Timestamptz>,
        /// Terminal status timestamp.
        finished_at -> Nullable<Timestamptz>,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Immutable scored visit lists of finished tasks.
    task_results (task_id) {
        /// Owning task identifier.
        task_id -> Uuid,
        /// Ordered scored visits.
        visits -> Jsonb,
        /// Number of stored visits.
        total -> Int4,
        /// Write timestamp.
        created_at -> Timestamptz,
    }
}

diesel::joinable!(task_results -> tasks (task_id));
diesel::allow_tables_to_appear_in_same_query!(tasks, task_results);
