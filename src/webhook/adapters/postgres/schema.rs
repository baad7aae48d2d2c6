//! Diesel schema for webhook persistence.

diesel::table! {
    /// Registered inbound webhooks.
    webhooks (id) {
        /// Internal webhook identifier.
        id -> Uuid,
        /// Display name.
        name -> Text,
        /// Optional description.
        description -> Nullable<Text>,
        /// Bound counter.
        counter_id -> Int8,
        /// Token used for uploads.
        token -> Text,
        /// HMAC-SHA256 digest of the secret.
        secret_digest -> Bytea,
        /// Whether deliveries are accepted.
        is_active -> Bool,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// One inbound delivery per row.
    webhook_batches (id) {
        /// Internal batch identifier.
        id -> Uuid,
        /// Owning webhook.
        webhook_id -> Uuid,
        /// Counter the conversions are sent to.
        counter_id -> Int8,
        /// Aggregate status derived from the batch's conversions.
        #[max_length = 30]
        status -> Varchar,
        /// Number of conversions.
        total -> Int4,
        /// Conversions no longer pending.
        processed -> Int4,
        /// First remote upload reference.
        metrika_upload_id -> Nullable<Int8>,
        /// Failure details as a JSON array of strings.
        errors -> Nullable<Jsonb>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Conversions delivered in a batch.
    webhook_conversions (id) {
        /// Internal conversion identifier.
        id -> Uuid,
        /// Owning batch.
        batch_id -> Uuid,
        /// Zero-based position in the delivery.
        position -> Int4,
        /// Metrika client identifier.
        client_id -> Nullable<Text>,
        /// Site-assigned user identifier.
        user_id -> Nullable<Text>,
        /// Ad click identifier.
        yclid -> Nullable<Text>,
        /// Purchase identifier.
        purchase_id -> Nullable<Text>,
        /// Goal name.
        target -> Text,
        /// When the conversion happened.
        date_time -> Timestamptz,
        /// Goal value.
        price -> Nullable<Float8>,
        /// ISO 4217 currency.
        #[max_length = 3]
        currency -> Nullable<Varchar>,
        /// Delivery status.
        #[max_length = 20]
        status -> Varchar,
        /// Failure detail.
        error -> Nullable<Text>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}
