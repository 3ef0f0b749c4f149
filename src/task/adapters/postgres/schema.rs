//! Diesel schema for task lifecycle persistence.

diesel::table! {
    /// Task records with complaint-origin attributes and lifecycle state.
    tasks (id) {
        /// Internal task identifier.
        id -> Uuid,
        /// Source complaint reference.
        complaint_id -> Uuid,
        /// Responsible department.
        #[max_length = 100]
        department -> Varchar,
        /// Problem category.
        #[max_length = 100]
        category -> Varchar,
        /// Reported location.
        location -> Text,
        /// Optional complaint description.
        description -> Nullable<Text>,
        /// Task priority.
        #[max_length = 20]
        priority -> Varchar,
        /// Current lifecycle status.
        #[max_length = 50]
        status -> Varchar,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Time the current status began.
        status_entered_at -> Timestamptz,
        /// Deadline for the current status.
        deadline -> Nullable<Timestamptz>,
        /// Optimistic concurrency version.
        version -> Int8,
        /// Digest of the newest history entry.
        #[max_length = 64]
        history_head -> Nullable<Varchar>,
    }
}

diesel::table! {
    /// Append-only status history.
    task_status_history (id) {
        /// History entry identifier.
        id -> Uuid,
        /// Owning task.
        task_id -> Uuid,
        /// One-based position in the task's history.
        sequence -> Int8,
        /// Status before the transition.
        #[max_length = 50]
        from_status -> Varchar,
        /// Status after the transition.
        #[max_length = 50]
        to_status -> Varchar,
        /// Actor that requested the transition.
        #[max_length = 255]
        changed_by -> Varchar,
        /// Caller remark.
        remark -> Text,
        /// Transition timestamp.
        recorded_at -> Timestamptz,
        /// Digest of the preceding entry.
        #[max_length = 64]
        previous_digest -> Nullable<Varchar>,
        /// Digest of this entry.
        #[max_length = 64]
        digest -> Varchar,
    }
}

diesel::table! {
    /// Service-level breach records.
    sla_breaches (id) {
        /// Breach identifier.
        id -> Uuid,
        /// Breached task.
        task_id -> Uuid,
        /// Status in which the breach occurred.
        #[max_length = 50]
        status -> Varchar,
        /// Start of the breached occurrence.
        status_entered_at -> Timestamptz,
        /// Exceeded deadline.
        deadline -> Timestamptz,
        /// Detection timestamp.
        detected_at -> Timestamptz,
        /// Seconds spent in the status at detection.
        elapsed_seconds -> Int8,
        /// Allotted seconds for the status.
        sla_seconds -> Int8,
        /// Owning department.
        #[max_length = 100]
        department -> Varchar,
        /// Task priority at detection.
        #[max_length = 20]
        priority -> Varchar,
    }
}
