use async_trait::async_trait;

/// Result of the conditional registration insert.
///
/// The insert statement itself decides between these cases while holding a
/// lock on the trip row, so concurrent registrations cannot over-admit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The trip is at `max_people`; nothing was written.
    Full,
    /// The (client, trip) pair is already registered; nothing was written.
    Duplicate,
}

/// Storage gateway consumed by the registration coordinator.
///
/// Existence checks return `Ok(false)` only for a genuinely missing row;
/// backend failures surface as `Err`, never as a silent `false`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TripStore: Send + Sync {
    async fn trip_exists(&self, trip_id: i32) -> Result<bool, sqlx::Error>;

    async fn client_exists(&self, client_id: i32) -> Result<bool, sqlx::Error>;

    async fn registration_exists(
        &self,
        client_id: i32,
        trip_id: i32,
    ) -> Result<bool, sqlx::Error>;

    async fn count_registrations(&self, trip_id: i32) -> Result<i64, sqlx::Error>;

    /// Maximum capacity of the trip, or `None` when the trip does not exist.
    async fn max_capacity(&self, trip_id: i32) -> Result<Option<i32>, sqlx::Error>;

    /// Insert a registration only while the trip has free places.
    /// `registered_at` is the YYMMDD-encoded registration date.
    async fn insert_registration(
        &self,
        client_id: i32,
        trip_id: i32,
        registered_at: i32,
    ) -> Result<InsertOutcome, sqlx::Error>;

    /// Delete a registration, returning the number of rows removed.
    async fn delete_registration(
        &self,
        client_id: i32,
        trip_id: i32,
    ) -> Result<u64, sqlx::Error>;
}
