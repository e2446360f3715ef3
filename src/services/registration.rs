use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::database::{InsertOutcome, TripStore};
use crate::utils::date::encode_yymmdd;

/// Failure kinds of the registration coordinator.
///
/// The HTTP layer selects status codes from these variants; the display
/// strings are for humans only and must never be pattern-matched.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Trip {0} does not exist")]
    TripNotFound(i32),

    #[error("Client {0} does not exist")]
    ClientNotFound(i32),

    #[error("There is no registration for client {client_id} on trip {trip_id}")]
    RegistrationNotFound { client_id: i32, trip_id: i32 },

    #[error("There are no free places left in trip {0}")]
    TripFull(i32),

    #[error("Client {client_id} is already registered for trip {trip_id}")]
    AlreadyRegistered { client_id: i32, trip_id: i32 },

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Coordinates existence checks, the capacity check and the registration
/// mutation. All storage access goes through the [`TripStore`] gateway.
pub struct RegistrationService {
    store: Arc<dyn TripStore>,
}

impl RegistrationService {
    pub fn new(store: Arc<dyn TripStore>) -> Self {
        Self { store }
    }

    pub async fn trip_exists(&self, trip_id: i32) -> Result<bool, RegistrationError> {
        Ok(self.store.trip_exists(trip_id).await?)
    }

    pub async fn client_exists(&self, client_id: i32) -> Result<bool, RegistrationError> {
        Ok(self.store.client_exists(client_id).await?)
    }

    /// Capacity evaluator: a trip at `max_people` registrations is full.
    pub async fn has_free_capacity(&self, trip_id: i32) -> Result<bool, RegistrationError> {
        let max = self
            .store
            .max_capacity(trip_id)
            .await?
            .ok_or(RegistrationError::TripNotFound(trip_id))?;
        let registered = self.store.count_registrations(trip_id).await?;

        Ok(registered < i64::from(max))
    }

    /// Register a client for a trip.
    ///
    /// The checks here produce precise error kinds; admission itself is
    /// enforced by the store's conditional insert, so a capacity race
    /// between the check and the write cannot over-admit.
    pub async fn register(
        &self,
        client_id: i32,
        trip_id: i32,
    ) -> Result<String, RegistrationError> {
        if !self.store.trip_exists(trip_id).await? {
            return Err(RegistrationError::TripNotFound(trip_id));
        }
        if !self.store.client_exists(client_id).await? {
            return Err(RegistrationError::ClientNotFound(client_id));
        }
        if !self.has_free_capacity(trip_id).await? {
            return Err(RegistrationError::TripFull(trip_id));
        }

        let registered_at = encode_yymmdd(Utc::now().date_naive());
        match self
            .store
            .insert_registration(client_id, trip_id, registered_at)
            .await?
        {
            InsertOutcome::Inserted => {
                info!("Client {} registered for trip {}", client_id, trip_id);
                Ok(format!(
                    "Trip {} has been registered for client {}",
                    trip_id, client_id
                ))
            }
            InsertOutcome::Full => Err(RegistrationError::TripFull(trip_id)),
            InsertOutcome::Duplicate => Err(RegistrationError::AlreadyRegistered {
                client_id,
                trip_id,
            }),
        }
    }

    /// Remove a client's registration for a trip.
    pub async fn unregister(
        &self,
        client_id: i32,
        trip_id: i32,
    ) -> Result<String, RegistrationError> {
        if !self.store.trip_exists(trip_id).await? {
            return Err(RegistrationError::TripNotFound(trip_id));
        }
        if !self.store.client_exists(client_id).await? {
            return Err(RegistrationError::ClientNotFound(client_id));
        }
        if !self.store.registration_exists(client_id, trip_id).await? {
            return Err(RegistrationError::RegistrationNotFound { client_id, trip_id });
        }

        let deleted = self.store.delete_registration(client_id, trip_id).await?;
        if deleted == 0 {
            // Lost a race with a concurrent unregister.
            return Err(RegistrationError::RegistrationNotFound { client_id, trip_id });
        }

        info!("Client {} unregistered from trip {}", client_id, trip_id);
        Ok(format!(
            "Trip {} has been unregistered for client {}",
            trip_id, client_id
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::store::MockTripStore;

    fn service(store: MockTripStore) -> RegistrationService {
        RegistrationService::new(Arc::new(store))
    }

    #[tokio::test]
    async fn register_fails_for_missing_trip_before_touching_anything_else() {
        let mut store = MockTripStore::new();
        store.expect_trip_exists().returning(|_| Ok(false));

        let result = service(store).register(5, 42).await;

        assert!(matches!(result, Err(RegistrationError::TripNotFound(42))));
    }

    #[tokio::test]
    async fn register_fails_for_missing_client() {
        let mut store = MockTripStore::new();
        store.expect_trip_exists().returning(|_| Ok(true));
        store.expect_client_exists().returning(|_| Ok(false));

        let result = service(store).register(99, 1).await;

        assert!(matches!(result, Err(RegistrationError::ClientNotFound(99))));
    }

    #[tokio::test]
    async fn register_on_full_trip_is_rejected_without_insert() {
        let mut store = MockTripStore::new();
        store.expect_trip_exists().returning(|_| Ok(true));
        store.expect_client_exists().returning(|_| Ok(true));
        store.expect_max_capacity().returning(|_| Ok(Some(2)));
        store.expect_count_registrations().returning(|_| Ok(2));
        // No insert expectation: calling it would fail the test.

        let result = service(store).register(5, 1).await;

        assert!(matches!(result, Err(RegistrationError::TripFull(1))));
    }

    #[tokio::test]
    async fn register_inserts_with_a_valid_encoded_date() {
        let expected_date = encode_yymmdd(Utc::now().date_naive());

        let mut store = MockTripStore::new();
        store.expect_trip_exists().returning(|_| Ok(true));
        store.expect_client_exists().returning(|_| Ok(true));
        store.expect_max_capacity().returning(|_| Ok(Some(5)));
        store.expect_count_registrations().returning(|_| Ok(1));
        store
            .expect_insert_registration()
            .withf(move |client_id, trip_id, registered_at| {
                *client_id == 7 && *trip_id == 2 && *registered_at == expected_date
            })
            .returning(|_, _, _| Ok(InsertOutcome::Inserted));

        let message = service(store).register(7, 2).await.unwrap();

        assert_eq!(message, "Trip 2 has been registered for client 7");
    }

    #[tokio::test]
    async fn register_losing_capacity_race_reports_full() {
        // Capacity check passes, but the conditional insert sees the trip
        // filled by a concurrent registration.
        let mut store = MockTripStore::new();
        store.expect_trip_exists().returning(|_| Ok(true));
        store.expect_client_exists().returning(|_| Ok(true));
        store.expect_max_capacity().returning(|_| Ok(Some(3)));
        store.expect_count_registrations().returning(|_| Ok(2));
        store
            .expect_insert_registration()
            .returning(|_, _, _| Ok(InsertOutcome::Full));

        let result = service(store).register(4, 9).await;

        assert!(matches!(result, Err(RegistrationError::TripFull(9))));
    }

    #[tokio::test]
    async fn registering_twice_is_a_conflict() {
        let mut store = MockTripStore::new();
        store.expect_trip_exists().returning(|_| Ok(true));
        store.expect_client_exists().returning(|_| Ok(true));
        store.expect_max_capacity().returning(|_| Ok(Some(10)));
        store.expect_count_registrations().returning(|_| Ok(3));
        store
            .expect_insert_registration()
            .returning(|_, _, _| Ok(InsertOutcome::Duplicate));

        let result = service(store).register(7, 2).await;

        assert!(matches!(
            result,
            Err(RegistrationError::AlreadyRegistered { client_id: 7, trip_id: 2 })
        ));
    }

    #[tokio::test]
    async fn storage_failure_is_not_reported_as_missing() {
        let mut store = MockTripStore::new();
        store
            .expect_trip_exists()
            .returning(|_| Err(sqlx::Error::PoolTimedOut));

        let result = service(store).register(1, 1).await;

        assert!(matches!(result, Err(RegistrationError::Storage(_))));
    }

    #[tokio::test]
    async fn unregister_fails_for_missing_trip() {
        let mut store = MockTripStore::new();
        store.expect_trip_exists().returning(|_| Ok(false));

        let result = service(store).unregister(5, 8).await;

        assert!(matches!(result, Err(RegistrationError::TripNotFound(8))));
    }

    #[tokio::test]
    async fn unregister_fails_for_missing_client() {
        let mut store = MockTripStore::new();
        store.expect_trip_exists().returning(|_| Ok(true));
        store.expect_client_exists().returning(|_| Ok(false));

        let result = service(store).unregister(99, 2).await;

        assert!(matches!(result, Err(RegistrationError::ClientNotFound(99))));
    }

    #[tokio::test]
    async fn unregister_of_missing_registration_deletes_nothing() {
        let mut store = MockTripStore::new();
        store.expect_trip_exists().returning(|_| Ok(true));
        store.expect_client_exists().returning(|_| Ok(true));
        store.expect_registration_exists().returning(|_, _| Ok(false));
        // No delete expectation: calling it would fail the test.

        let result = service(store).unregister(5, 1).await;

        assert!(matches!(
            result,
            Err(RegistrationError::RegistrationNotFound { client_id: 5, trip_id: 1 })
        ));
    }

    #[tokio::test]
    async fn unregister_removes_the_registration() {
        let mut store = MockTripStore::new();
        store.expect_trip_exists().returning(|_| Ok(true));
        store.expect_client_exists().returning(|_| Ok(true));
        store.expect_registration_exists().returning(|_, _| Ok(true));
        store
            .expect_delete_registration()
            .withf(|client_id, trip_id| *client_id == 7 && *trip_id == 2)
            .returning(|_, _| Ok(1));

        let message = service(store).unregister(7, 2).await.unwrap();

        assert_eq!(message, "Trip 2 has been unregistered for client 7");
    }

    #[tokio::test]
    async fn unregister_then_register_restores_the_registration() {
        let mut store = MockTripStore::new();
        store.expect_trip_exists().returning(|_| Ok(true));
        store.expect_client_exists().returning(|_| Ok(true));
        store.expect_registration_exists().returning(|_, _| Ok(true));
        store
            .expect_delete_registration()
            .times(1)
            .withf(|client_id, trip_id| *client_id == 7 && *trip_id == 2)
            .returning(|_, _| Ok(1));
        store.expect_max_capacity().returning(|_| Ok(Some(5)));
        store.expect_count_registrations().returning(|_| Ok(1));
        store
            .expect_insert_registration()
            .times(1)
            .withf(|client_id, trip_id, _| *client_id == 7 && *trip_id == 2)
            .returning(|_, _, _| Ok(InsertOutcome::Inserted));

        let service = service(store);

        service.unregister(7, 2).await.unwrap();
        let message = service.register(7, 2).await.unwrap();

        assert_eq!(message, "Trip 2 has been registered for client 7");
    }

    #[tokio::test]
    async fn existence_checks_reflect_the_store() {
        let mut store = MockTripStore::new();
        store
            .expect_trip_exists()
            .withf(|trip_id| *trip_id == 3)
            .returning(|_| Ok(false));
        store
            .expect_client_exists()
            .withf(|client_id| *client_id == 4)
            .returning(|_| Ok(true));

        let service = service(store);

        assert!(!service.trip_exists(3).await.unwrap());
        assert!(service.client_exists(4).await.unwrap());
    }

    #[tokio::test]
    async fn has_free_capacity_is_false_exactly_at_capacity() {
        let mut store = MockTripStore::new();
        store.expect_max_capacity().returning(|_| Ok(Some(2)));
        store.expect_count_registrations().returning(|_| Ok(2));

        assert!(!service(store).has_free_capacity(1).await.unwrap());
    }

    #[tokio::test]
    async fn has_free_capacity_is_true_below_capacity() {
        let mut store = MockTripStore::new();
        store.expect_max_capacity().returning(|_| Ok(Some(5)));
        store.expect_count_registrations().returning(|_| Ok(1));

        assert!(service(store).has_free_capacity(2).await.unwrap());
    }
}
