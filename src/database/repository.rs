use async_trait::async_trait;
use tracing::debug;

use super::store::{InsertOutcome, TripStore};
use super::{ClientTripRow, DbPool, NewClient, TripCountryRow};

pub struct Repository {
    pub pool: DbPool,
}

impl Repository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Liveness probe for the readiness endpoint.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(self.pool.get_pool())
            .await?;
        Ok(())
    }

    /// Ensure the trip/client/registration tables exist.
    ///
    /// The composite primary key on client_trip rejects duplicate
    /// registrations at the storage engine.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        let pool = self.pool.get_pool();

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS trip (
                id_trip SERIAL PRIMARY KEY,
                name VARCHAR(120) NOT NULL,
                description TEXT NOT NULL,
                date_from DATE NOT NULL,
                date_to DATE NOT NULL,
                max_people INT NOT NULL CHECK (max_people > 0)
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS client (
                id_client SERIAL PRIMARY KEY,
                first_name VARCHAR(120) NOT NULL,
                last_name VARCHAR(120) NOT NULL,
                email VARCHAR(120) NOT NULL,
                telephone VARCHAR(20) NOT NULL,
                pesel VARCHAR(11) NOT NULL
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS client_trip (
                id_client INT NOT NULL REFERENCES client(id_client),
                id_trip INT NOT NULL REFERENCES trip(id_trip),
                registered_at INT NOT NULL,
                payment_date INT,
                PRIMARY KEY (id_client, id_trip)
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS country (
                id_country SERIAL PRIMARY KEY,
                name VARCHAR(120) NOT NULL
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS country_trip (
                id_country INT NOT NULL REFERENCES country(id_country),
                id_trip INT NOT NULL REFERENCES trip(id_trip),
                PRIMARY KEY (id_country, id_trip)
            )"#,
        )
        .execute(pool)
        .await?;

        debug!("Schema ensured");
        Ok(())
    }

    /// All trips with their country names, one row per (trip, country) pair.
    pub async fn list_trips(&self) -> Result<Vec<TripCountryRow>, sqlx::Error> {
        let rows = sqlx::query_as::<_, TripCountryRow>(
            r#"SELECT
                t.id_trip,
                t.name,
                t.description,
                t.date_from,
                t.date_to,
                t.max_people,
                c.name AS country_name
               FROM trip t
               LEFT JOIN country_trip ct ON t.id_trip = ct.id_trip
               LEFT JOIN country c ON ct.id_country = c.id_country
               ORDER BY t.id_trip"#,
        )
        .fetch_all(self.pool.get_pool())
        .await?;

        Ok(rows)
    }

    /// Trips a client is registered for, with registration details.
    pub async fn trips_for_client(
        &self,
        client_id: i32,
    ) -> Result<Vec<ClientTripRow>, sqlx::Error> {
        let rows = sqlx::query_as::<_, ClientTripRow>(
            r#"SELECT
                t.id_trip,
                t.name,
                t.description,
                t.date_from,
                t.date_to,
                t.max_people,
                ct.registered_at,
                ct.payment_date
               FROM trip t
               JOIN client_trip ct ON t.id_trip = ct.id_trip
               WHERE ct.id_client = $1
               ORDER BY t.id_trip"#,
        )
        .bind(client_id)
        .fetch_all(self.pool.get_pool())
        .await?;

        debug!("Found {} trips for client {}", rows.len(), client_id);

        Ok(rows)
    }

    /// Insert a new client and return its generated id.
    pub async fn create_client(&self, client: &NewClient) -> Result<i32, sqlx::Error> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"INSERT INTO client (first_name, last_name, email, telephone, pesel)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id_client"#,
        )
        .bind(&client.first_name)
        .bind(&client.last_name)
        .bind(&client.email)
        .bind(&client.telephone)
        .bind(&client.pesel)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(id)
    }
}

#[async_trait]
impl TripStore for Repository {
    async fn trip_exists(&self, trip_id: i32) -> Result<bool, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM trip WHERE id_trip = $1",
        )
        .bind(trip_id)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(count > 0)
    }

    async fn client_exists(&self, client_id: i32) -> Result<bool, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM client WHERE id_client = $1",
        )
        .bind(client_id)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(count > 0)
    }

    async fn registration_exists(
        &self,
        client_id: i32,
        trip_id: i32,
    ) -> Result<bool, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM client_trip WHERE id_client = $1 AND id_trip = $2",
        )
        .bind(client_id)
        .bind(trip_id)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(count > 0)
    }

    async fn count_registrations(&self, trip_id: i32) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM client_trip WHERE id_trip = $1",
        )
        .bind(trip_id)
        .fetch_one(self.pool.get_pool())
        .await
    }

    async fn max_capacity(&self, trip_id: i32) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            "SELECT max_people FROM trip WHERE id_trip = $1",
        )
        .bind(trip_id)
        .fetch_optional(self.pool.get_pool())
        .await
    }

    async fn insert_registration(
        &self,
        client_id: i32,
        trip_id: i32,
        registered_at: i32,
    ) -> Result<InsertOutcome, sqlx::Error> {
        let mut transaction = self.pool.get_pool().begin().await?;

        // Locking the trip row serializes registrations per trip, so the
        // count below cannot go stale between the check and the insert.
        let max = sqlx::query_scalar::<_, i32>(
            "SELECT max_people FROM trip WHERE id_trip = $1 FOR UPDATE",
        )
        .bind(trip_id)
        .fetch_optional(&mut *transaction)
        .await?;

        let Some(max) = max else {
            return Err(sqlx::Error::RowNotFound);
        };

        let registered = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM client_trip WHERE id_trip = $1",
        )
        .bind(trip_id)
        .fetch_one(&mut *transaction)
        .await?;

        if registered >= i64::from(max) {
            return Ok(InsertOutcome::Full);
        }

        let inserted = sqlx::query(
            r#"INSERT INTO client_trip (id_client, id_trip, registered_at)
               VALUES ($1, $2, $3)"#,
        )
        .bind(client_id)
        .bind(trip_id)
        .bind(registered_at)
        .execute(&mut *transaction)
        .await;

        match inserted {
            Ok(_) => {
                transaction.commit().await?;
                debug!("Registered client {} for trip {}", client_id, trip_id);
                Ok(InsertOutcome::Inserted)
            }
            Err(e) if e.as_database_error().is_some_and(|d| d.is_unique_violation()) => {
                Ok(InsertOutcome::Duplicate)
            }
            Err(e) => Err(e),
        }
    }

    async fn delete_registration(
        &self,
        client_id: i32,
        trip_id: i32,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM client_trip WHERE id_client = $1 AND id_trip = $2",
        )
        .bind(client_id)
        .bind(trip_id)
        .execute(self.pool.get_pool())
        .await?;

        Ok(result.rows_affected())
    }
}
