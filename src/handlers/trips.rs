use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    Json,
};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::database::{ClientTripRow, Repository};
use crate::services::RegistrationService;
use crate::utils::error::ApiError;

#[derive(Debug, Serialize)]
pub struct TripInfo {
    pub id_trip: i32,
    pub name: String,
    pub description: String,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub max_people: i32,
    pub countries: Vec<CountryInfo>,
}

#[derive(Debug, Serialize)]
pub struct CountryInfo {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct TripsResponse {
    pub trips: Vec<TripInfo>,
    pub total: usize,
}

/// GET /api/trips - all trips with their nested country names.
pub async fn get_trips(
    Extension(repository): Extension<Arc<Repository>>,
) -> Result<Json<TripsResponse>, ApiError> {
    let rows = repository
        .list_trips()
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    // One joined row per (trip, country); regroup into trips.
    let mut trips: BTreeMap<i32, TripInfo> = BTreeMap::new();
    for row in rows {
        let entry = trips.entry(row.id_trip).or_insert_with(|| TripInfo {
            id_trip: row.id_trip,
            name: row.name.clone(),
            description: row.description.clone(),
            date_from: row.date_from,
            date_to: row.date_to,
            max_people: row.max_people,
            countries: Vec::new(),
        });
        if let Some(country_name) = row.country_name {
            entry.countries.push(CountryInfo { name: country_name });
        }
    }

    let trips: Vec<TripInfo> = trips.into_values().collect();
    let total = trips.len();

    Ok(Json(TripsResponse { trips, total }))
}

#[derive(Debug, Serialize)]
pub struct ClientTripsResponse {
    pub trips: Vec<ClientTripRow>,
    pub total: usize,
}

/// GET /api/trips/{client_id} - trips a client is registered for.
pub async fn get_client_trips(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(registration_service): Extension<Arc<RegistrationService>>,
    Path(client_id): Path<i32>,
) -> Result<Json<ClientTripsResponse>, ApiError> {
    if client_id <= 0 {
        return Err(ApiError::BadRequest(
            "Client ID must be a positive integer".to_string(),
        ));
    }

    info!("Listing trips for client {}", client_id);

    if !registration_service.client_exists(client_id).await? {
        return Err(ApiError::NotFound(format!(
            "Client {} does not exist",
            client_id
        )));
    }

    let trips = repository
        .trips_for_client(client_id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    if trips.is_empty() {
        return Err(ApiError::NotFound(format!(
            "Client {} does not have trips",
            client_id
        )));
    }

    let total = trips.len();

    Ok(Json(ClientTripsResponse { trips, total }))
}
