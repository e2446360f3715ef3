use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::database::{NewClient, Repository};
use crate::services::RegistrationService;
use crate::utils::error::ApiError;

#[derive(Debug, Serialize)]
pub struct CreateClientResponse {
    pub id_client: i32,
}

#[derive(Debug, Serialize)]
pub struct OutcomeResponse {
    pub success: bool,
    pub message: String,
}

fn validate_ids(client_id: i32, trip_id: i32) -> Result<(), ApiError> {
    if client_id <= 0 || trip_id <= 0 {
        return Err(ApiError::BadRequest(
            "Client ID and Trip ID must be positive integers".to_string(),
        ));
    }
    Ok(())
}

/// POST /api/clients - create a new client.
pub async fn create_client(
    Extension(repository): Extension<Arc<Repository>>,
    Json(client): Json<NewClient>,
) -> Result<(StatusCode, Json<CreateClientResponse>), ApiError> {
    if client.first_name.trim().is_empty()
        || client.last_name.trim().is_empty()
        || client.telephone.trim().is_empty()
        || client.pesel.trim().is_empty()
    {
        return Err(ApiError::BadRequest(
            "first_name, last_name, telephone and pesel are required".to_string(),
        ));
    }
    if !client.email.contains('@') {
        return Err(ApiError::BadRequest(
            "email must be a valid address".to_string(),
        ));
    }

    let id_client = repository
        .create_client(&client)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    info!("Created client {}", id_client);

    Ok((StatusCode::CREATED, Json(CreateClientResponse { id_client })))
}

/// PUT /api/clients/{client_id}/trips/{trip_id} - register a client for a trip.
pub async fn register_for_trip(
    Extension(registration_service): Extension<Arc<RegistrationService>>,
    Path((client_id, trip_id)): Path<(i32, i32)>,
) -> Result<Json<OutcomeResponse>, ApiError> {
    validate_ids(client_id, trip_id)?;

    info!("Register request: client {} -> trip {}", client_id, trip_id);

    let message = registration_service.register(client_id, trip_id).await?;

    Ok(Json(OutcomeResponse {
        success: true,
        message,
    }))
}

/// DELETE /api/clients/{client_id}/trips/{trip_id} - remove a registration.
pub async fn unregister_from_trip(
    Extension(registration_service): Extension<Arc<RegistrationService>>,
    Path((client_id, trip_id)): Path<(i32, i32)>,
) -> Result<Json<OutcomeResponse>, ApiError> {
    validate_ids(client_id, trip_id)?;

    info!(
        "Unregister request: client {} -> trip {}",
        client_id, trip_id
    );

    let message = registration_service.unregister(client_id, trip_id).await?;

    Ok(Json(OutcomeResponse {
        success: true,
        message,
    }))
}
