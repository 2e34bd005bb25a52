use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::trips;
use crate::error::AppError;
use crate::models::trip::{Trip, TripStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/trips", get(list_trips))
        .route("/trips/:id", get(get_trip))
        .route("/trips/:id/advance", post(advance_trip))
        .route("/trips/:id/cancel", post(cancel_trip))
}

#[derive(Deserialize)]
pub struct AdvanceTripRequest {
    pub target_status: TripStatus,
    pub courier_id: Uuid,
}

#[derive(Deserialize)]
pub struct CancelTripRequest {
    pub reason: String,
    pub actor_id: Uuid,
}

async fn list_trips(State(state): State<Arc<AppState>>) -> Json<Vec<Trip>> {
    let trips = state
        .trips
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(trips)
}

async fn get_trip(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Trip>, AppError> {
    let trip = state
        .trips
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("trip {id} not found")))?;

    Ok(Json(trip.value().clone()))
}

async fn advance_trip(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdvanceTripRequest>,
) -> Result<Json<Trip>, AppError> {
    let trip = trips::advance(&state, id, payload.target_status, payload.courier_id)?;
    Ok(Json(trip))
}

async fn cancel_trip(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelTripRequest>,
) -> Result<Json<Trip>, AppError> {
    let trip = trips::cancel(&state, id, &payload.reason, payload.actor_id)?;
    Ok(Json(trip))
}
