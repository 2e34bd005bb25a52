use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{delete, patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::courier::{CourierEntry, GeoPoint, OperationalStatus};
use crate::registry;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/couriers", post(register_courier).get(list_couriers))
        .route("/couriers/:id", delete(deactivate_courier).get(get_courier))
        .route("/couriers/:id/status", patch(update_status))
        .route("/couriers/:id/location", patch(update_location))
}

#[derive(Deserialize)]
pub struct RegisterCourierRequest {
    pub name: String,
    pub location: GeoPoint,
    #[serde(default = "default_rating")]
    pub rating: f64,
}

fn default_rating() -> f64 {
    5.0
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OperationalStatus,
    pub location: Option<GeoPoint>,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
}

async fn register_courier(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterCourierRequest>,
) -> Result<Json<CourierEntry>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    let courier = registry::register(&state, payload.name, payload.location, payload.rating);
    Ok(Json(courier))
}

async fn list_couriers(State(state): State<Arc<AppState>>) -> Json<Vec<CourierEntry>> {
    let couriers = state
        .couriers
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(couriers)
}

async fn get_courier(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CourierEntry>, AppError> {
    let courier = state
        .couriers
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("courier {id} not found")))?;

    Ok(Json(courier.value().clone()))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<CourierEntry>, AppError> {
    let courier = registry::set_operational_status(&state, id, payload.status, payload.location)?;
    Ok(Json(courier))
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<CourierEntry>, AppError> {
    let courier = registry::update_location(&state, id, payload.location)?;
    Ok(Json(courier))
}

async fn deactivate_courier(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CourierEntry>, AppError> {
    let courier = registry::deactivate(&state, id)?;
    Ok(Json(courier))
}
