use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::broker;
use crate::error::AppError;
use crate::models::offer::Offer;
use crate::models::trip::Trip;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/offers", get(list_offers))
        .route("/offers/:id", get(get_offer))
        .route("/offers/:id/accept", post(accept_offer))
        .route("/offers/:id/decline", post(decline_offer))
}

#[derive(Deserialize)]
pub struct CourierAction {
    pub courier_id: Uuid,
}

async fn list_offers(State(state): State<Arc<AppState>>) -> Json<Vec<Offer>> {
    let offers = state
        .offers
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(offers)
}

async fn get_offer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Offer>, AppError> {
    // Expiry is enforced lazily on reads as well as by the sweep.
    broker::expire_if_lapsed(&state, id);

    let offer = state
        .offers
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("offer {id} not found")))?;

    Ok(Json(offer.value().clone()))
}

async fn accept_offer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CourierAction>,
) -> Result<Json<Trip>, AppError> {
    let trip = broker::accept_offer(&state, id, payload.courier_id)?;
    Ok(Json(trip))
}

async fn decline_offer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CourierAction>,
) -> Result<StatusCode, AppError> {
    broker::decline_offer(&state, id, payload.courier_id)?;
    Ok(StatusCode::NO_CONTENT)
}
