use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::broker;
use crate::engine::queue::{enqueue_dispatch, DispatchRequest};
use crate::engine::trips;
use crate::error::AppError;
use crate::models::courier::GeoPoint;
use crate::models::offer::Offer;
use crate::models::order::{OrderRecord, OrderStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/ready", post(order_ready))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub store_name: String,
    pub customer_name: String,
    pub pickup_address: String,
    pub delivery_address: String,
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub customer_notes: Option<String>,
}

/// Seeds an order into the order store. In production the order lives in
/// the hosted document store and arrives through the merchant flow; this
/// endpoint is the narrow stand-in for it.
async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<OrderRecord>, AppError> {
    if payload.store_name.trim().is_empty() || payload.customer_name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "store_name and customer_name cannot be empty".to_string(),
        ));
    }

    let now = Utc::now();
    let order = OrderRecord {
        id: Uuid::new_v4(),
        store_id: Uuid::new_v4(),
        store_name: payload.store_name,
        customer_id: Uuid::new_v4(),
        customer_name: payload.customer_name,
        pickup_address: payload.pickup_address,
        delivery_address: payload.delivery_address,
        pickup: payload.pickup,
        dropoff: payload.dropoff,
        customer_notes: payload.customer_notes,
        status: OrderStatus::Preparing,
        created_at: now,
        updated_at: now,
    };

    state.orders.insert(order.clone());
    Ok(Json(order))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderRecord>, AppError> {
    let order = state
        .orders
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

    Ok(Json(order))
}

/// The order-ready event: creates the trip (idempotently) and broadcasts
/// the first offer. With nobody in range the retry is queued with a wider
/// radius and the caller sees `NoCandidatesAvailable`.
async fn order_ready(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Offer>, AppError> {
    let order = state
        .orders
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

    if matches!(order.status, OrderStatus::Delivered | OrderStatus::Cancelled) {
        return Err(AppError::BadRequest(format!(
            "order {id} is already {}",
            order.status
        )));
    }

    state.orders.update_status(id, OrderStatus::Ready)?;
    let trip = trips::create_trip(&state, &order);

    match broker::create_offer(&state, &trip, 1, state.config.search_radius_km) {
        Ok(offer) => Ok(Json(offer)),
        Err(AppError::NoCandidatesAvailable) => {
            enqueue_dispatch(
                &state,
                DispatchRequest {
                    order_id: id,
                    attempt: 2,
                    radius_km: state.config.search_radius_km + state.config.radius_increment_km,
                },
            )
            .await?;
            Err(AppError::NoCandidatesAvailable)
        }
        Err(err) => Err(err),
    }
}
