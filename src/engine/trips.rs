//! Trip state machine. Every mutation of a trip record goes through this
//! module; each transition is validated against the state graph, stamped,
//! mirrored onto the order and fanned out to subscribers.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::engine::fees;
use crate::error::AppError;
use crate::geo::{eta_minutes, haversine_km};
use crate::models::events::ChangeEvent;
use crate::models::order::OrderRecord;
use crate::models::trip::{Trip, TripStatus};
use crate::registry;
use crate::state::AppState;
use crate::sync;

/// Creates the trip for an order that just became ready for pickup.
/// Idempotent: if a non-terminal trip already exists for the order it is
/// returned unchanged, so retried ready-events never fork a second trip.
pub fn create_trip(state: &AppState, order: &OrderRecord) -> Trip {
    if let Some(existing) = find_active_by_order(state, order.id) {
        return existing;
    }

    let distance_km = haversine_km(&order.pickup, &order.dropoff);
    let fee = fees::quote_fee(distance_km, state.config.base_fee, state.config.per_km_fee);
    let trip = Trip::from_order(order, distance_km, eta_minutes(distance_km), fee);

    state.trips.insert(trip.id, trip.clone());
    state.publish(ChangeEvent::Trip(trip.clone()));

    info!(trip_id = %trip.id, order_id = %order.id, fee = trip.delivery_fee, "trip created");
    trip
}

/// The most recent trip for an order that has not reached a terminal state.
pub fn find_active_by_order(state: &AppState, order_id: Uuid) -> Option<Trip> {
    state
        .trips
        .iter()
        .filter(|entry| entry.order_id == order_id && !entry.status.is_terminal())
        .map(|entry| entry.value().clone())
        .max_by_key(|trip| trip.created_at)
}

/// `Pending → Assigned`, triggered only by a winning offer acceptance.
/// Re-applying the same courier is a no-op success.
pub fn assign(
    state: &AppState,
    trip_id: Uuid,
    courier_id: Uuid,
    courier_share: f64,
) -> Result<Trip, AppError> {
    let mut trip = state
        .trips
        .get_mut(&trip_id)
        .ok_or_else(|| AppError::NotFound(format!("trip {trip_id} not found")))?;

    if trip.status == TripStatus::Assigned && trip.courier_id == Some(courier_id) {
        return Ok(trip.clone());
    }
    if trip.status != TripStatus::Pending {
        return Err(AppError::InvalidTransition {
            from: trip.status,
            to: TripStatus::Assigned,
        });
    }

    // Bind the courier first: if it turns out to be busy the trip stays
    // untouched in pending.
    let courier = registry::mark_on_delivery(state, courier_id, trip_id)?;

    trip.status = TripStatus::Assigned;
    trip.courier_id = Some(courier_id);
    trip.courier_name = Some(courier.name);
    trip.courier_earnings = Some(courier_share);
    trip.mark_reached(TripStatus::Assigned, Utc::now());

    let snapshot = trip.clone();
    drop(trip);

    state
        .metrics
        .trip_transitions_total
        .with_label_values(&["assigned"])
        .inc();
    sync::mirror_trip(state, &snapshot);
    state.publish(ChangeEvent::Trip(snapshot.clone()));

    info!(trip_id = %trip_id, courier_id = %courier_id, "trip assigned");
    Ok(snapshot)
}

/// Courier-driven forward transition. Re-sending the current status is a
/// no-op success so devices can retry over flaky networks.
pub fn advance(
    state: &AppState,
    trip_id: Uuid,
    target: TripStatus,
    courier_id: Uuid,
) -> Result<Trip, AppError> {
    let mut trip = state
        .trips
        .get_mut(&trip_id)
        .ok_or_else(|| AppError::NotFound(format!("trip {trip_id} not found")))?;

    // The retry fast path is only for the courier that owns the trip.
    let is_assigned_courier = trip.courier_id == Some(courier_id);
    if trip.status == target {
        if is_assigned_courier {
            return Ok(trip.clone());
        }
        return Err(AppError::BadRequest(format!(
            "courier {courier_id} is not assigned to trip {trip_id}"
        )));
    }
    if trip.status.is_terminal() {
        return Err(AppError::TripAlreadyTerminal {
            trip_id,
            status: trip.status,
        });
    }
    if !is_assigned_courier {
        return Err(AppError::BadRequest(format!(
            "courier {courier_id} is not assigned to trip {trip_id}"
        )));
    }
    if !trip.status.can_advance_to(target) {
        return Err(AppError::InvalidTransition {
            from: trip.status,
            to: target,
        });
    }

    trip.status = target;
    trip.mark_reached(target, Utc::now());

    let snapshot = trip.clone();
    drop(trip);

    state
        .metrics
        .trip_transitions_total
        .with_label_values(&[target.as_str()])
        .inc();

    if target == TripStatus::Delivered {
        let earnings = snapshot.courier_earnings.unwrap_or(0.0);
        registry::release_from_trip(state, courier_id, trip_id, true, earnings);
        info!(trip_id = %trip_id, courier_id = %courier_id, earnings, "trip delivered");
    }

    sync::mirror_trip(state, &snapshot);
    state.publish(ChangeEvent::Trip(snapshot.clone()));

    Ok(snapshot)
}

/// Cancels a trip from any non-terminal state. Frees an assigned courier,
/// cancels any still-open offer for the order and mirrors the order status.
pub fn cancel(
    state: &AppState,
    trip_id: Uuid,
    reason: &str,
    actor_id: Uuid,
) -> Result<Trip, AppError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AppError::BadRequest(
            "cancellation reason cannot be empty".to_string(),
        ));
    }

    let mut trip = state
        .trips
        .get_mut(&trip_id)
        .ok_or_else(|| AppError::NotFound(format!("trip {trip_id} not found")))?;

    if trip.status.is_terminal() {
        return Err(AppError::TripAlreadyTerminal {
            trip_id,
            status: trip.status,
        });
    }

    trip.status = TripStatus::Canceled;
    trip.cancellation_reason = Some(reason.to_string());
    trip.mark_reached(TripStatus::Canceled, Utc::now());

    let snapshot = trip.clone();
    drop(trip);

    state
        .metrics
        .trip_transitions_total
        .with_label_values(&["canceled"])
        .inc();

    if let Some(courier_id) = snapshot.courier_id {
        registry::release_from_trip(state, courier_id, trip_id, false, 0.0);
    } else {
        crate::engine::broker::cancel_open_offer_for_order(state, snapshot.order_id);
    }

    sync::mirror_trip(state, &snapshot);
    state.publish(ChangeEvent::Trip(snapshot.clone()));

    info!(trip_id = %trip_id, actor_id = %actor_id, reason, "trip canceled");
    Ok(snapshot)
}
