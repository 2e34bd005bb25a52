//! Courier Registry: the single source of truth for who can receive new
//! offers right now and who is on what trip.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::haversine_km;
use crate::models::courier::{CourierEntry, GeoPoint, OperationalStatus};
use crate::models::events::ChangeEvent;
use crate::state::AppState;

pub fn register(state: &AppState, name: String, location: GeoPoint, rating: f64) -> CourierEntry {
    let courier = CourierEntry::new(name, location, rating);
    state.couriers.insert(courier.id, courier.clone());
    state.publish(ChangeEvent::Courier(courier.clone()));

    info!(courier_id = %courier.id, name = %courier.name, "courier registered");
    courier
}

/// Sets a courier's operational status. Leaving `OnDelivery` while a trip
/// is active is rejected: cancellation must go through the trip state
/// machine first. `OnDelivery` itself is not a settable target.
pub fn set_operational_status(
    state: &AppState,
    courier_id: Uuid,
    status: OperationalStatus,
    location: Option<GeoPoint>,
) -> Result<CourierEntry, AppError> {
    if status == OperationalStatus::OnDelivery {
        return Err(AppError::BadRequest(
            "on_delivery is set by trip assignment, not by status calls".to_string(),
        ));
    }

    let mut courier = state
        .couriers
        .get_mut(&courier_id)
        .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;

    if courier.current_trip_id.is_some() {
        return Err(AppError::CourierHasActiveTrip(courier_id));
    }

    let now = Utc::now();
    courier.status = status;
    if let Some(point) = location {
        courier.location = point;
        courier.location_updated_at = now;
    }
    courier.updated_at = now;

    let snapshot = courier.clone();
    drop(courier);
    state.publish(ChangeEvent::Courier(snapshot.clone()));

    Ok(snapshot)
}

/// Last-write-wins location update; deliberately uncoupled from trip state,
/// late updates simply overwrite.
pub fn update_location(
    state: &AppState,
    courier_id: Uuid,
    location: GeoPoint,
) -> Result<CourierEntry, AppError> {
    let mut courier = state
        .couriers
        .get_mut(&courier_id)
        .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;

    let now = Utc::now();
    courier.location = location;
    courier.location_updated_at = now;
    courier.updated_at = now;

    let snapshot = courier.clone();
    drop(courier);
    state.publish(ChangeEvent::Courier(snapshot.clone()));

    Ok(snapshot)
}

/// Couriers eligible for a new offer: active, idle and within the search
/// radius of the pickup point. Sorted nearest-first as a convenience; the
/// broker only relies on set membership.
pub fn list_candidates(state: &AppState, pickup: &GeoPoint, radius_km: f64) -> Vec<CourierEntry> {
    let mut candidates: Vec<(f64, CourierEntry)> = state
        .couriers
        .iter()
        .filter_map(|entry| {
            let courier = entry.value();
            if !courier.active || courier.status != OperationalStatus::OnlineIdle {
                return None;
            }

            let distance = haversine_km(&courier.location, pickup);
            (distance <= radius_km).then(|| (distance, courier.clone()))
        })
        .collect();

    candidates.sort_by(|a, b| a.0.total_cmp(&b.0));
    candidates.into_iter().map(|(_, courier)| courier).collect()
}

/// Soft delete; couriers are never physically removed.
pub fn deactivate(state: &AppState, courier_id: Uuid) -> Result<CourierEntry, AppError> {
    let mut courier = state
        .couriers
        .get_mut(&courier_id)
        .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;

    if courier.current_trip_id.is_some() {
        return Err(AppError::CourierHasActiveTrip(courier_id));
    }

    courier.active = false;
    courier.status = OperationalStatus::Offline;
    courier.updated_at = Utc::now();

    let snapshot = courier.clone();
    drop(courier);
    state.publish(ChangeEvent::Courier(snapshot.clone()));

    Ok(snapshot)
}

/// Trip-machine hook: binds a courier to a trip it just won.
pub(crate) fn mark_on_delivery(
    state: &AppState,
    courier_id: Uuid,
    trip_id: Uuid,
) -> Result<CourierEntry, AppError> {
    let mut courier = state
        .couriers
        .get_mut(&courier_id)
        .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;

    if let Some(active) = courier.current_trip_id {
        if active != trip_id {
            return Err(AppError::CourierHasActiveTrip(courier_id));
        }
    }

    courier.status = OperationalStatus::OnDelivery;
    courier.current_trip_id = Some(trip_id);
    courier.updated_at = Utc::now();

    let snapshot = courier.clone();
    drop(courier);
    state.publish(ChangeEvent::Courier(snapshot.clone()));

    Ok(snapshot)
}

/// Trip-machine hook: releases a courier after a terminal transition and
/// records the outcome in its cumulative stats.
pub(crate) fn release_from_trip(
    state: &AppState,
    courier_id: Uuid,
    trip_id: Uuid,
    completed: bool,
    earnings: f64,
) {
    let Some(mut courier) = state.couriers.get_mut(&courier_id) else {
        return;
    };

    if courier.current_trip_id == Some(trip_id) {
        courier.current_trip_id = None;
        courier.status = OperationalStatus::OnlineIdle;
    }

    courier.stats.total_trips += 1;
    if completed {
        courier.stats.completed_deliveries += 1;
        courier.stats.total_earnings += earnings;
    } else {
        courier.stats.canceled_trips += 1;
    }
    courier.updated_at = Utc::now();

    let snapshot = courier.clone();
    drop(courier);
    state.publish(ChangeEvent::Courier(snapshot));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn state() -> AppState {
        AppState::new(Config::default()).0
    }

    fn point(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint { lat, lng }
    }

    #[test]
    fn candidates_exclude_offline_and_distant_couriers() {
        let state = state();
        let pickup = point(52.52, 13.405);

        let near = register(&state, "near".into(), point(52.521, 13.406), 4.5);
        set_operational_status(&state, near.id, OperationalStatus::OnlineIdle, None).unwrap();

        let offline = register(&state, "offline".into(), point(52.521, 13.406), 4.5);
        // registration starts couriers offline; leave this one as is
        let _ = offline;

        let far = register(&state, "far".into(), point(53.55, 9.99), 4.5);
        set_operational_status(&state, far.id, OperationalStatus::OnlineIdle, None).unwrap();

        let candidates = list_candidates(&state, &pickup, 5.0);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, near.id);
    }

    #[test]
    fn deactivated_courier_is_never_a_candidate() {
        let state = state();
        let pickup = point(52.52, 13.405);

        let courier = register(&state, "gone".into(), point(52.521, 13.406), 4.0);
        set_operational_status(&state, courier.id, OperationalStatus::OnlineIdle, None).unwrap();
        deactivate(&state, courier.id).unwrap();

        assert!(list_candidates(&state, &pickup, 5.0).is_empty());
    }

    #[test]
    fn on_delivery_cannot_be_set_directly() {
        let state = state();
        let courier = register(&state, "c".into(), point(52.52, 13.4), 4.0);

        let err =
            set_operational_status(&state, courier.id, OperationalStatus::OnDelivery, None)
                .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn status_change_fails_while_a_trip_is_active() {
        let state = state();
        let courier = register(&state, "busy".into(), point(52.52, 13.4), 4.0);
        set_operational_status(&state, courier.id, OperationalStatus::OnlineIdle, None).unwrap();
        mark_on_delivery(&state, courier.id, Uuid::new_v4()).unwrap();

        let err = set_operational_status(&state, courier.id, OperationalStatus::Offline, None)
            .unwrap_err();
        assert!(matches!(err, AppError::CourierHasActiveTrip(_)));
    }

    #[test]
    fn release_restores_idle_and_updates_stats() {
        let state = state();
        let courier = register(&state, "done".into(), point(52.52, 13.4), 4.0);
        set_operational_status(&state, courier.id, OperationalStatus::OnlineIdle, None).unwrap();

        let trip_id = Uuid::new_v4();
        mark_on_delivery(&state, courier.id, trip_id).unwrap();
        release_from_trip(&state, courier.id, trip_id, true, 7.25);

        let entry = state.couriers.get(&courier.id).unwrap();
        assert_eq!(entry.status, OperationalStatus::OnlineIdle);
        assert!(entry.current_trip_id.is_none());
        assert_eq!(entry.stats.completed_deliveries, 1);
        assert_eq!(entry.stats.total_trips, 1);
        assert!((entry.stats.total_earnings - 7.25).abs() < 1e-9);
    }
}
