//! Order Status Sync: keeps the customer-facing order status consistent
//! with trip progress. The mapping is pure; the write to the order store is
//! at-least-once and never rolls back a trip transition that already
//! succeeded. Drift is corrected by [`reconcile`].

pub mod notify;

use dashmap::DashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::order::{OrderRecord, OrderStatus};
use crate::models::trip::{Trip, TripStatus};
use crate::state::AppState;

/// Contract against the external order store. The dispatch core reads
/// orders to build trips and writes back only the mirrored status.
pub trait OrderStore: Send + Sync {
    fn get(&self, order_id: Uuid) -> Option<OrderRecord>;
    fn insert(&self, order: OrderRecord);
    fn update_status(&self, order_id: Uuid, status: OrderStatus) -> Result<(), AppError>;
}

/// Stand-in for the hosted document store, used by the binary and by tests.
#[derive(Default)]
pub struct InMemoryOrderStore {
    records: DashMap<Uuid, OrderRecord>,
}

impl OrderStore for InMemoryOrderStore {
    fn get(&self, order_id: Uuid) -> Option<OrderRecord> {
        self.records.get(&order_id).map(|entry| entry.value().clone())
    }

    fn insert(&self, order: OrderRecord) {
        self.records.insert(order.id, order);
    }

    fn update_status(&self, order_id: Uuid, status: OrderStatus) -> Result<(), AppError> {
        let mut order = self
            .records
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        order.status = status;
        order.updated_at = chrono::Utc::now();
        Ok(())
    }
}

/// Customer-visible order status for a given trip status. Applying the
/// mapping twice for the same trip status yields the same order status.
pub fn order_status_for(status: TripStatus) -> OrderStatus {
    match status {
        TripStatus::Pending
        | TripStatus::Assigned
        | TripStatus::Accepted
        | TripStatus::PickingUp => OrderStatus::Ready,
        TripStatus::PickedUp | TripStatus::Delivering => OrderStatus::InDelivery,
        TripStatus::Delivered => OrderStatus::Delivered,
        TripStatus::Canceled => OrderStatus::Cancelled,
    }
}

/// Mirrors the trip's status onto its order. Failures are logged and
/// counted; the reconciliation sweep picks them up later.
pub fn mirror_trip(state: &AppState, trip: &Trip) {
    let target = order_status_for(trip.status);

    match state.orders.get(trip.order_id) {
        Some(order) if order.status == target => {}
        _ => {
            if let Err(err) = state.orders.update_status(trip.order_id, target) {
                state.metrics.order_sync_failures_total.inc();
                warn!(
                    order_id = %trip.order_id,
                    trip_id = %trip.id,
                    target = %target,
                    error = %err,
                    "order status mirror failed; awaiting reconciliation"
                );
            }
        }
    }
}

/// Re-derives order status from trip status for every trip and fixes any
/// mismatch found. Idempotent; returns the number of corrections applied.
pub fn reconcile(state: &AppState) -> usize {
    let trips: Vec<Trip> = state
        .trips
        .iter()
        .map(|entry| entry.value().clone())
        .collect();

    let mut fixed = 0;
    for trip in trips {
        let expected = order_status_for(trip.status);
        let Some(order) = state.orders.get(trip.order_id) else {
            continue;
        };

        if order.status != expected {
            match state.orders.update_status(trip.order_id, expected) {
                Ok(()) => {
                    fixed += 1;
                    debug!(
                        order_id = %trip.order_id,
                        from = %order.status,
                        to = %expected,
                        "reconciled order status"
                    );
                }
                Err(err) => {
                    state.metrics.order_sync_failures_total.inc();
                    warn!(order_id = %trip.order_id, error = %err, "reconciliation write failed");
                }
            }
        }
    }

    fixed
}

#[cfg(test)]
mod tests {
    use super::order_status_for;
    use crate::models::order::OrderStatus;
    use crate::models::trip::TripStatus;

    #[test]
    fn pre_pickup_statuses_map_to_ready() {
        for status in [
            TripStatus::Pending,
            TripStatus::Assigned,
            TripStatus::Accepted,
            TripStatus::PickingUp,
        ] {
            assert_eq!(order_status_for(status), OrderStatus::Ready);
        }
    }

    #[test]
    fn en_route_statuses_map_to_in_delivery() {
        assert_eq!(order_status_for(TripStatus::PickedUp), OrderStatus::InDelivery);
        assert_eq!(order_status_for(TripStatus::Delivering), OrderStatus::InDelivery);
    }

    #[test]
    fn terminal_statuses_map_to_their_order_counterparts() {
        assert_eq!(order_status_for(TripStatus::Delivered), OrderStatus::Delivered);
        assert_eq!(order_status_for(TripStatus::Canceled), OrderStatus::Cancelled);
    }

    #[test]
    fn mapping_is_idempotent() {
        for status in [
            TripStatus::Pending,
            TripStatus::PickedUp,
            TripStatus::Delivered,
            TripStatus::Canceled,
        ] {
            assert_eq!(order_status_for(status), order_status_for(status));
        }
    }
}
