use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::courier::GeoPoint;
use crate::models::order::OrderRecord;

/// Lifecycle of one delivery trip.
///
/// ```text
/// Pending ─► Assigned ─► Accepted ─► PickingUp ─► PickedUp ─► Delivering ─► Delivered
///    │           │           │           │            │            │
///    └───────────┴───────────┴───────────┴────────────┴────────────┴──► Canceled
/// ```
///
/// `Delivered` and `Canceled` are terminal. `Pending → Assigned` only
/// happens through a winning offer acceptance; every later forward step is
/// an explicit courier call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Pending,
    Assigned,
    Accepted,
    PickingUp,
    PickedUp,
    Delivering,
    Delivered,
    Canceled,
}

impl TripStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TripStatus::Delivered | TripStatus::Canceled)
    }

    /// The single legal forward successor, if any.
    pub fn successor(&self) -> Option<TripStatus> {
        match self {
            TripStatus::Pending => Some(TripStatus::Assigned),
            TripStatus::Assigned => Some(TripStatus::Accepted),
            TripStatus::Accepted => Some(TripStatus::PickingUp),
            TripStatus::PickingUp => Some(TripStatus::PickedUp),
            TripStatus::PickedUp => Some(TripStatus::Delivering),
            TripStatus::Delivering => Some(TripStatus::Delivered),
            TripStatus::Delivered | TripStatus::Canceled => None,
        }
    }

    /// Whether `target` is a legal courier-driven advance from this status.
    /// Assignment and cancellation have their own entry points and are not
    /// reachable through advance.
    pub fn can_advance_to(&self, target: TripStatus) -> bool {
        !matches!(target, TripStatus::Assigned | TripStatus::Canceled)
            && self.successor() == Some(target)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Pending => "pending",
            TripStatus::Assigned => "assigned",
            TripStatus::Accepted => "accepted",
            TripStatus::PickingUp => "picking_up",
            TripStatus::PickedUp => "picked_up",
            TripStatus::Delivering => "delivering",
            TripStatus::Delivered => "delivered",
            TripStatus::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for TripStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub order_id: Uuid,
    pub store_id: Uuid,
    pub store_name: String,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub pickup_address: String,
    pub delivery_address: String,
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub courier_id: Option<Uuid>,
    pub courier_name: Option<String>,
    pub status: TripStatus,
    pub delivery_fee: f64,
    /// Courier share of the fee, fixed by the winning offer at assignment.
    pub courier_earnings: Option<f64>,
    pub distance_km: f64,
    pub eta_minutes: u32,
    pub customer_notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub picking_up_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivering_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    pub fn from_order(order: &OrderRecord, distance_km: f64, eta_minutes: u32, fee: f64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_id: order.id,
            store_id: order.store_id,
            store_name: order.store_name.clone(),
            customer_id: order.customer_id,
            customer_name: order.customer_name.clone(),
            pickup_address: order.pickup_address.clone(),
            delivery_address: order.delivery_address.clone(),
            pickup: order.pickup.clone(),
            dropoff: order.dropoff.clone(),
            courier_id: None,
            courier_name: None,
            status: TripStatus::Pending,
            delivery_fee: fee,
            courier_earnings: None,
            distance_km,
            eta_minutes,
            customer_notes: order.customer_notes.clone(),
            cancellation_reason: None,
            created_at: now,
            assigned_at: None,
            accepted_at: None,
            picking_up_at: None,
            picked_up_at: None,
            delivering_at: None,
            delivered_at: None,
            canceled_at: None,
            updated_at: now,
        }
    }

    /// Stamps the timestamp slot for a freshly reached status.
    pub fn mark_reached(&mut self, status: TripStatus, at: DateTime<Utc>) {
        match status {
            TripStatus::Pending => {}
            TripStatus::Assigned => self.assigned_at = Some(at),
            TripStatus::Accepted => self.accepted_at = Some(at),
            TripStatus::PickingUp => self.picking_up_at = Some(at),
            TripStatus::PickedUp => self.picked_up_at = Some(at),
            TripStatus::Delivering => self.delivering_at = Some(at),
            TripStatus::Delivered => self.delivered_at = Some(at),
            TripStatus::Canceled => self.canceled_at = Some(at),
        }
        self.updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::TripStatus;

    #[test]
    fn forward_chain_is_the_only_legal_advance_path() {
        let chain = [
            TripStatus::Assigned,
            TripStatus::Accepted,
            TripStatus::PickingUp,
            TripStatus::PickedUp,
            TripStatus::Delivering,
            TripStatus::Delivered,
        ];

        for pair in chain.windows(2) {
            assert!(pair[0].can_advance_to(pair[1]), "{} -> {}", pair[0], pair[1]);
            assert!(!pair[1].can_advance_to(pair[0]), "{} must not go back", pair[1]);
        }
    }

    #[test]
    fn skipping_a_state_is_rejected() {
        assert!(!TripStatus::Assigned.can_advance_to(TripStatus::PickedUp));
        assert!(!TripStatus::Accepted.can_advance_to(TripStatus::Delivering));
        assert!(!TripStatus::PickingUp.can_advance_to(TripStatus::Delivered));
    }

    #[test]
    fn assignment_and_cancellation_are_not_advance_targets() {
        assert!(!TripStatus::Pending.can_advance_to(TripStatus::Assigned));
        assert!(!TripStatus::Delivering.can_advance_to(TripStatus::Canceled));
    }

    #[test]
    fn terminal_states_have_no_successor() {
        assert!(TripStatus::Delivered.is_terminal());
        assert!(TripStatus::Canceled.is_terminal());
        assert_eq!(TripStatus::Delivered.successor(), None);
        assert_eq!(TripStatus::Canceled.successor(), None);
    }
}
