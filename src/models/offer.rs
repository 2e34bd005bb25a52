use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::fees::FeeSplit;
use crate::models::trip::Trip;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Open,
    Accepted,
    Expired,
    Cancelled,
    Failed,
}

impl OfferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferStatus::Open => "open",
            OfferStatus::Accepted => "accepted",
            OfferStatus::Expired => "expired",
            OfferStatus::Cancelled => "cancelled",
            OfferStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A time-bounded broadcast of a trip to a candidate set of couriers.
///
/// Offers are never reused: a re-broadcast after decline-all or expiry
/// creates a fresh record with a new id and `attempt_number + 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: Uuid,
    pub order_id: Uuid,
    pub trip_id: Uuid,
    pub store_name: String,
    pub pickup_address: String,
    pub delivery_address: String,
    pub distance_km: f64,
    pub total_fee: f64,
    pub courier_share: f64,
    pub platform_share: f64,
    pub status: OfferStatus,
    /// Couriers currently allowed to see and accept the offer.
    /// Non-empty only while `Open`.
    pub visible_to: Vec<Uuid>,
    pub accepted_by: Option<Uuid>,
    pub attempt_number: u32,
    pub search_radius_km: f64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Offer {
    pub fn broadcast(
        trip: &Trip,
        split: FeeSplit,
        candidates: Vec<Uuid>,
        attempt_number: u32,
        search_radius_km: f64,
        ttl_secs: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_id: trip.order_id,
            trip_id: trip.id,
            store_name: trip.store_name.clone(),
            pickup_address: trip.pickup_address.clone(),
            delivery_address: trip.delivery_address.clone(),
            distance_km: trip.distance_km,
            total_fee: split.total,
            courier_share: split.courier_share,
            platform_share: split.platform_share,
            status: OfferStatus::Open,
            visible_to: candidates,
            accepted_by: None,
            attempt_number,
            search_radius_km,
            created_at: now,
            expires_at: now + Duration::seconds(ttl_secs as i64),
            accepted_at: None,
            updated_at: now,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == OfferStatus::Open && now > self.expires_at
    }
}
