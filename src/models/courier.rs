use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Operational status of a courier. `OnDelivery` is never set directly by
/// the courier: the trip state machine flips it on assignment and clears it
/// on the terminal transition, keeping it in lockstep with `current_trip_id`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationalStatus {
    Offline,
    OnlineIdle,
    OnDelivery,
    Unavailable,
}

impl OperationalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationalStatus::Offline => "offline",
            OperationalStatus::OnlineIdle => "online_idle",
            OperationalStatus::OnDelivery => "on_delivery",
            OperationalStatus::Unavailable => "unavailable",
        }
    }
}

impl std::fmt::Display for OperationalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CourierStats {
    pub total_trips: u64,
    pub completed_deliveries: u64,
    pub canceled_trips: u64,
    pub rating: f64,
    pub total_earnings: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourierEntry {
    pub id: Uuid,
    pub name: String,
    pub status: OperationalStatus,
    pub location: GeoPoint,
    pub location_updated_at: DateTime<Utc>,
    pub current_trip_id: Option<Uuid>,
    pub stats: CourierStats,
    /// Deactivated couriers are kept for their stats but never dispatched.
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}

impl CourierEntry {
    pub fn new(name: String, location: GeoPoint, rating: f64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            status: OperationalStatus::Offline,
            location,
            location_updated_at: now,
            current_trip_id: None,
            stats: CourierStats {
                rating: rating.clamp(0.0, 5.0),
                ..CourierStats::default()
            },
            active: true,
            updated_at: now,
        }
    }
}
