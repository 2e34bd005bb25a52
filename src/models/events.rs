use serde::Serialize;

use crate::models::courier::CourierEntry;
use crate::models::offer::Offer;
use crate::models::trip::Trip;

/// Full-record snapshot published on every mutation. Subscribers must treat
/// each event as "latest known state": delivery is at-least-once and lagging
/// receivers may observe duplicates or skip intermediate snapshots.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum ChangeEvent {
    Offer(Offer),
    Trip(Trip),
    Courier(CourierEntry),
}
