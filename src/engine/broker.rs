//! Offer Broker: turns a trip that needs a courier into a time-boxed
//! broadcast and resolves the acceptance race to exactly one winner.
//!
//! The mutual-exclusion point is the offer record itself: every accept and
//! decline re-reads and mutates it under its map entry's write guard, which
//! serializes concurrent callers. The first caller to see `status == Open`
//! wins; everyone after observes `Accepted` and gets a definitive
//! `OfferNotOpen`.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::fees;
use crate::engine::queue::{enqueue_dispatch_nowait, DispatchRequest};
use crate::engine::trips;
use crate::error::AppError;
use crate::models::courier::OperationalStatus;
use crate::models::events::ChangeEvent;
use crate::models::offer::{Offer, OfferStatus};
use crate::models::trip::Trip;
use crate::registry;
use crate::state::AppState;

/// Broadcasts a pending trip to every eligible courier within
/// `radius_km` of the pickup point.
///
/// Idempotent per order: a retried ready-event (or a duplicate dispatch
/// request) finds the already-open offer and returns it instead of forking
/// a second concurrent broadcast.
pub fn create_offer(
    state: &AppState,
    trip: &Trip,
    attempt: u32,
    radius_km: f64,
) -> Result<Offer, AppError> {
    let existing = state
        .offers
        .iter()
        .find(|entry| entry.order_id == trip.order_id && entry.status == OfferStatus::Open)
        .map(|entry| entry.value().clone());
    if let Some(open) = existing {
        info!(
            offer_id = %open.id,
            order_id = %open.order_id,
            "offer already open for order; returning it"
        );
        return Ok(open);
    }

    let candidates = registry::list_candidates(state, &trip.pickup, radius_km);
    if candidates.is_empty() {
        return Err(AppError::NoCandidatesAvailable);
    }

    let split = fees::split_fee(trip.delivery_fee, state.config.commission_rate);
    let candidate_ids: Vec<Uuid> = candidates.iter().map(|c| c.id).collect();
    let offer = Offer::broadcast(
        trip,
        split,
        candidate_ids,
        attempt,
        radius_km,
        state.config.offer_ttl_secs,
    );

    state.offers.insert(offer.id, offer.clone());
    state.metrics.offers_total.with_label_values(&["created"]).inc();
    state.metrics.open_offers.inc();
    state.publish(ChangeEvent::Offer(offer.clone()));

    for courier in &candidates {
        state.notifier.offer_visible(courier.id, &offer);
    }

    info!(
        offer_id = %offer.id,
        order_id = %offer.order_id,
        attempt,
        radius_km,
        candidates = offer.visible_to.len(),
        "offer broadcast"
    );

    Ok(offer)
}

/// Resolves an acceptance attempt. At most one concurrent caller succeeds;
/// the losers receive `OfferNotOpen` and an already-lapsed offer yields
/// `OfferExpired` (expiring it on the spot).
pub fn accept_offer(state: &AppState, offer_id: Uuid, courier_id: Uuid) -> Result<Trip, AppError> {
    let mut offer = state
        .offers
        .get_mut(&offer_id)
        .ok_or_else(|| AppError::NotFound(format!("offer {offer_id} not found")))?;

    if offer.status != OfferStatus::Open {
        state.metrics.accept_conflicts_total.inc();
        return Err(AppError::OfferNotOpen(offer_id));
    }

    let now = Utc::now();
    if now > offer.expires_at {
        offer.status = OfferStatus::Expired;
        offer.visible_to.clear();
        offer.updated_at = now;

        let snapshot = offer.clone();
        drop(offer);
        finish_open_offer(state, &snapshot, "expired");
        schedule_rebroadcast(state, &snapshot);

        state.metrics.accept_conflicts_total.inc();
        return Err(AppError::OfferExpired(offer_id));
    }

    if !offer.visible_to.contains(&courier_id) {
        return Err(AppError::OfferNotOpen(offer_id));
    }

    // The candidate set was built from idle couriers, but the courier may
    // have changed state since the broadcast.
    match state.couriers.get(&courier_id) {
        Some(courier) if courier.current_trip_id.is_some() => {
            return Err(AppError::CourierHasActiveTrip(courier_id));
        }
        Some(courier) if !courier.active || courier.status != OperationalStatus::OnlineIdle => {
            return Err(AppError::BadRequest(format!(
                "courier {courier_id} is not online"
            )));
        }
        Some(_) => {}
        None => {
            return Err(AppError::NotFound(format!("courier {courier_id} not found")));
        }
    }

    offer.status = OfferStatus::Accepted;
    offer.accepted_by = Some(courier_id);
    offer.accepted_at = Some(now);
    offer.visible_to.clear();
    offer.updated_at = now;

    let snapshot = offer.clone();
    drop(offer);
    finish_open_offer(state, &snapshot, "accepted");

    match trips::assign(state, snapshot.trip_id, courier_id, snapshot.courier_share) {
        Ok(trip) => Ok(trip),
        Err(err) => {
            // The trip was mutated out from under the offer (e.g. canceled
            // between broadcast and accept). Mark the offer failed so it is
            // not left dangling in `accepted`.
            warn!(offer_id = %offer_id, error = %err, "assignment after accept failed");
            if let Some(mut offer) = state.offers.get_mut(&offer_id) {
                offer.status = OfferStatus::Failed;
                offer.updated_at = Utc::now();
                let failed = offer.clone();
                drop(offer);
                state.metrics.offers_total.with_label_values(&["failed"]).inc();
                state.publish(ChangeEvent::Offer(failed.clone()));
                schedule_rebroadcast(state, &failed);
            }
            Err(err)
        }
    }
}

/// Removes a courier from the offer's visible set. Idempotent: declining a
/// resolved offer, or declining twice, is a no-op. An emptied set fails the
/// offer and schedules a re-broadcast.
pub fn decline_offer(state: &AppState, offer_id: Uuid, courier_id: Uuid) -> Result<(), AppError> {
    let mut offer = state
        .offers
        .get_mut(&offer_id)
        .ok_or_else(|| AppError::NotFound(format!("offer {offer_id} not found")))?;

    if offer.status != OfferStatus::Open {
        return Ok(());
    }

    let before = offer.visible_to.len();
    offer.visible_to.retain(|id| *id != courier_id);
    if offer.visible_to.len() == before {
        return Ok(());
    }
    offer.updated_at = Utc::now();

    if offer.visible_to.is_empty() {
        offer.status = OfferStatus::Failed;

        let snapshot = offer.clone();
        drop(offer);
        finish_open_offer(state, &snapshot, "failed");
        schedule_rebroadcast(state, &snapshot);

        info!(offer_id = %offer_id, "all couriers declined; re-broadcast scheduled");
    } else {
        let snapshot = offer.clone();
        drop(offer);
        state.publish(ChangeEvent::Offer(snapshot));
    }

    Ok(())
}

/// Eager expiry pass over all open offers. Idempotent: each candidate is
/// re-checked under its write guard, so a sweep racing another sweep (or a
/// lazy expiry in `accept_offer`) expires an offer exactly once.
pub fn expire_sweep(state: &AppState) -> usize {
    let now = Utc::now();
    let lapsed: Vec<Uuid> = state
        .offers
        .iter()
        .filter(|entry| entry.is_expired_at(now))
        .map(|entry| entry.id)
        .collect();

    lapsed
        .into_iter()
        .filter(|offer_id| expire_if_lapsed(state, *offer_id))
        .count()
}

/// Lazy expiry applied on reads. Returns true if this call transitioned the
/// offer to `Expired`; a no-op on anything already resolved.
pub fn expire_if_lapsed(state: &AppState, offer_id: Uuid) -> bool {
    let now = Utc::now();
    let Some(mut offer) = state.offers.get_mut(&offer_id) else {
        return false;
    };
    if !offer.is_expired_at(now) {
        return false;
    }

    offer.status = OfferStatus::Expired;
    offer.visible_to.clear();
    offer.updated_at = now;

    let snapshot = offer.clone();
    drop(offer);
    finish_open_offer(state, &snapshot, "expired");
    schedule_rebroadcast(state, &snapshot);

    info!(offer_id = %offer_id, order_id = %snapshot.order_id, "offer expired");
    true
}

/// Cancels the open offer for an order whose trip was just canceled.
pub(crate) fn cancel_open_offer_for_order(state: &AppState, order_id: Uuid) {
    let open: Vec<Uuid> = state
        .offers
        .iter()
        .filter(|entry| entry.order_id == order_id && entry.status == OfferStatus::Open)
        .map(|entry| entry.id)
        .collect();

    for offer_id in open {
        let Some(mut offer) = state.offers.get_mut(&offer_id) else {
            continue;
        };
        if offer.status != OfferStatus::Open {
            continue;
        }

        offer.status = OfferStatus::Cancelled;
        offer.visible_to.clear();
        offer.updated_at = Utc::now();

        let snapshot = offer.clone();
        drop(offer);
        finish_open_offer(state, &snapshot, "cancelled");
    }
}

fn finish_open_offer(state: &AppState, offer: &Offer, outcome: &str) {
    state.metrics.offers_total.with_label_values(&[outcome]).inc();
    state.metrics.open_offers.dec();
    state.publish(ChangeEvent::Offer(offer.clone()));
}

fn schedule_rebroadcast(state: &AppState, offer: &Offer) {
    enqueue_dispatch_nowait(
        state,
        DispatchRequest {
            order_id: offer.order_id,
            attempt: offer.attempt_number + 1,
            radius_km: offer.search_radius_km + state.config.radius_increment_km,
        },
    );
}
