//! Background dispatch loop: consumes broadcast and re-broadcast requests,
//! widening the search radius on each attempt and escalating to manual
//! dispatch when the attempts run out.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

use crate::engine::broker;
use crate::engine::queue::{enqueue_dispatch_nowait, DispatchRequest};
use crate::engine::trips;
use crate::error::AppError;
use crate::models::trip::TripStatus;
use crate::state::AppState;

pub async fn run_dispatch_engine(state: Arc<AppState>, mut rx: mpsc::Receiver<DispatchRequest>) {
    info!("dispatch engine started");

    while let Some(request) = rx.recv().await {
        // Retries and re-broadcasts back off briefly so a courier going
        // online has a chance to be seen.
        if request.attempt > 1 {
            sleep(Duration::from_millis(state.config.retry_backoff_ms)).await;
        }

        if let Err(err) = process_request(&state, &request) {
            error!(order_id = %request.order_id, error = %err, "dispatch request failed");
        }
    }

    warn!("dispatch engine stopped: queue channel closed");
}

fn process_request(state: &AppState, request: &DispatchRequest) -> Result<(), AppError> {
    if request.attempt > state.config.max_dispatch_attempts {
        state.metrics.dispatch_escalations_total.inc();
        warn!(
            order_id = %request.order_id,
            attempts = request.attempt - 1,
            "broadcast attempts exhausted; trip needs manual dispatch"
        );
        return Ok(());
    }

    let Some(trip) = trips::find_active_by_order(state, request.order_id) else {
        debug!(order_id = %request.order_id, "no active trip for dispatch request; skipping");
        return Ok(());
    };

    if trip.status != TripStatus::Pending {
        debug!(
            order_id = %request.order_id,
            status = %trip.status,
            "trip no longer pending; skipping re-broadcast"
        );
        return Ok(());
    }

    // A duplicate request for an order with a live offer is a no-op:
    // create_offer returns the open offer instead of forking a second one.
    match broker::create_offer(state, &trip, request.attempt, request.radius_km) {
        Ok(_) => Ok(()),
        Err(AppError::NoCandidatesAvailable) => {
            info!(
                order_id = %request.order_id,
                attempt = request.attempt,
                radius_km = request.radius_km,
                "no candidates in radius; widening"
            );
            enqueue_dispatch_nowait(
                state,
                DispatchRequest {
                    order_id: request.order_id,
                    attempt: request.attempt + 1,
                    radius_km: request.radius_km + state.config.radius_increment_km,
                },
            );
            Ok(())
        }
        Err(err) => Err(err),
    }
}
