use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// A request to broadcast (or re-broadcast) an order's trip to couriers.
/// `attempt` starts at 1; every re-broadcast widens the radius and bumps it.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchRequest {
    pub order_id: Uuid,
    pub attempt: u32,
    pub radius_km: f64,
}

pub async fn enqueue_dispatch(state: &AppState, request: DispatchRequest) -> Result<(), AppError> {
    state
        .dispatch_tx
        .send(request)
        .await
        .map_err(|err| AppError::Internal(format!("dispatch queue send failed: {err}")))
}

/// Fire-and-forget variant for callers holding a record lock or running
/// inside a sweep; a full queue is logged rather than propagated.
pub fn enqueue_dispatch_nowait(state: &AppState, request: DispatchRequest) {
    if let Err(err) = state.dispatch_tx.try_send(request) {
        tracing::warn!(error = %err, "dispatch queue full; dropping re-broadcast request");
    }
}
