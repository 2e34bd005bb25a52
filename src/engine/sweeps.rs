//! Periodic maintenance loops: eager offer expiry and order-status
//! reconciliation. Both passes are idempotent, so overlapping runs (or a
//! restart replaying one) are harmless.

use std::sync::Arc;

use tokio::time::{interval, Duration};
use tracing::{debug, info};

use crate::engine::broker;
use crate::state::AppState;
use crate::sync;

pub async fn run_expiry_sweeper(state: Arc<AppState>) {
    let mut ticker = interval(Duration::from_secs(state.config.expiry_sweep_interval_secs));
    info!("expiry sweeper started");

    loop {
        ticker.tick().await;
        let expired = broker::expire_sweep(&state);
        if expired > 0 {
            debug!(expired, "expiry sweep pass");
        }
    }
}

pub async fn run_reconciliation(state: Arc<AppState>) {
    let mut ticker = interval(Duration::from_secs(state.config.reconcile_interval_secs));
    info!("reconciliation sweeper started");

    loop {
        ticker.tick().await;
        let fixed = sync::reconcile(&state);
        if fixed > 0 {
            info!(fixed, "order statuses reconciled from trip state");
        }
    }
}
