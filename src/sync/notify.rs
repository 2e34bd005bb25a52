use tracing::debug;
use uuid::Uuid;

use crate::models::offer::Offer;

/// Best-effort push to a courier's device when an offer becomes visible to
/// them. Implementations must not fail or block offer creation.
pub trait Notifier: Send + Sync {
    fn offer_visible(&self, courier_id: Uuid, offer: &Offer);
}

/// Default transport: a structured log line. Real deployments plug in a
/// push-gateway client here.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn offer_visible(&self, courier_id: Uuid, offer: &Offer) {
        debug!(
            courier_id = %courier_id,
            offer_id = %offer.id,
            order_id = %offer.order_id,
            fee = offer.courier_share,
            "offer push"
        );
    }
}
