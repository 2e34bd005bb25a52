use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub offers_total: IntCounterVec,
    pub open_offers: IntGauge,
    pub accept_conflicts_total: IntCounter,
    pub trip_transitions_total: IntCounterVec,
    pub dispatch_escalations_total: IntCounter,
    pub order_sync_failures_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let offers_total = IntCounterVec::new(
            Opts::new("offers_total", "Offer records by outcome"),
            &["outcome"],
        )
        .expect("valid offers_total metric");

        let open_offers = IntGauge::new("open_offers", "Offers currently open for acceptance")
            .expect("valid open_offers metric");

        let accept_conflicts_total = IntCounter::new(
            "accept_conflicts_total",
            "Accept calls that lost the race or hit an expired offer",
        )
        .expect("valid accept_conflicts_total metric");

        let trip_transitions_total = IntCounterVec::new(
            Opts::new("trip_transitions_total", "Trip transitions by reached status"),
            &["status"],
        )
        .expect("valid trip_transitions_total metric");

        let dispatch_escalations_total = IntCounter::new(
            "dispatch_escalations_total",
            "Trips escalated to manual dispatch after exhausting broadcast attempts",
        )
        .expect("valid dispatch_escalations_total metric");

        let order_sync_failures_total = IntCounter::new(
            "order_sync_failures_total",
            "Order status mirror writes that failed and await reconciliation",
        )
        .expect("valid order_sync_failures_total metric");

        registry
            .register(Box::new(offers_total.clone()))
            .expect("register offers_total");
        registry
            .register(Box::new(open_offers.clone()))
            .expect("register open_offers");
        registry
            .register(Box::new(accept_conflicts_total.clone()))
            .expect("register accept_conflicts_total");
        registry
            .register(Box::new(trip_transitions_total.clone()))
            .expect("register trip_transitions_total");
        registry
            .register(Box::new(dispatch_escalations_total.clone()))
            .expect("register dispatch_escalations_total");
        registry
            .register(Box::new(order_sync_failures_total.clone()))
            .expect("register order_sync_failures_total");

        Self {
            registry,
            offers_total,
            open_offers,
            accept_conflicts_total,
            trip_transitions_total,
            dispatch_escalations_total,
            order_sync_failures_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
