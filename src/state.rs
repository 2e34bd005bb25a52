use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::config::Config;
use crate::engine::queue::DispatchRequest;
use crate::models::courier::CourierEntry;
use crate::models::events::ChangeEvent;
use crate::models::offer::Offer;
use crate::models::trip::Trip;
use crate::observability::metrics::Metrics;
use crate::sync::notify::{Notifier, TracingNotifier};
use crate::sync::{InMemoryOrderStore, OrderStore};

pub struct AppState {
    pub config: Config,
    pub trips: DashMap<Uuid, Trip>,
    pub offers: DashMap<Uuid, Offer>,
    pub couriers: DashMap<Uuid, CourierEntry>,
    pub orders: Arc<dyn OrderStore>,
    pub notifier: Arc<dyn Notifier>,
    pub dispatch_tx: mpsc::Sender<DispatchRequest>,
    pub events_tx: broadcast::Sender<ChangeEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: Config) -> (Self, mpsc::Receiver<DispatchRequest>) {
        Self::with_collaborators(
            config,
            Arc::new(InMemoryOrderStore::default()),
            Arc::new(TracingNotifier),
        )
    }

    pub fn with_collaborators(
        config: Config,
        orders: Arc<dyn OrderStore>,
        notifier: Arc<dyn Notifier>,
    ) -> (Self, mpsc::Receiver<DispatchRequest>) {
        let (dispatch_tx, dispatch_rx) = mpsc::channel(config.dispatch_queue_size);
        let (events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);

        (
            Self {
                config,
                trips: DashMap::new(),
                offers: DashMap::new(),
                couriers: DashMap::new(),
                orders,
                notifier,
                dispatch_tx,
                events_tx,
                metrics: Metrics::new(),
            },
            dispatch_rx,
        )
    }

    /// Fans a record snapshot out to subscribed clients. Best-effort: a
    /// closed or lagging channel never fails the mutation that produced it.
    pub fn publish(&self, event: ChangeEvent) {
        let _ = self.events_tx.send(event);
    }
}
