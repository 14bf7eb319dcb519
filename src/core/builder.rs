use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::{
    core::{registry::NodeRegistry, RegistryConfig},
    events::Bus,
    node::LauncherRef,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`NodeRegistry`].
pub struct RegistryBuilder {
    launcher: LauncherRef,
    cfg: RegistryConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl RegistryBuilder {
    pub(crate) fn new(launcher: LauncherRef) -> Self {
        Self {
            launcher,
            cfg: RegistryConfig::default(),
            subscribers: Vec::new(),
        }
    }

    /// Replaces the default configuration.
    pub fn with_config(mut self, cfg: RegistryConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive lifecycle events through dedicated workers with
    /// bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the registry.
    ///
    /// With subscribers configured this spawns the bus listener, so it must
    /// run inside a tokio runtime.
    pub fn build(self) -> Arc<NodeRegistry> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        if !self.subscribers.is_empty() {
            subscriber_listener(&bus, SubscriberSet::new(self.subscribers));
        }
        Arc::new(NodeRegistry::new_internal(self.cfg, self.launcher, bus))
    }
}

/// Forwards bus events to the subscriber set until every publisher is gone.
fn subscriber_listener(bus: &Bus, set: SubscriberSet) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => set.emit(ev),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, subscribers = set.len(), "subscriber listener lagged behind the bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
        for stats in set.shutdown().await {
            if stats.dropped > 0 || stats.panicked > 0 {
                warn!(
                    subscriber = stats.name,
                    dropped = stats.dropped,
                    panicked = stats.panicked,
                    "subscriber missed events"
                );
            }
        }
    });
}
