#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nodevisor::{devnet::MemoryLauncher, Event, EventKind, NodeRegistry, RegistryConfig, Subscribe};

pub const ACCOUNT: &str = "0x90f8bf6a479f320ead074411a4b0e7944ea8c9c1";

/// Installs a test log writer once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Subscriber remembering every event it receives.
#[derive(Default)]
pub struct Recorder {
    only_port: Option<u16>,
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    /// Recorder that only accepts events of `port`.
    pub fn for_port(port: u16) -> Self {
        Self {
            only_port: Some(port),
            ..Self::default()
        }
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().unwrap().iter().map(|e| e.kind).collect()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Waits (real time) until `kind` was seen `count` times.
    pub async fn wait_for(&self, kind: EventKind, count: usize) -> anyhow::Result<()> {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if self.kinds().iter().filter(|k| **k == kind).count() >= count {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .map_err(|_| anyhow::anyhow!("timed out waiting for {count} x {kind:?}"))
    }
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, event: &Event) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn name(&self) -> &'static str {
        "recorder"
    }

    fn accepts(&self, event: &Event) -> bool {
        self.only_port.is_none() || event.port == self.only_port
    }
}

/// Registry over `launcher` with fast policies and a recorder attached.
pub fn test_registry(launcher: &MemoryLauncher) -> (Arc<NodeRegistry>, Arc<Recorder>) {
    init_tracing();
    let recorder = Arc::new(Recorder::default());
    let mut cfg = RegistryConfig::default();
    cfg.start.delay = Duration::from_millis(10);
    cfg.stop_poll.delay = Duration::from_millis(10);

    let registry = NodeRegistry::builder(Arc::new(launcher.clone()))
        .with_config(cfg)
        .with_subscribers(vec![recorder.clone() as Arc<dyn Subscribe>])
        .build();
    (registry, recorder)
}
