//! # SubscriberSet: per-subscriber lanes with delivery accounting.
//!
//! Each subscriber gets a lane: its interest filter, a bounded queue and a
//! worker task. [`SubscriberSet::emit`] never waits on a worker; what each
//! lane did with the events it saw is counted and reported by
//! [`SubscriberSet::stats`] and [`SubscriberSet::shutdown`].
//!
//! ```text
//!  emit(Event)
//!     ├─► accepts()? ── no ─► filtered
//!     │       └ yes ─► try_send ─┬─► [queue] ─► worker ─► on_event() ─┬─► delivered
//!     │                          │                                    └─► panicked
//!     │                          └─► full / closed ─► dropped
//!     └─► next lane ...
//! ```
//!
//! Order is FIFO within a lane and unspecified across lanes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, warn};

use crate::events::Event;

use super::Subscribe;

/// What one subscriber did with the events emitted so far.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubscriberStats {
    /// [`Subscribe::name`] of the subscriber.
    pub name: &'static str,
    /// Events `on_event` completed for.
    pub delivered: u64,
    /// Events rejected by [`Subscribe::accepts`].
    pub filtered: u64,
    /// Events lost to a full queue or a stopped worker.
    pub dropped: u64,
    /// Events whose `on_event` panicked.
    pub panicked: u64,
}

#[derive(Default)]
struct Counters {
    delivered: AtomicU64,
    filtered: AtomicU64,
    dropped: AtomicU64,
    panicked: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self, name: &'static str) -> SubscriberStats {
        SubscriberStats {
            name,
            delivered: self.delivered.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
        }
    }
}

struct Lane {
    sub: Arc<dyn Subscribe>,
    tx: mpsc::Sender<Arc<Event>>,
    counters: Arc<Counters>,
    worker: JoinHandle<()>,
}

/// Fan-out of lifecycle events to subscribers, one lane each.
pub struct SubscriberSet {
    lanes: Vec<Lane>,
}

impl SubscriberSet {
    /// Opens one lane per subscriber, in the given order.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        let lanes = subs
            .into_iter()
            .map(|sub| {
                let (tx, rx) = mpsc::channel(sub.queue_capacity().max(1));
                let counters = Arc::new(Counters::default());
                let worker = tokio::spawn(run_lane(Arc::clone(&sub), rx, Arc::clone(&counters)));
                Lane {
                    sub,
                    tx,
                    counters,
                    worker,
                }
            })
            .collect();
        Self { lanes }
    }

    /// Offers `event` to every lane without waiting for any worker.
    pub fn emit(&self, event: Event) {
        let ev = Arc::new(event);
        for lane in &self.lanes {
            if !lane.sub.accepts(&ev) {
                Counters::bump(&lane.counters.filtered);
                continue;
            }
            let reason = match lane.tx.try_send(Arc::clone(&ev)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "queue full",
                Err(mpsc::error::TrySendError::Closed(_)) => "worker stopped",
            };
            Counters::bump(&lane.counters.dropped);
            warn!(
                subscriber = lane.sub.name(),
                port = ?ev.port,
                kind = ?ev.kind,
                seq = ev.seq,
                reason,
                "dropped event"
            );
        }
    }

    /// Current counters, one entry per subscriber in registration order.
    pub fn stats(&self) -> Vec<SubscriberStats> {
        self.lanes
            .iter()
            .map(|lane| lane.counters.snapshot(lane.sub.name()))
            .collect()
    }

    /// Closes every queue, waits for the workers to drain them and returns
    /// the final counters.
    pub async fn shutdown(self) -> Vec<SubscriberStats> {
        let mut out = Vec::with_capacity(self.lanes.len());
        let mut pending = Vec::with_capacity(self.lanes.len());
        for lane in self.lanes {
            drop(lane.tx);
            pending.push((lane.sub, lane.counters, lane.worker));
        }

        for (sub, counters, worker) in pending {
            if let Err(e) = worker.await {
                warn!(subscriber = sub.name(), error = %e, "subscriber worker aborted");
            }
            let stats = counters.snapshot(sub.name());
            debug!(
                subscriber = stats.name,
                delivered = stats.delivered,
                filtered = stats.filtered,
                dropped = stats.dropped,
                panicked = stats.panicked,
                "subscriber drained"
            );
            out.push(stats);
        }
        out
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lanes.len()
    }
}

async fn run_lane(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>, counters: Arc<Counters>) {
    while let Some(ev) = rx.recv().await {
        let handled = std::panic::AssertUnwindSafe(sub.on_event(&ev))
            .catch_unwind()
            .await;
        if handled.is_ok() {
            Counters::bump(&counters.delivered);
            continue;
        }
        Counters::bump(&counters.panicked);
        warn!(
            subscriber = sub.name(),
            port = ?ev.port,
            kind = ?ev.kind,
            seq = ev.seq,
            "subscriber panicked"
        );
    }
}
