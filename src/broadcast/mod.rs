//! Notification channel for tap events
//!
//! A `Broadcaster` is created once at application start and shared by `Arc`
//! with everything that builds taps. Observers attach and detach at any time.
//!
//! Delivery modes:
//! - Inline: observers run on the dispatch thread that produced the event.
//!   A slow observer adds its latency to the RPC call, and an observer that
//!   calls back into the host from inside `on_event` can deadlock it.
//! - Queued: events go through a bounded queue to a dedicated consumer task.
//!   The dispatch thread never waits; events are dropped when the queue is full.
//!   Dropping a queued broadcaster abandons undelivered events; call
//!   `shutdown` first from synchronous code to drain them. Dropping it inside
//!   an async runtime is safe.

use eyre::{Result, WrapErr};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

mod queue;

use crate::event::LogEvent;
use queue::EventQueue;

/// How long `shutdown` waits for queued events to drain
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Receives tap events
pub trait Observer: Send + Sync {
    fn on_event(&self, event: &LogEvent) -> Result<()>;

    /// Label used when reporting failures
    fn name(&self) -> &str {
        "observer"
    }
}

impl<F> Observer for F
where
    F: Fn(&LogEvent) -> Result<()> + Send + Sync,
{
    fn on_event(&self, event: &LogEvent) -> Result<()> {
        self(event)
    }
}

/// What happens when producing or delivering an event fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the failure and keep the RPC call going
    #[default]
    Isolate,
    /// Return the failure to the host pipeline, aborting the call
    Propagate,
}

/// How events reach observers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Delivery {
    /// On the caller's thread, in subscription order
    #[default]
    Inline,
    /// Through a bounded queue drained by a dedicated task
    Queued { capacity: usize },
}

/// Handle returned by `subscribe`, used to detach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// The subscriber list shared between the broadcaster and its queue consumer
pub(crate) struct ObserverList {
    next_id: AtomicU64,
    entries: RwLock<Vec<(SubscriptionId, Arc<dyn Observer>)>>,
}

impl ObserverList {
    fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: RwLock::new(Vec::new()),
        }
    }

    fn push(&self, observer: Arc<dyn Observer>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.write().push((id, observer));
        id
    }

    fn remove(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.write();
        match entries.iter().position(|(sub, _)| *sub == id) {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Copy of the current observers so callbacks run without the lock held
    fn snapshot(&self) -> Vec<Arc<dyn Observer>> {
        self.entries.read().iter().map(|(_, observer)| Arc::clone(observer)).collect()
    }

    pub(crate) fn deliver(&self, event: &LogEvent, policy: FailurePolicy) -> Result<()> {
        for observer in self.snapshot() {
            match policy {
                FailurePolicy::Propagate => {
                    observer
                        .on_event(event)
                        .wrap_err_with(|| format!("Observer '{}' failed", observer.name()))?;
                }
                FailurePolicy::Isolate => {
                    match panic::catch_unwind(AssertUnwindSafe(|| observer.on_event(event))) {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            log::warn!("Observer '{}' failed: {:#}", observer.name(), e);
                        }
                        Err(payload) => {
                            log::warn!("Observer '{}' panicked: {}", observer.name(), panic_message(&*payload));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Fans tap events out to observers
pub struct Broadcaster {
    observers: Arc<ObserverList>,
    policy: FailurePolicy,
    queue: Option<EventQueue>,
}

impl Broadcaster {
    /// Inline broadcaster that isolates observer failures
    pub fn new() -> Self {
        Self {
            observers: Arc::new(ObserverList::new()),
            policy: FailurePolicy::default(),
            queue: None,
        }
    }

    /// Build a broadcaster for the given delivery mode and failure policy
    pub fn with_delivery(delivery: Delivery, policy: FailurePolicy) -> Result<Self> {
        let observers = Arc::new(ObserverList::new());
        let queue = match delivery {
            Delivery::Inline => None,
            Delivery::Queued { capacity } => Some(
                EventQueue::start(capacity, Arc::clone(&observers)).wrap_err("Failed to start delivery queue")?,
            ),
        };

        Ok(Self {
            observers,
            policy,
            queue,
        })
    }

    /// Attach an observer. Subscribing the same observer twice delivers every event to it twice.
    pub fn subscribe<O>(&self, observer: O) -> SubscriptionId
    where
        O: Observer + 'static,
    {
        self.subscribe_arc(Arc::new(observer))
    }

    pub fn subscribe_arc(&self, observer: Arc<dyn Observer>) -> SubscriptionId {
        let id = self.observers.push(observer);
        log::debug!("Subscribed {} ({} observers)", id, self.observers.len());
        id
    }

    /// Detach one subscription. Returns false if it was not attached.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.observers.remove(id);
        if removed {
            log::debug!("Unsubscribed {}", id);
        }
        removed
    }

    /// Deliver an event to every attached observer
    ///
    /// A no-op when nobody is subscribed. In queued mode the event is handed
    /// off and failures are only logged.
    pub fn notify(&self, event: &LogEvent) -> Result<()> {
        if self.observers.len() == 0 {
            return Ok(());
        }

        match &self.queue {
            Some(queue) => {
                queue.push(event.clone());
                Ok(())
            }
            None => self.observers.deliver(event, self.policy),
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn delivery(&self) -> Delivery {
        match &self.queue {
            Some(queue) => Delivery::Queued {
                capacity: queue.capacity(),
            },
            None => Delivery::Inline,
        }
    }

    /// Events dropped because the delivery queue was full or closed
    pub fn dropped(&self) -> u64 {
        self.queue.as_ref().map(|q| q.dropped()).unwrap_or(0)
    }

    /// Close the delivery queue and wait for pending events to be delivered
    ///
    /// Inline broadcasters have nothing to drain. Called from inside an async
    /// runtime it only closes the queue and does not wait.
    pub fn shutdown(&self, timeout: Duration) {
        if let Some(queue) = &self.queue {
            queue.shutdown(timeout);
        }
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}
