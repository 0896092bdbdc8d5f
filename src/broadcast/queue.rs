//! Bounded hand-off between dispatch threads and a delivery task

use eyre::{Context, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use super::{FailurePolicy, ObserverList};
use crate::event::LogEvent;

pub(crate) struct EventQueue {
    capacity: usize,
    sender: Mutex<Option<mpsc::Sender<LogEvent>>>,
    consumer: Mutex<Option<JoinHandle<()>>>,
    dropped: AtomicU64,
    /// Taken on drop so the runtime never blocks the dropping thread
    runtime: Option<Runtime>,
}

impl EventQueue {
    pub(crate) fn start(capacity: usize, observers: Arc<ObserverList>) -> Result<Self> {
        let capacity = capacity.max(1);
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("msgtap-delivery")
            .enable_time()
            .build()
            .context("Failed to build delivery runtime")?;

        let (sender, mut receiver) = mpsc::channel::<LogEvent>(capacity);

        let consumer = runtime.spawn(async move {
            while let Some(event) = receiver.recv().await {
                // Nobody is left to receive an error here
                let _ = observers.deliver(&event, FailurePolicy::Isolate);
            }
            log::debug!("Delivery queue closed");
        });

        Ok(Self {
            capacity,
            sender: Mutex::new(Some(sender)),
            consumer: Mutex::new(Some(consumer)),
            dropped: AtomicU64::new(0),
            runtime: Some(runtime),
        })
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Enqueue without waiting
    pub(crate) fn push(&self, event: LogEvent) {
        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            log::warn!("Delivery queue is shut down, dropping {} event", event.direction());
            return;
        };

        match sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                log::warn!(
                    "Delivery queue full ({}), dropping {} event ({} dropped so far)",
                    self.capacity,
                    event.direction(),
                    total
                );
            }
            Err(TrySendError::Closed(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!("Delivery task has stopped, dropping {} event", event.direction());
            }
        }
    }

    pub(crate) fn shutdown(&self, timeout: Duration) {
        self.sender.lock().take();

        if Handle::try_current().is_ok() {
            log::warn!("Delivery queue closed from an async context, not waiting for it to drain");
            return;
        }

        let Some(runtime) = self.runtime.as_ref() else {
            return;
        };
        let Some(consumer) = self.consumer.lock().take() else {
            return;
        };

        let drained = runtime.block_on(async { tokio::time::timeout(timeout, consumer).await });

        match drained {
            Ok(Ok(())) => log::debug!("Delivery queue drained"),
            Ok(Err(e)) => log::warn!("Delivery task ended abnormally: {}", e),
            Err(_) => log::warn!("Delivery queue did not drain within {:?}", timeout),
        }
    }
}

impl Drop for EventQueue {
    fn drop(&mut self) {
        self.sender.get_mut().take();
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
