//! Publish/subscribe hub with a per-window error boundary

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::events::Notification;

/// Identifier handed out to each subscribed window
pub type WindowId = u64;

/// Errors delivering to a single window
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("window channel is closed")]
    Closed,

    #[error("window delivery panicked")]
    Panicked,
}

/// A window that can receive notifications
pub trait WindowSink: Send + Sync {
    /// Human-readable name for logs
    fn label(&self) -> &str;

    /// True once the window is gone; destroyed windows are never delivered to
    fn is_destroyed(&self) -> bool;

    /// Hand a notification to the window without blocking
    fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError>;
}

/// Sink backed by an unbounded channel, closed when the receiver is dropped
#[derive(Debug)]
pub struct ChannelSink {
    label: String,
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    pub fn new(label: impl Into<String>, tx: mpsc::UnboundedSender<Notification>) -> Self {
        Self {
            label: label.into(),
            tx,
        }
    }
}

impl WindowSink for ChannelSink {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_destroyed(&self) -> bool {
        self.tx.is_closed()
    }

    fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        self.tx
            .send(notification.clone())
            .map_err(|_| DeliveryError::Closed)
    }
}

/// Outcome of one publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Windows that accepted the notification
    pub delivered: usize,
    /// Destroyed windows that were pruned without being invoked
    pub skipped: usize,
    /// Windows whose delivery failed and were pruned
    pub failed: usize,
}

/// The set of subscribed windows
#[derive(Default)]
pub struct SyncHub {
    next_id: AtomicU64,
    windows: Mutex<BTreeMap<WindowId, Box<dyn WindowSink>>>,
}

impl SyncHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a window; it sees every notification published from now on
    pub fn subscribe(&self, sink: Box<dyn WindowSink>) -> WindowId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(window = id, label = sink.label(), "window subscribed");
        self.lock().insert(id, sink);
        id
    }

    /// Subscribe a channel-backed window and return its receiving end
    #[cfg(test)]
    pub fn subscribe_channel(
        &self,
        label: impl Into<String>,
    ) -> (WindowId, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.subscribe(Box::new(ChannelSink::new(label, tx)));
        (id, rx)
    }

    pub fn unsubscribe(&self, id: WindowId) -> bool {
        let removed = self.lock().remove(&id).is_some();
        if removed {
            debug!(window = id, "window unsubscribed");
        }
        removed
    }

    /// Number of windows currently subscribed, destroyed or not
    pub fn window_count(&self) -> usize {
        self.lock().len()
    }

    /// Deliver `notification` to every live window.
    ///
    /// Each delivery is independent: destroyed windows are skipped, failing
    /// ones are logged and removed, the rest still receive the notification.
    pub fn publish(&self, notification: &Notification) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        let mut windows = self.lock();

        windows.retain(|id, sink| {
            if sink.is_destroyed() {
                debug!(window = *id, label = sink.label(), "skipping destroyed window");
                report.skipped += 1;
                return false;
            }

            let result = catch_unwind(AssertUnwindSafe(|| sink.deliver(notification)))
                .unwrap_or(Err(DeliveryError::Panicked));
            match result {
                Ok(()) => {
                    report.delivered += 1;
                    true
                }
                Err(e) => {
                    warn!(window = *id, label = sink.label(), %e, %notification, "delivery failed");
                    report.failed += 1;
                    false
                }
            }
        });

        debug!(
            %notification,
            delivered = report.delivered,
            skipped = report.skipped,
            failed = report.failed,
            "notification published"
        );
        report
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<WindowId, Box<dyn WindowSink>>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
