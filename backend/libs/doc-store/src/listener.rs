//! Continuous listener subscriptions

use crate::{Snapshot, StoreResult};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Added,
    Changed,
    Removed,
}

/// A change to one direct child of an observed path
#[derive(Debug, Clone, PartialEq)]
pub struct ChildEvent {
    pub kind: EventKind,
    pub snapshot: Snapshot,
}

impl ChildEvent {
    pub fn added(snapshot: Snapshot) -> Self {
        Self {
            kind: EventKind::Added,
            snapshot,
        }
    }
}

/// Handle to a live listener.
///
/// Events and listener errors arrive on the same channel. The backing task
/// is aborted when the handle is cancelled or dropped, so a handle must be
/// retained for as long as events are wanted.
pub struct Subscription {
    id: u64,
    events: mpsc::UnboundedReceiver<StoreResult<ChildEvent>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Wrap a receiver fed by `task`
    pub fn new(
        events: mpsc::UnboundedReceiver<StoreResult<ChildEvent>>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            id: NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed),
            events,
            task: Some(task),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next event, or `None` once the listener has stopped
    pub async fn next(&mut self) -> Option<StoreResult<ChildEvent>> {
        self.events.recv().await
    }

    /// Next event if one is already queued
    pub fn try_next(&mut self) -> Option<StoreResult<ChildEvent>> {
        self.events.try_recv().ok()
    }

    pub fn cancel(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!(subscription_id = self.id, "Listener cancelled");
        }
        self.events.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.task.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_subscription_delivers_then_stops_on_cancel() {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(async {
            std::future::pending::<()>().await;
        });
        let mut sub = Subscription::new(rx, task);

        tx.send(Ok(ChildEvent::added(Snapshot::new("k", json!(1)))))
            .unwrap();
        let event = sub.next().await.unwrap().unwrap();
        assert_eq!(event.kind, EventKind::Added);
        assert_eq!(event.snapshot.key, "k");

        sub.cancel();
        assert!(tx.is_closed());
    }

    #[test]
    fn test_subscription_ids_are_unique() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (_tx1, rx1) = mpsc::unbounded_channel();
            let (_tx2, rx2) = mpsc::unbounded_channel();
            let a = Subscription::new(rx1, tokio::spawn(async {}));
            let b = Subscription::new(rx2, tokio::spawn(async {}));
            assert_ne!(a.id(), b.id());
        });
    }
}
