//! Live listeners and the merged, re-sorted timeline they feed

use super::Direction;
use crate::domain::models::{Comment, FeedEntry, ViewerPost};
use crate::error::ServiceResult;
use crate::repository::key_to_id;
use doc_store::{EventKind, Snapshot, Subscription};
use uuid::Uuid;

/// An item that can sit in a merged timeline
pub trait TimelineItem: Clone + Send + Sync + 'static {
    fn item_id(&self) -> Uuid;
    fn sort_key(&self) -> f64;
}

impl TimelineItem for FeedEntry {
    fn item_id(&self) -> Uuid {
        self.post_id
    }

    fn sort_key(&self) -> f64 {
        self.timestamp
    }
}

impl TimelineItem for Comment {
    fn item_id(&self) -> Uuid {
        self.id
    }

    fn sort_key(&self) -> f64 {
        self.timestamp
    }
}

impl TimelineItem for ViewerPost {
    fn item_id(&self) -> Uuid {
        self.post.id
    }

    fn sort_key(&self) -> f64 {
        self.post.timestamp
    }
}

/// Items merged from pages and listeners.
///
/// Every merge de-duplicates by id and re-sorts, since listener deliveries
/// can arrive out of order or repeat items already paged in.
#[derive(Debug, Clone)]
pub struct LiveTimeline<T> {
    items: Vec<T>,
    direction: Direction,
}

impl<T: TimelineItem> LiveTimeline<T> {
    pub fn new(direction: Direction) -> Self {
        Self {
            items: Vec::new(),
            direction,
        }
    }

    /// Merge items, replacing any with a known id. Returns how many were new.
    pub fn merge<I: IntoIterator<Item = T>>(&mut self, incoming: I) -> usize {
        let mut added = 0;
        for item in incoming {
            let id = item.item_id();
            match self.items.iter_mut().find(|existing| existing.item_id() == id) {
                Some(existing) => *existing = item,
                None => {
                    self.items.push(item);
                    added += 1;
                }
            }
        }
        self.sort();
        added
    }

    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.item_id() != id);
        self.items.len() != before
    }

    fn sort(&mut self) {
        let direction = self.direction;
        self.items.sort_by(|a, b| {
            let ordering = a
                .sort_key()
                .total_cmp(&b.sort_key())
                .then_with(|| a.item_id().cmp(&b.item_id()));
            match direction {
                Direction::Ascending => ordering,
                Direction::Descending => ordering.reverse(),
            }
        });
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Highest sort key held; live listeners start here
    pub fn newest_key(&self) -> Option<f64> {
        self.items
            .iter()
            .map(TimelineItem::sort_key)
            .max_by(|a, b| a.total_cmp(b))
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.items.iter().any(|item| item.item_id() == id)
    }
}

/// A decoded listener event
#[derive(Debug, Clone, PartialEq)]
pub enum LiveChange<T> {
    Added(T),
    Changed(T),
    Removed(Uuid),
}

/// Typed view over a store subscription
pub struct LiveUpdates<T> {
    subscription: Subscription,
    decode: fn(&Snapshot) -> ServiceResult<T>,
}

impl<T> LiveUpdates<T> {
    pub fn new(subscription: Subscription, decode: fn(&Snapshot) -> ServiceResult<T>) -> Self {
        Self {
            subscription,
            decode,
        }
    }

    /// Next change, or `None` once the listener has stopped
    pub async fn next(&mut self) -> Option<ServiceResult<LiveChange<T>>> {
        let event = match self.subscription.next().await? {
            Ok(event) => event,
            Err(e) => return Some(Err(e.into())),
        };

        let change = match event.kind {
            EventKind::Added => (self.decode)(&event.snapshot).map(LiveChange::Added),
            EventKind::Changed => (self.decode)(&event.snapshot).map(LiveChange::Changed),
            EventKind::Removed => key_to_id(&event.snapshot.key).map(LiveChange::Removed),
        };
        Some(change)
    }

    /// Next added item, skipping changes and removals
    pub async fn next_added(&mut self) -> Option<ServiceResult<T>> {
        loop {
            match self.next().await? {
                Ok(LiveChange::Added(item)) => return Some(Ok(item)),
                Ok(_) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }

    pub fn cancel(self) {
        self.subscription.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u128, ts: f64) -> FeedEntry {
        FeedEntry {
            post_id: Uuid::from_u128(id),
            post_owner_id: Uuid::nil(),
            timestamp: ts,
        }
    }

    fn ids(timeline: &LiveTimeline<FeedEntry>) -> Vec<u128> {
        timeline.items().iter().map(|e| e.post_id.as_u128()).collect()
    }

    #[test]
    fn test_merge_dedups_and_resorts() {
        let mut timeline = LiveTimeline::new(Direction::Descending);
        assert_eq!(timeline.merge(vec![entry(1, 10.0), entry(2, 8.0)]), 2);

        // Listener delivers an older item after a newer one, plus a repeat.
        assert_eq!(timeline.merge(vec![entry(3, 12.0), entry(4, 9.0), entry(1, 10.0)]), 2);
        assert_eq!(ids(&timeline), vec![3, 1, 4, 2]);
        assert_eq!(timeline.newest_key(), Some(12.0));
    }

    #[test]
    fn test_ascending_and_remove() {
        let mut timeline = LiveTimeline::new(Direction::Ascending);
        timeline.merge(vec![entry(2, 2.0), entry(1, 1.0)]);
        assert_eq!(ids(&timeline), vec![1, 2]);

        assert!(timeline.remove(Uuid::from_u128(1)));
        assert!(!timeline.remove(Uuid::from_u128(1)));
        assert_eq!(timeline.len(), 1);
    }
}
