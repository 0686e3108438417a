//! Long-lived listeners owned by a view
//!
//! A view registers its listener tasks by name; registering again under
//! the same name cancels the previous task. Listener tasks only hold weak
//! references to view state and exit once the view is gone.

use crate::domain::models::{UserStats, ViewerPost};
use crate::error::ServiceResult;
use crate::pagination::{Direction, LiveChange, LiveTimeline, PageCursor};
use crate::services::FeedService;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

const FEED_LISTENER: &str = "feed";

/// Named listener tasks; every task is aborted on replace, cancel or drop
#[derive(Default)]
pub struct ListenerRegistry {
    tasks: DashMap<String, JoinHandle<()>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `task` under `name`. Returns true if an earlier task was replaced.
    pub fn register(&self, name: impl Into<String>, task: JoinHandle<()>) -> bool {
        let name = name.into();
        match self.tasks.insert(name.clone(), task) {
            Some(previous) => {
                previous.abort();
                debug!(listener = %name, "Listener replaced");
                true
            }
            None => false,
        }
    }

    pub fn cancel(&self, name: &str) -> bool {
        match self.tasks.remove(name) {
            Some((_, task)) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        self.tasks.retain(|_, task| {
            task.abort();
            false
        });
    }

    /// Whether a task is registered under `name` and still running
    pub fn is_active(&self, name: &str) -> bool {
        self.tasks
            .get(name)
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Drop for ListenerRegistry {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

/// Live profile counters; dropping the observer stops its listeners
pub struct StatsObserver {
    receiver: watch::Receiver<UserStats>,
    task: JoinHandle<()>,
}

impl StatsObserver {
    pub(crate) fn new(receiver: watch::Receiver<UserStats>, task: JoinHandle<()>) -> Self {
        Self { receiver, task }
    }

    pub fn current(&self) -> UserStats {
        *self.receiver.borrow()
    }

    /// Wait for the next recount that changed the stats
    pub async fn changed(&mut self) -> Option<UserStats> {
        self.receiver.changed().await.ok()?;
        Some(*self.receiver.borrow_and_update())
    }

    pub fn subscribe(&self) -> watch::Receiver<UserStats> {
        self.receiver.clone()
    }
}

impl Drop for StatsObserver {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct SessionState {
    timeline: Mutex<LiveTimeline<ViewerPost>>,
    cursor: Mutex<PageCursor>,
    version: watch::Sender<u64>,
}

impl SessionState {
    fn notify(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

/// Home feed for the lifetime of one view.
///
/// Owns the merged timeline, the paging cursor and the live listener that
/// pulls in newly delivered posts.
pub struct FeedSession {
    viewer_id: Uuid,
    feed: FeedService,
    state: Arc<SessionState>,
    listeners: ListenerRegistry,
}

impl FeedSession {
    pub fn new(feed: FeedService, viewer_id: Uuid) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            viewer_id,
            feed,
            state: Arc::new(SessionState {
                timeline: Mutex::new(LiveTimeline::new(Direction::Descending)),
                cursor: Mutex::new(PageCursor::start()),
                version,
            }),
            listeners: ListenerRegistry::new(),
        }
    }

    /// Load the newest page and (re)start the live listener at its head.
    /// Returns how many posts were new to the timeline.
    pub async fn load_first_page(&self) -> ServiceResult<usize> {
        let page = self.feed.fetch_feed_page(self.viewer_id).await?;
        let added = self.state.timeline.lock().merge(page.items);
        *self.state.cursor.lock() = page.cursor;
        self.state.notify();

        self.start_listener().await?;
        Ok(added)
    }

    /// Load the page after the current cursor; 0 once exhausted
    pub async fn load_next_page(&self) -> ServiceResult<usize> {
        let cursor = self.state.cursor.lock().clone();
        if cursor.is_exhausted() {
            return Ok(0);
        }

        let page = self
            .feed
            .fetch_next_feed_page(self.viewer_id, &cursor)
            .await?;
        let added = self.state.timeline.lock().merge(page.items);
        *self.state.cursor.lock() = page.cursor;
        if added > 0 {
            self.state.notify();
        }
        Ok(added)
    }

    /// Snapshot of the timeline, newest first
    pub fn timeline(&self) -> Vec<ViewerPost> {
        self.state.timeline.lock().items().to_vec()
    }

    pub fn is_exhausted(&self) -> bool {
        self.state.cursor.lock().is_exhausted()
    }

    /// Receiver bumped on every timeline change
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.state.version.subscribe()
    }

    pub fn is_live(&self) -> bool {
        self.listeners.is_active(FEED_LISTENER)
    }

    /// Stop all listeners; the loaded timeline stays readable
    pub fn close(&self) {
        self.listeners.cancel_all();
        debug!(viewer_id = %self.viewer_id, "Feed session closed");
    }

    async fn start_listener(&self) -> ServiceResult<()> {
        let since = self.state.timeline.lock().newest_key();
        let mut updates = self.feed.observe_feed(self.viewer_id, since).await?;

        let weak: Weak<SessionState> = Arc::downgrade(&self.state);
        let feed = self.feed.clone();
        let viewer_id = self.viewer_id;

        let task = tokio::spawn(async move {
            while let Some(change) = updates.next().await {
                if weak.strong_count() == 0 {
                    break;
                }
                let change = match change {
                    Ok(change) => change,
                    Err(e) => {
                        warn!(viewer_id = %viewer_id, error = %e, "Feed listener error");
                        continue;
                    }
                };

                let resolved = match change {
                    LiveChange::Added(entry) | LiveChange::Changed(entry) => {
                        match feed.resolve_entries(viewer_id, &[entry]).await {
                            Ok(posts) => LiveChange::Added(posts),
                            Err(e) => {
                                warn!(viewer_id = %viewer_id, post_id = %entry.post_id, error = %e, "Failed to resolve live feed entry");
                                continue;
                            }
                        }
                    }
                    LiveChange::Removed(post_id) => LiveChange::Removed(post_id),
                };

                let Some(state) = weak.upgrade() else {
                    break;
                };
                let changed = match resolved {
                    LiveChange::Added(posts) | LiveChange::Changed(posts) => {
                        if posts.is_empty() {
                            false
                        } else {
                            state.timeline.lock().merge(posts);
                            true
                        }
                    }
                    LiveChange::Removed(post_id) => state.timeline.lock().remove(post_id),
                };
                if changed {
                    state.notify();
                }
            }
            debug!(viewer_id = %viewer_id, "Feed listener stopped");
        });

        self.listeners.register(FEED_LISTENER, task);
        Ok(())
    }
}

impl Drop for FeedSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn pending_task() -> JoinHandle<()> {
        tokio::spawn(std::future::pending::<()>())
    }

    #[tokio::test]
    async fn test_register_replaces_and_aborts() {
        let registry = ListenerRegistry::new();
        let first = pending_task();
        let first_abort = first.abort_handle();

        assert!(!registry.register("feed", first));
        assert!(registry.register("feed", pending_task()));
        assert_eq!(registry.len(), 1);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(first_abort.is_finished());
        assert!(registry.is_active("feed"));
    }

    #[tokio::test]
    async fn test_cancel_all_empties_registry() {
        let registry = ListenerRegistry::new();
        registry.register("a", pending_task());
        registry.register("b", pending_task());

        assert!(registry.cancel("a"));
        assert!(!registry.cancel("a"));
        registry.cancel_all();
        assert!(registry.is_empty());
        assert!(!registry.is_active("b"));
    }
}
