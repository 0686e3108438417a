//! In-process document store
//!
//! Holds every document in an ordered map keyed by path and broadcasts
//! writes to live listeners. Used for local runs and tests; supports
//! injected failures per operation and path prefix.

use crate::{
    ChildEvent, DocumentStore, EventKind, Query, Snapshot, StoreError, StoreMetrics, StorePath,
    StoreResult, Subscription,
};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

const CHANGE_CHANNEL_CAPACITY: usize = 4096;

/// Operation a fault rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultOp {
    Get,
    Set,
    Remove,
    Query,
    Observe,
}

#[derive(Debug, Clone)]
struct FaultRule {
    op: FaultOp,
    prefix: StorePath,
    remaining: Option<usize>,
}

#[derive(Debug, Clone)]
struct StoreChange {
    path: StorePath,
    kind: EventKind,
    value: Value,
}

struct Inner {
    docs: RwLock<BTreeMap<StorePath, Value>>,
    changes: broadcast::Sender<StoreChange>,
    faults: Mutex<Vec<FaultRule>>,
    query_count: AtomicU64,
    metrics: StoreMetrics,
}

#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                docs: RwLock::new(BTreeMap::new()),
                changes,
                faults: Mutex::new(Vec::new()),
                query_count: AtomicU64::new(0),
                metrics: StoreMetrics::new(),
            }),
        }
    }

    /// Fail every `op` on paths at or beneath `prefix` until cleared
    pub fn fail_on(&self, op: FaultOp, prefix: StorePath) {
        self.inner.faults.lock().push(FaultRule {
            op,
            prefix,
            remaining: None,
        });
    }

    /// Fail the next `times` matching operations
    pub fn fail_times(&self, op: FaultOp, prefix: StorePath, times: usize) {
        if times == 0 {
            return;
        }
        self.inner.faults.lock().push(FaultRule {
            op,
            prefix,
            remaining: Some(times),
        });
    }

    pub fn clear_faults(&self) {
        self.inner.faults.lock().clear();
    }

    /// Number of range queries served so far
    pub fn query_count(&self) -> u64 {
        self.inner.query_count.load(Ordering::Relaxed)
    }

    /// Synchronous existence check for assertions
    pub fn contains(&self, path: &StorePath) -> bool {
        self.inner.docs.read().contains_key(path)
    }

    /// Number of direct children under `path`
    pub fn child_count(&self, path: &StorePath) -> usize {
        children_of(&self.inner.docs.read(), path).len()
    }

    fn check_fault(&self, op: FaultOp, path: &StorePath) -> StoreResult<()> {
        let mut faults = self.inner.faults.lock();
        let hit = faults
            .iter_mut()
            .position(|rule| rule.op == op && path.starts_with(&rule.prefix));

        let Some(index) = hit else {
            return Ok(());
        };

        let exhausted = match faults[index].remaining.as_mut() {
            Some(remaining) => {
                *remaining = remaining.saturating_sub(1);
                *remaining == 0
            }
            None => false,
        };
        if exhausted {
            faults.remove(index);
        }

        warn!(path = %path, op = ?op, "Injected store failure");
        self.inner.metrics.record_error(path, op_label(op));
        Err(StoreError::Unavailable(format!(
            "injected {:?} failure at {}",
            op, path
        )))
    }

    fn publish(&self, change: StoreChange) {
        // No receivers is not an error: nobody is listening yet.
        let _ = self.inner.changes.send(change);
    }
}

fn op_label(op: FaultOp) -> &'static str {
    match op {
        FaultOp::Get => "get",
        FaultOp::Set => "set",
        FaultOp::Remove => "remove",
        FaultOp::Query => "query",
        FaultOp::Observe => "observe",
    }
}

fn descendants<'a>(
    docs: &'a BTreeMap<StorePath, Value>,
    path: &'a StorePath,
) -> impl Iterator<Item = (&'a StorePath, &'a Value)> + 'a {
    docs.range(path.clone()..)
        .take_while(move |(p, _)| p.starts_with(path))
        .filter(move |(p, _)| p.depth() > path.depth())
}

/// Build a nested object out of the documents beneath `path`
fn assemble(docs: &BTreeMap<StorePath, Value>, path: &StorePath) -> Option<Value> {
    if let Some(value) = docs.get(path) {
        return Some(value.clone());
    }

    let mut root = Map::new();
    for (p, value) in descendants(docs, path) {
        let relative: Vec<String> = p
            .to_string()
            .split('/')
            .skip(path.depth())
            .map(str::to_string)
            .collect();
        insert_nested(&mut root, &relative, value.clone());
    }

    if root.is_empty() {
        None
    } else {
        Some(Value::Object(root))
    }
}

fn insert_nested(node: &mut Map<String, Value>, segments: &[String], value: Value) {
    match segments {
        [] => {}
        [last] => {
            node.insert(last.clone(), value);
        }
        [first, rest @ ..] => {
            let entry = node
                .entry(first.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                insert_nested(child, rest, value);
            }
        }
    }
}

/// Direct children of `path`, each assembled into one document
fn children_of(docs: &BTreeMap<StorePath, Value>, path: &StorePath) -> Vec<Snapshot> {
    let mut keys: Vec<String> = Vec::new();
    for (p, _) in descendants(docs, path) {
        let key = p
            .to_string()
            .split('/')
            .nth(path.depth())
            .unwrap_or_default()
            .to_string();
        if keys.last() != Some(&key) {
            keys.push(key);
        }
    }

    keys.into_iter()
        .filter_map(|key| {
            let child = path.child(&key);
            assemble(docs, &child).map(|value| Snapshot::new(key, value))
        })
        .collect()
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn generate_key(&self) -> Uuid {
        Uuid::new_v4()
    }

    async fn get(&self, path: &StorePath) -> StoreResult<Option<Value>> {
        self.check_fault(FaultOp::Get, path)?;
        self.inner.metrics.record_read(path);
        Ok(assemble(&self.inner.docs.read(), path))
    }

    async fn set(&self, path: &StorePath, value: Value) -> StoreResult<()> {
        if value.is_null() {
            return self.remove(path).await;
        }
        self.check_fault(FaultOp::Set, path)?;

        let existed = {
            let mut docs = self.inner.docs.write();
            let stale: Vec<StorePath> = descendants(&docs, path).map(|(p, _)| p.clone()).collect();
            for p in &stale {
                docs.remove(p);
            }
            docs.insert(path.clone(), value.clone()).is_some() || !stale.is_empty()
        };

        self.inner.metrics.record_write(path);
        debug!(path = %path, "Store set");
        self.publish(StoreChange {
            path: path.clone(),
            kind: if existed {
                EventKind::Changed
            } else {
                EventKind::Added
            },
            value,
        });
        Ok(())
    }

    async fn remove(&self, path: &StorePath) -> StoreResult<()> {
        self.check_fault(FaultOp::Remove, path)?;

        let removed = {
            let mut docs = self.inner.docs.write();
            let previous = assemble(&docs, path);
            let doomed: Vec<StorePath> = docs
                .range(path.clone()..)
                .take_while(|(p, _)| p.starts_with(path))
                .map(|(p, _)| p.clone())
                .collect();
            for p in &doomed {
                docs.remove(p);
            }
            previous
        };

        self.inner.metrics.record_remove(path);
        if let Some(value) = removed {
            debug!(path = %path, "Store remove");
            self.publish(StoreChange {
                path: path.clone(),
                kind: EventKind::Removed,
                value,
            });
        }
        Ok(())
    }

    async fn query(&self, path: &StorePath, query: &Query) -> StoreResult<Vec<Snapshot>> {
        self.check_fault(FaultOp::Query, path)?;
        self.inner.query_count.fetch_add(1, Ordering::Relaxed);
        self.inner.metrics.record_query(path);

        let children = children_of(&self.inner.docs.read(), path);
        Ok(query.apply(children))
    }

    async fn observe(&self, path: &StorePath, query: &Query) -> StoreResult<Subscription> {
        self.check_fault(FaultOp::Observe, path)?;
        self.inner.metrics.record_listener(path);

        // Subscribe before reading the initial set so no write falls between.
        let mut changes = self.inner.changes.subscribe();
        let initial = query.apply(children_of(&self.inner.docs.read(), path));

        let (tx, rx) = mpsc::unbounded_channel();
        let parent = path.clone();
        let query = query.clone();

        let task = tokio::spawn(async move {
            for snapshot in initial {
                if tx.send(Ok(ChildEvent::added(snapshot))).is_err() {
                    return;
                }
            }

            loop {
                match changes.recv().await {
                    Ok(change) => {
                        if !change.path.is_child_of(&parent) {
                            continue;
                        }
                        let snapshot = Snapshot::new(change.path.key(), change.value);
                        if change.kind != EventKind::Removed && !query.within_bounds(&snapshot) {
                            continue;
                        }
                        let event = ChildEvent {
                            kind: change.kind,
                            snapshot,
                        };
                        if tx.send(Ok(event)).is_err() {
                            return;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(path = %parent, skipped, "Listener lagged behind change stream");
                        if tx.send(Err(StoreError::ListenerLagged(skipped))).is_err() {
                            return;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        });

        debug!(path = %path, "Listener registered");
        Ok(Subscription::new(rx, task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn path(raw: &str) -> StorePath {
        StorePath::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryStore::new();
        store.set(&path("users/u1"), json!({"username": "a"})).await.unwrap();

        assert_eq!(
            store.get(&path("users/u1")).await.unwrap(),
            Some(json!({"username": "a"}))
        );
        assert!(store.exists(&path("users/u1")).await.unwrap());

        store.remove(&path("users/u1")).await.unwrap();
        assert_eq!(store.get(&path("users/u1")).await.unwrap(), None);
        // Removing an absent path is a no-op
        store.remove(&path("users/u1")).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_assembles_subtree() {
        let store = MemoryStore::new();
        store.set(&path("likes/o/p/v1"), json!(1)).await.unwrap();
        store.set(&path("likes/o/p/v2"), json!(1)).await.unwrap();

        let tree = store.get(&path("likes/o")).await.unwrap().unwrap();
        assert_eq!(tree, json!({"p": {"v1": 1, "v2": 1}}));
    }

    #[tokio::test]
    async fn test_query_returns_direct_children_only() {
        let store = MemoryStore::new();
        store.set(&path("feed/u1/a"), json!({"timestamp": 2.0})).await.unwrap();
        store.set(&path("feed/u1/b"), json!({"timestamp": 1.0})).await.unwrap();
        store.set(&path("feed/u10/c"), json!({"timestamp": 3.0})).await.unwrap();

        let result = store
            .query(&path("feed/u1"), &Query::ordered_by_child("timestamp"))
            .await
            .unwrap();
        let keys: Vec<_> = result.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(store.query_count(), 1);
    }

    #[tokio::test]
    async fn test_fail_times_expires() {
        let store = MemoryStore::new();
        store.fail_times(FaultOp::Set, path("followers"), 1);

        let first = store.set(&path("followers/t/v"), json!(1)).await;
        assert!(matches!(first, Err(StoreError::Unavailable(_))));

        store.set(&path("followers/t/v"), json!(1)).await.unwrap();
        assert!(store.contains(&path("followers/t/v")));
    }

    #[tokio::test]
    async fn test_fault_scoped_to_prefix() {
        let store = MemoryStore::new();
        store.fail_on(FaultOp::Set, path("feed/u2"));

        store.set(&path("feed/u1/p"), json!(1)).await.unwrap();
        assert!(store.set(&path("feed/u2/p"), json!(1)).await.is_err());

        store.clear_faults();
        store.set(&path("feed/u2/p"), json!(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_observe_delivers_existing_then_new() {
        let store = MemoryStore::new();
        store.set(&path("comments/p/c1"), json!({"timestamp": 1.0})).await.unwrap();

        let mut sub = store
            .observe(&path("comments/p"), &Query::ordered_by_child("timestamp"))
            .await
            .unwrap();

        let first = sub.next().await.unwrap().unwrap();
        assert_eq!(first.kind, EventKind::Added);
        assert_eq!(first.snapshot.key, "c1");

        store.set(&path("comments/p/c2"), json!({"timestamp": 2.0})).await.unwrap();
        store.set(&path("comments/other/c3"), json!({"timestamp": 3.0})).await.unwrap();
        store.set(&path("comments/p/c2"), json!({"timestamp": 2.5})).await.unwrap();
        store.remove(&path("comments/p/c1")).await.unwrap();

        let added = sub.next().await.unwrap().unwrap();
        assert_eq!((added.kind, added.snapshot.key.as_str()), (EventKind::Added, "c2"));
        let changed = sub.next().await.unwrap().unwrap();
        assert_eq!(changed.kind, EventKind::Changed);
        let removed = sub.next().await.unwrap().unwrap();
        assert_eq!((removed.kind, removed.snapshot.key.as_str()), (EventKind::Removed, "c1"));
    }

    #[tokio::test]
    async fn test_observe_respects_start_bound() {
        let store = MemoryStore::new();
        store.set(&path("feed/u/old"), json!({"timestamp": 1.0})).await.unwrap();

        let query = Query::ordered_by_child("timestamp").start_at(5.0, None);
        let mut sub = store.observe(&path("feed/u"), &query).await.unwrap();

        store.set(&path("feed/u/older"), json!({"timestamp": 2.0})).await.unwrap();
        store.set(&path("feed/u/new"), json!({"timestamp": 6.0})).await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(1), sub.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(event.snapshot.key, "new");
        assert!(sub.try_next().is_none());
    }

    #[tokio::test]
    async fn test_observe_delivers_removals_below_start_bound() {
        let store = MemoryStore::new();
        store.set(&path("feed/u/old"), json!({"timestamp": 1.0})).await.unwrap();
        store.set(&path("feed/u/new"), json!({"timestamp": 6.0})).await.unwrap();

        let query = Query::ordered_by_child("timestamp").start_at(5.0, None);
        let mut sub = store.observe(&path("feed/u"), &query).await.unwrap();
        let initial = sub.next().await.unwrap().unwrap();
        assert_eq!(initial.snapshot.key, "new");

        store.remove(&path("feed/u/old")).await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(1), sub.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(event.kind, EventKind::Removed);
        assert_eq!(event.snapshot.key, "old");
    }

    #[tokio::test]
    async fn test_fail_times_zero_injects_nothing() {
        let store = MemoryStore::new();
        store.fail_times(FaultOp::Set, path("users"), 0);
        store.set(&path("users/u1"), json!({"username": "a"})).await.unwrap();
        store.set(&path("users/u2"), json!({"username": "b"})).await.unwrap();

        store.fail_times(FaultOp::Set, path("users"), 1);
        assert!(store.set(&path("users/u3"), json!(1)).await.is_err());
        assert!(store.set(&path("users/u3"), json!(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_set_null_removes() {
        let store = MemoryStore::new();
        store.set(&path("bookmarks/v/p"), json!({"timestamp": 1.0})).await.unwrap();
        store.set(&path("bookmarks/v/p"), Value::Null).await.unwrap();
        assert!(!store.contains(&path("bookmarks/v/p")));
    }
}
