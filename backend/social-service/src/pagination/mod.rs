//! Cursor pagination over ordered store partitions
//!
//! Pages are fetched with an inclusive bound at the previous page's
//! boundary, one extra item is requested, and the boundary item is dropped
//! by identity. An empty page after the drop exhausts the cursor; an
//! exhausted cursor never touches the store again.

pub mod live;

pub use live::{LiveChange, LiveTimeline, LiveUpdates, TimelineItem};

use crate::error::{ServiceError, ServiceResult};
use crate::metrics::FeedMetrics;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use doc_store::{DocumentStore, OrderBy, OrderValue, Query, Snapshot, StorePath};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Order items are delivered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Newest first; feeds, post history and bookmarks
    Descending,
    /// Oldest or lowest key first; comments and follow lists
    Ascending,
}

/// Last item delivered: its ordering value and its key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub value: OrderValue,
    pub key: String,
}

/// Opaque paging position
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageCursor {
    boundary: Option<Boundary>,
    exhausted: bool,
}

impl PageCursor {
    /// A cursor that has not loaded anything yet
    pub fn start() -> Self {
        Self::default()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// URL-safe token for handing the cursor across a boundary
    pub fn encode(&self) -> ServiceResult<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|e| ServiceError::InvalidCursor(format!("encode failed: {}", e)))?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn decode(token: &str) -> ServiceResult<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| ServiceError::InvalidCursor(format!("invalid base64: {}", e)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ServiceError::InvalidCursor(format!("invalid payload: {}", e)))
    }
}

/// One page of items plus the cursor for the next one
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub cursor: PageCursor,
}

impl<T> Page<T> {
    pub fn empty(cursor: PageCursor) -> Self {
        Self {
            items: Vec::new(),
            cursor,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn try_map<U, F>(self, f: F) -> ServiceResult<Page<U>>
    where
        F: FnMut(T) -> ServiceResult<U>,
    {
        Ok(Page {
            items: self.items.into_iter().map(f).collect::<ServiceResult<_>>()?,
            cursor: self.cursor,
        })
    }
}

/// Paging definition for one partition
#[derive(Debug, Clone)]
pub struct CursorQuery {
    path: StorePath,
    order_by: OrderBy,
    direction: Direction,
    page_size: usize,
}

impl CursorQuery {
    pub fn new(path: StorePath, order_by: OrderBy, direction: Direction, page_size: usize) -> Self {
        Self {
            path,
            order_by,
            direction,
            page_size: page_size.max(1),
        }
    }

    /// Newest-first paging on the `timestamp` field
    pub fn newest_first(path: StorePath, page_size: usize) -> Self {
        Self::new(
            path,
            OrderBy::Child("timestamp".to_string()),
            Direction::Descending,
            page_size,
        )
    }

    /// Oldest-first paging on the `timestamp` field
    pub fn oldest_first(path: StorePath, page_size: usize) -> Self {
        Self::new(
            path,
            OrderBy::Child("timestamp".to_string()),
            Direction::Ascending,
            page_size,
        )
    }

    /// Ascending paging on the child key
    pub fn by_key(path: StorePath, page_size: usize) -> Self {
        Self::new(path, OrderBy::Key, Direction::Ascending, page_size)
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    fn base_query(&self) -> Query {
        match &self.order_by {
            OrderBy::Key => Query::ordered_by_key(),
            OrderBy::Child(field) => Query::ordered_by_child(field.clone()),
        }
    }

    fn limited(&self, query: Query, n: usize) -> Query {
        match self.direction {
            Direction::Descending => query.limit_to_last(n),
            Direction::Ascending => query.limit_to_first(n),
        }
    }

    /// Store results come back ascending; flip them for newest-first paging
    fn in_delivery_order(&self, mut snapshots: Vec<Snapshot>) -> Vec<Snapshot> {
        if self.direction == Direction::Descending {
            snapshots.reverse();
        }
        snapshots
    }

    fn cursor_after(&self, query: &Query, items: &[Snapshot]) -> PageCursor {
        PageCursor {
            boundary: items.last().map(|last| Boundary {
                value: query.order_value(last),
                key: last.key.clone(),
            }),
            exhausted: items.is_empty(),
        }
    }

    pub async fn first_page(&self, store: &dyn DocumentStore) -> ServiceResult<Page<Snapshot>> {
        let query = self.limited(self.base_query(), self.page_size);
        let items = self.in_delivery_order(store.query(&self.path, &query).await?);

        FeedMetrics::new().record_page(self.path.collection_name());
        debug!(path = %self.path, count = items.len(), "Served first page");
        Ok(Page {
            cursor: self.cursor_after(&query, &items),
            items,
        })
    }

    /// Page following `cursor`.
    ///
    /// A fresh cursor loads the first page; an exhausted one returns an
    /// empty page without querying.
    pub async fn next_page(
        &self,
        store: &dyn DocumentStore,
        cursor: &PageCursor,
    ) -> ServiceResult<Page<Snapshot>> {
        if cursor.exhausted {
            return Ok(Page::empty(cursor.clone()));
        }
        let Some(boundary) = &cursor.boundary else {
            return self.first_page(store).await;
        };

        let bounded = match self.direction {
            Direction::Descending => self
                .base_query()
                .end_at(boundary.value.clone(), Some(boundary.key.clone())),
            Direction::Ascending => self
                .base_query()
                .start_at(boundary.value.clone(), Some(boundary.key.clone())),
        };
        let query = self.limited(bounded, self.page_size + 1);
        let mut items = self.in_delivery_order(store.query(&self.path, &query).await?);

        match items.iter().position(|s| s.key == boundary.key) {
            Some(index) => {
                items.remove(index);
            }
            None => items.truncate(self.page_size),
        }

        FeedMetrics::new().record_page(self.path.collection_name());
        debug!(path = %self.path, count = items.len(), "Served next page");

        if items.is_empty() {
            return Ok(Page::empty(PageCursor {
                boundary: cursor.boundary.clone(),
                exhausted: true,
            }));
        }
        Ok(Page {
            cursor: self.cursor_after(&query, &items),
            items,
        })
    }
}
