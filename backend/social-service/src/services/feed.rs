//! Home feed, post history and bookmark listings

use super::barrier::join_all_first_error;
use super::viewer_state::ViewerStateComposer;
use crate::domain::models::{Bookmark, FeedEntry, Post, ViewerPost};
use crate::error::ServiceResult;
use crate::pagination::{CursorQuery, LiveUpdates, Page, PageCursor};
use crate::repository::bookmarks::bookmark_from_snapshot;
use crate::repository::feed::feed_entry_from_snapshot;
use crate::repository::posts::post_from_snapshot;
use crate::repository::{Paths, PostRepository};
use doc_store::{Query, SharedStore};
use tracing::debug;
use uuid::Uuid;

#[derive(Clone)]
pub struct FeedService {
    store: SharedStore,
    posts: PostRepository,
    composer: ViewerStateComposer,
    feed_page_size: usize,
    posts_page_size: usize,
}

impl FeedService {
    pub fn new(
        store: SharedStore,
        posts: PostRepository,
        composer: ViewerStateComposer,
        feed_page_size: usize,
        posts_page_size: usize,
    ) -> Self {
        Self {
            store,
            posts,
            composer,
            feed_page_size,
            posts_page_size,
        }
    }

    fn feed_query(&self, viewer_id: Uuid) -> CursorQuery {
        CursorQuery::newest_first(Paths::feed(viewer_id), self.feed_page_size)
    }

    /// Newest page of the viewer's home feed
    pub async fn fetch_feed_page(&self, viewer_id: Uuid) -> ServiceResult<Page<ViewerPost>> {
        let page = self
            .feed_query(viewer_id)
            .first_page(self.store.as_ref())
            .await?
            .try_map(|s| feed_entry_from_snapshot(&s))?;
        self.resolve_page(viewer_id, page).await
    }

    /// Home feed page after `cursor`
    pub async fn fetch_next_feed_page(
        &self,
        viewer_id: Uuid,
        cursor: &PageCursor,
    ) -> ServiceResult<Page<ViewerPost>> {
        let page = self
            .feed_query(viewer_id)
            .next_page(self.store.as_ref(), cursor)
            .await?
            .try_map(|s| feed_entry_from_snapshot(&s))?;
        self.resolve_page(viewer_id, page).await
    }

    /// Listen for feed entries at or after `since`
    pub async fn observe_feed(
        &self,
        viewer_id: Uuid,
        since: Option<f64>,
    ) -> ServiceResult<LiveUpdates<FeedEntry>> {
        let mut query = Query::ordered_by_child("timestamp");
        if let Some(since) = since {
            query = query.start_at(since, None);
        }
        let subscription = self.store.observe(&Paths::feed(viewer_id), &query).await?;
        debug!(viewer_id = %viewer_id, since = ?since, "Feed listener registered");
        Ok(LiveUpdates::new(subscription, feed_entry_from_snapshot))
    }

    /// Posts by `author_id`, newest first
    pub async fn fetch_user_posts_page(
        &self,
        viewer_id: Uuid,
        author_id: Uuid,
        cursor: &PageCursor,
    ) -> ServiceResult<Page<ViewerPost>> {
        let page = CursorQuery::newest_first(Paths::user_posts(author_id), self.posts_page_size)
            .next_page(self.store.as_ref(), cursor)
            .await?
            .try_map(|s| post_from_snapshot(&s))?;

        let items = self.composer.compose_page(viewer_id, page.items).await?;
        Ok(Page {
            items,
            cursor: page.cursor,
        })
    }

    /// The viewer's bookmarks, most recently saved first
    pub async fn fetch_bookmarks_page(
        &self,
        viewer_id: Uuid,
        cursor: &PageCursor,
    ) -> ServiceResult<Page<ViewerPost>> {
        let page = CursorQuery::newest_first(Paths::bookmarks(viewer_id), self.posts_page_size)
            .next_page(self.store.as_ref(), cursor)
            .await?
            .try_map(|s| bookmark_from_snapshot(&s))?;

        let keys = page
            .items
            .iter()
            .map(|b: &Bookmark| (b.post_owner_id, b.post_id))
            .collect();
        let posts = self.fetch_posts(keys).await?;
        let items = self.composer.compose_page(viewer_id, posts).await?;
        Ok(Page {
            items,
            cursor: page.cursor,
        })
    }

    /// Resolve feed pointers into composed posts, keeping pointer order
    pub async fn resolve_entries(
        &self,
        viewer_id: Uuid,
        entries: &[FeedEntry],
    ) -> ServiceResult<Vec<ViewerPost>> {
        let keys = entries
            .iter()
            .map(|e| (e.post_owner_id, e.post_id))
            .collect();
        let posts = self.fetch_posts(keys).await?;
        self.composer.compose_page(viewer_id, posts).await
    }

    async fn resolve_page(
        &self,
        viewer_id: Uuid,
        page: Page<FeedEntry>,
    ) -> ServiceResult<Page<ViewerPost>> {
        let items = self.resolve_entries(viewer_id, &page.items).await?;
        Ok(Page {
            items,
            cursor: page.cursor,
        })
    }

    /// Fetch posts by (owner, id); posts that no longer exist are skipped
    async fn fetch_posts(&self, keys: Vec<(Uuid, Uuid)>) -> ServiceResult<Vec<Post>> {
        let lookups: Vec<_> = keys
            .into_iter()
            .map(|(owner_id, post_id)| {
                let posts = self.posts.clone();
                async move { posts.fetch(owner_id, post_id).await }
            })
            .collect();
        let fetched = join_all_first_error(lookups).await?;
        Ok(fetched.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::NewPost;
    use crate::repository::{BookmarkRepository, LikeRepository};
    use doc_store::MemoryStore;
    use std::sync::Arc;

    fn service(store: SharedStore) -> (FeedService, PostRepository) {
        let posts = PostRepository::new(store.clone());
        let composer = ViewerStateComposer::new(
            posts.clone(),
            LikeRepository::new(store.clone()),
            BookmarkRepository::new(store.clone()),
        );
        (FeedService::new(store, posts.clone(), composer, 2, 2), posts)
    }

    #[tokio::test]
    async fn test_resolve_entries_on_spawned_task_skips_missing_posts() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let (feed, posts) = service(store);
        let author = Uuid::new_v4();
        let viewer = Uuid::new_v4();

        let post = posts
            .create(
                author,
                NewPost {
                    image_url: "img://f".to_string(),
                    aspect_ratio: 1.0,
                    caption: String::new(),
                },
            )
            .await
            .unwrap();
        let ghost = FeedEntry {
            post_id: Uuid::new_v4(),
            post_owner_id: author,
            timestamp: post.timestamp + 1.0,
        };
        let entries = vec![ghost, post.feed_entry()];

        let resolved = tokio::spawn(async move { feed.resolve_entries(viewer, &entries).await })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].post.id, post.id);
        assert_eq!(resolved[0].like_count, 0);
    }
}
