use crate::domain::models::{validate_comment, Comment};
use crate::error::ServiceResult;
use crate::pagination::{CursorQuery, LiveUpdates, Page, PageCursor};
use crate::repository::comments::comment_from_snapshot;
use crate::repository::{CommentRepository, Paths};
use doc_store::{Query, SharedStore};
use tracing::debug;
use uuid::Uuid;

/// Comment threads, oldest first
#[derive(Clone)]
pub struct CommentService {
    store: SharedStore,
    comments: CommentRepository,
    page_size: usize,
}

impl CommentService {
    pub fn new(store: SharedStore, comments: CommentRepository, page_size: usize) -> Self {
        Self {
            store,
            comments,
            page_size,
        }
    }

    pub async fn add_comment(
        &self,
        sender_id: Uuid,
        post_owner_id: Uuid,
        post_id: Uuid,
        caption: String,
    ) -> ServiceResult<Comment> {
        validate_comment(&caption)?;
        let comment = self
            .comments
            .create(post_owner_id, post_id, sender_id, caption)
            .await?;
        debug!(post_id = %post_id, comment_id = %comment.id, "Comment added");
        Ok(comment)
    }

    pub async fn fetch_comments_page(
        &self,
        post_owner_id: Uuid,
        post_id: Uuid,
        cursor: &PageCursor,
    ) -> ServiceResult<Page<Comment>> {
        CursorQuery::oldest_first(Paths::comments(post_owner_id, post_id), self.page_size)
            .next_page(self.store.as_ref(), cursor)
            .await?
            .try_map(|s| comment_from_snapshot(&s))
    }

    pub async fn comment_count(&self, post_owner_id: Uuid, post_id: Uuid) -> ServiceResult<usize> {
        self.comments.count(post_owner_id, post_id).await
    }

    /// Listen for comments at or after `since`
    pub async fn observe_comments(
        &self,
        post_owner_id: Uuid,
        post_id: Uuid,
        since: Option<f64>,
    ) -> ServiceResult<LiveUpdates<Comment>> {
        let mut query = Query::ordered_by_child("timestamp");
        if let Some(since) = since {
            query = query.start_at(since, None);
        }
        let subscription = self
            .store
            .observe(&Paths::comments(post_owner_id, post_id), &query).await?;
        Ok(LiveUpdates::new(subscription, comment_from_snapshot))
    }
}
