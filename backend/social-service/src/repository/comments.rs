use super::{encode, snapshot_id, Paths};
use crate::domain::models::{now_timestamp, Comment};
use crate::error::ServiceResult;
use doc_store::{Query, SharedStore, Snapshot};
use uuid::Uuid;

/// Repository for comments, partitioned by (post owner, post)
#[derive(Clone)]
pub struct CommentRepository {
    store: SharedStore,
}

impl CommentRepository {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Create a comment with a store-generated id
    pub async fn create(
        &self,
        post_owner_id: Uuid,
        post_id: Uuid,
        sender_id: Uuid,
        caption: String,
    ) -> ServiceResult<Comment> {
        let comment = Comment {
            id: self.store.generate_key(),
            sender_id,
            caption,
            timestamp: now_timestamp(),
        };
        self.store
            .set(&Paths::comment(post_owner_id, post_id, comment.id), encode(&comment)?)
            .await?;
        Ok(comment)
    }

    pub async fn count(&self, post_owner_id: Uuid, post_id: Uuid) -> ServiceResult<usize> {
        let comments = self
            .store
            .query(&Paths::comments(post_owner_id, post_id), &Query::ordered_by_key())
            .await?;
        Ok(comments.len())
    }
}

pub(crate) fn comment_from_snapshot(snapshot: &Snapshot) -> ServiceResult<Comment> {
    let mut comment: Comment = snapshot.decode()?;
    comment.id = snapshot_id(snapshot)?;
    Ok(comment)
}
