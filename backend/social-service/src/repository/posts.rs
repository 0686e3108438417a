use super::{decode_at, encode, snapshot_id, Paths};
use crate::domain::models::{now_timestamp, NewPost, Post};
use crate::error::ServiceResult;
use doc_store::{Query, SharedStore, Snapshot};
use uuid::Uuid;

/// Repository for canonical post records
#[derive(Clone)]
pub struct PostRepository {
    store: SharedStore,
}

impl PostRepository {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Create a post under its author with a store-generated id
    pub async fn create(&self, owner_id: Uuid, new_post: NewPost) -> ServiceResult<Post> {
        let post = Post {
            id: self.store.generate_key(),
            owner_id,
            image_url: new_post.image_url,
            aspect_ratio: new_post.aspect_ratio,
            caption: new_post.caption,
            timestamp: now_timestamp(),
        };
        self.store
            .set(&Paths::post(owner_id, post.id), encode(&post)?)
            .await?;
        Ok(post)
    }

    pub async fn fetch(&self, owner_id: Uuid, post_id: Uuid) -> ServiceResult<Option<Post>> {
        let path = Paths::post(owner_id, post_id);
        match self.store.get(&path).await? {
            Some(value) => {
                let mut post: Post = decode_at(&path, value)?;
                post.id = post_id;
                Ok(Some(post))
            }
            None => Ok(None),
        }
    }

    /// Every post by `owner_id`, oldest first
    pub async fn list_all(&self, owner_id: Uuid) -> ServiceResult<Vec<Post>> {
        let snapshots = self
            .store
            .query(
                &Paths::user_posts(owner_id),
                &Query::ordered_by_child("timestamp"),
            )
            .await?;
        snapshots.iter().map(post_from_snapshot).collect()
    }

    pub async fn count(&self, owner_id: Uuid) -> ServiceResult<usize> {
        let snapshots = self
            .store
            .query(&Paths::user_posts(owner_id), &Query::ordered_by_key())
            .await?;
        Ok(snapshots.len())
    }
}

pub(crate) fn post_from_snapshot(snapshot: &Snapshot) -> ServiceResult<Post> {
    let mut post: Post = snapshot.decode()?;
    post.id = snapshot_id(snapshot)?;
    Ok(post)
}
