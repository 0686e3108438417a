use super::{Paths, PRESENT};
use crate::error::ServiceResult;
use doc_store::{Query, SharedStore};
use serde_json::json;
use uuid::Uuid;

/// Repository for like records, partitioned by post owner then post
#[derive(Clone)]
pub struct LikeRepository {
    store: SharedStore,
}

impl LikeRepository {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Check if user has liked a post
    pub async fn exists(&self, owner_id: Uuid, post_id: Uuid, viewer_id: Uuid) -> ServiceResult<bool> {
        Ok(self
            .store
            .exists(&Paths::like(owner_id, post_id, viewer_id))
            .await?)
    }

    pub async fn add(&self, owner_id: Uuid, post_id: Uuid, viewer_id: Uuid) -> ServiceResult<()> {
        self.store
            .set(&Paths::like(owner_id, post_id, viewer_id), json!(PRESENT))
            .await?;
        Ok(())
    }

    pub async fn remove(&self, owner_id: Uuid, post_id: Uuid, viewer_id: Uuid) -> ServiceResult<()> {
        self.store
            .remove(&Paths::like(owner_id, post_id, viewer_id))
            .await?;
        Ok(())
    }

    /// Like count, derived from the size of the post's like set
    pub async fn count(&self, owner_id: Uuid, post_id: Uuid) -> ServiceResult<usize> {
        let likes = self
            .store
            .query(&Paths::post_likes(owner_id, post_id), &Query::ordered_by_key())
            .await?;
        Ok(likes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_store::MemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_count_tracks_distinct_viewers() {
        let repo = LikeRepository::new(Arc::new(MemoryStore::new()));
        let (owner, post) = (Uuid::new_v4(), Uuid::new_v4());
        let (x, y) = (Uuid::new_v4(), Uuid::new_v4());

        repo.add(owner, post, x).await.unwrap();
        repo.add(owner, post, x).await.unwrap();
        repo.add(owner, post, y).await.unwrap();
        assert_eq!(repo.count(owner, post).await.unwrap(), 2);

        repo.remove(owner, post, x).await.unwrap();
        assert!(!repo.exists(owner, post, x).await.unwrap());
        assert_eq!(repo.count(owner, post).await.unwrap(), 1);
    }
}
