use super::{key_to_id, Paths, PRESENT};
use crate::error::ServiceResult;
use doc_store::{Query, SharedStore, StorePath};
use serde_json::json;
use uuid::Uuid;

/// Repository for the two mirrored follow indexes.
///
/// `following/{viewer}/{target}` and `followers/{target}/{viewer}` are
/// written independently; keeping them in agreement is the caller's job.
#[derive(Clone)]
pub struct FollowRepository {
    store: SharedStore,
}

impl FollowRepository {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn following_exists(&self, viewer_id: Uuid, target_id: Uuid) -> ServiceResult<bool> {
        Ok(self
            .store
            .exists(&Paths::following_edge(viewer_id, target_id))
            .await?)
    }

    pub async fn follower_exists(&self, target_id: Uuid, viewer_id: Uuid) -> ServiceResult<bool> {
        Ok(self
            .store
            .exists(&Paths::follower_edge(target_id, viewer_id))
            .await?)
    }

    pub async fn put_following(&self, viewer_id: Uuid, target_id: Uuid) -> ServiceResult<()> {
        self.put(&Paths::following_edge(viewer_id, target_id)).await
    }

    pub async fn put_follower(&self, target_id: Uuid, viewer_id: Uuid) -> ServiceResult<()> {
        self.put(&Paths::follower_edge(target_id, viewer_id)).await
    }

    pub async fn delete_following(&self, viewer_id: Uuid, target_id: Uuid) -> ServiceResult<()> {
        self.store
            .remove(&Paths::following_edge(viewer_id, target_id))
            .await?;
        Ok(())
    }

    pub async fn delete_follower(&self, target_id: Uuid, viewer_id: Uuid) -> ServiceResult<()> {
        self.store
            .remove(&Paths::follower_edge(target_id, viewer_id))
            .await?;
        Ok(())
    }

    /// Ids following `user_id`, in key order
    pub async fn follower_ids(&self, user_id: Uuid) -> ServiceResult<Vec<Uuid>> {
        self.ids_under(&Paths::followers(user_id)).await
    }

    /// Ids `user_id` follows, in key order
    pub async fn following_ids(&self, user_id: Uuid) -> ServiceResult<Vec<Uuid>> {
        self.ids_under(&Paths::following(user_id)).await
    }

    pub async fn follower_count(&self, user_id: Uuid) -> ServiceResult<usize> {
        Ok(self.follower_ids(user_id).await?.len())
    }

    pub async fn following_count(&self, user_id: Uuid) -> ServiceResult<usize> {
        Ok(self.following_ids(user_id).await?.len())
    }

    async fn put(&self, path: &StorePath) -> ServiceResult<()> {
        self.store.set(path, json!(PRESENT)).await?;
        Ok(())
    }

    async fn ids_under(&self, path: &StorePath) -> ServiceResult<Vec<Uuid>> {
        let snapshots = self.store.query(path, &Query::ordered_by_key()).await?;
        snapshots.iter().map(|s| key_to_id(&s.key)).collect()
    }
}
