use super::{decode_at, encode, snapshot_id, Paths};
use crate::domain::models::Bookmark;
use crate::error::ServiceResult;
use doc_store::{SharedStore, Snapshot};
use uuid::Uuid;

/// Repository for a viewer's saved posts
#[derive(Clone)]
pub struct BookmarkRepository {
    store: SharedStore,
}

impl BookmarkRepository {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn exists(&self, viewer_id: Uuid, post_id: Uuid) -> ServiceResult<bool> {
        Ok(self.store.exists(&Paths::bookmark(viewer_id, post_id)).await?)
    }

    pub async fn add(&self, viewer_id: Uuid, bookmark: &Bookmark) -> ServiceResult<()> {
        self.store
            .set(&Paths::bookmark(viewer_id, bookmark.post_id), encode(bookmark)?)
            .await?;
        Ok(())
    }

    pub async fn remove(&self, viewer_id: Uuid, post_id: Uuid) -> ServiceResult<()> {
        self.store.remove(&Paths::bookmark(viewer_id, post_id)).await?;
        Ok(())
    }

    pub async fn fetch(&self, viewer_id: Uuid, post_id: Uuid) -> ServiceResult<Option<Bookmark>> {
        let path = Paths::bookmark(viewer_id, post_id);
        match self.store.get(&path).await? {
            Some(value) => {
                let mut bookmark: Bookmark = decode_at(&path, value)?;
                bookmark.post_id = post_id;
                Ok(Some(bookmark))
            }
            None => Ok(None),
        }
    }
}

pub(crate) fn bookmark_from_snapshot(snapshot: &Snapshot) -> ServiceResult<Bookmark> {
    let mut bookmark: Bookmark = snapshot.decode()?;
    bookmark.post_id = snapshot_id(snapshot)?;
    Ok(bookmark)
}
