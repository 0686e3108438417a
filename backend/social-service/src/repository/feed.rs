use super::{encode, snapshot_id, Paths};
use crate::domain::models::FeedEntry;
use crate::error::ServiceResult;
use doc_store::{SharedStore, Snapshot};
use uuid::Uuid;

/// Repository for per-recipient feed pointers
#[derive(Clone)]
pub struct FeedRepository {
    store: SharedStore,
}

impl FeedRepository {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Write a pointer keyed by post id; rewriting the same entry is harmless
    pub async fn insert(&self, recipient_id: Uuid, entry: &FeedEntry) -> ServiceResult<()> {
        self.store
            .set(&Paths::feed_entry(recipient_id, entry.post_id), encode(entry)?)
            .await?;
        Ok(())
    }

    pub async fn remove(&self, recipient_id: Uuid, post_id: Uuid) -> ServiceResult<()> {
        self.store
            .remove(&Paths::feed_entry(recipient_id, post_id))
            .await?;
        Ok(())
    }

    pub async fn contains(&self, recipient_id: Uuid, post_id: Uuid) -> ServiceResult<bool> {
        Ok(self
            .store
            .exists(&Paths::feed_entry(recipient_id, post_id))
            .await?)
    }
}

pub(crate) fn feed_entry_from_snapshot(snapshot: &Snapshot) -> ServiceResult<FeedEntry> {
    let mut entry: FeedEntry = snapshot.decode()?;
    entry.post_id = snapshot_id(snapshot)?;
    Ok(entry)
}
