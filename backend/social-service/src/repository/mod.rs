//! Store-backed repositories, one per collection.
//!
//! Repositories own path construction and document decoding; they never
//! coordinate writes across collections.

pub mod bookmarks;
pub mod comments;
pub mod feed;
pub mod follows;
pub mod likes;
pub mod paths;
pub mod posts;
pub mod users;

pub use bookmarks::BookmarkRepository;
pub use comments::CommentRepository;
pub use feed::FeedRepository;
pub use follows::FollowRepository;
pub use likes::LikeRepository;
pub use paths::Paths;
pub use posts::PostRepository;
pub use users::UserRepository;

use crate::error::ServiceResult;
use doc_store::{Snapshot, StoreError, StorePath};
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

/// Marker value for existence-only records
pub(crate) const PRESENT: i64 = 1;

/// Parse a child key written by `generate_key` or a user id
pub(crate) fn key_to_id(key: &str) -> ServiceResult<Uuid> {
    Uuid::parse_str(key).map_err(|e| {
        StoreError::Decode {
            path: key.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

pub(crate) fn snapshot_id(snapshot: &Snapshot) -> ServiceResult<Uuid> {
    key_to_id(&snapshot.key)
}

/// Decode a document read from `path`
pub(crate) fn decode_at<T: DeserializeOwned>(path: &StorePath, value: Value) -> ServiceResult<T> {
    serde_json::from_value(value).map_err(|e| {
        StoreError::Decode {
            path: path.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

pub(crate) fn encode<T: serde::Serialize>(doc: &T) -> ServiceResult<Value> {
    Ok(serde_json::to_value(doc).map_err(StoreError::from)?)
}
