#![allow(dead_code)]

use doc_store::{DocumentStore, MemoryStore, SharedStore};
use serde_json::json;
use social_service::domain::{NewPost, NewUser, Post};
use social_service::repository::Paths;
use social_service::{FeedConfig, SocialClient, StaticIdentity};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub fn shared(store: &MemoryStore) -> SharedStore {
    Arc::new(store.clone())
}

/// Client signed in as `user_id`
pub fn client_for(store: &MemoryStore, user_id: Uuid) -> SocialClient {
    client_with_config(store, user_id, &FeedConfig::default())
}

pub fn client_with_config(store: &MemoryStore, user_id: Uuid, config: &FeedConfig) -> SocialClient {
    SocialClient::new(
        shared(store),
        Arc::new(StaticIdentity::signed_in(user_id)),
        config,
    )
}

/// Create a profile and return the user's id and client
pub async fn sign_up(store: &MemoryStore, username: &str) -> (Uuid, SocialClient) {
    let user_id = Uuid::new_v4();
    let client = client_for(store, user_id);
    client
        .create_profile(NewUser {
            username: username.to_string(),
            ..Default::default()
        })
        .await
        .expect("profile created");
    (user_id, client)
}

pub fn new_post(caption: &str) -> NewPost {
    NewPost {
        image_url: format!("img://{}", caption),
        aspect_ratio: 1.0,
        caption: caption.to_string(),
    }
}

/// Write a post with a fixed id and timestamp, bypassing fan-out
pub async fn seed_post(store: &MemoryStore, owner_id: Uuid, post_id: Uuid, timestamp: f64) -> Post {
    let post = Post {
        id: post_id,
        owner_id,
        image_url: format!("img://{}", post_id),
        aspect_ratio: 1.0,
        caption: String::new(),
        timestamp,
    };
    store
        .set(
            &Paths::post(owner_id, post_id),
            serde_json::to_value(&post).unwrap(),
        )
        .await
        .unwrap();
    post
}

/// Write a feed pointer directly
pub async fn seed_feed_entry(store: &MemoryStore, recipient_id: Uuid, post: &Post) {
    store
        .set(
            &Paths::feed_entry(recipient_id, post.id),
            json!({ "post_owner_id": post.owner_id, "timestamp": post.timestamp }),
        )
        .await
        .unwrap();
}

/// Poll `check` until it holds or a second passes
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
