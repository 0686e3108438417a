mod common;

use common::{client_for, sign_up};
use doc_store::MemoryStore;
use social_service::domain::{NewUser, ProfileUpdate};
use social_service::ServiceError;
use uuid::Uuid;

#[tokio::test]
async fn test_username_taken_ignores_case() {
    let store = MemoryStore::new();
    sign_up(&store, "Alice").await;

    let client = client_for(&store, Uuid::new_v4());
    let err = client
        .create_profile(NewUser {
            username: "aLiCe".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::UsernameTaken(ref name) if name == "aLiCe"));
}

#[tokio::test]
async fn test_lookup_by_username_and_profile_edit() {
    let store = MemoryStore::new();
    let (alice, alice_client) = sign_up(&store, "alice").await;
    let (_bob, bob_client) = sign_up(&store, "bob").await;
    bob_client.follow(alice).await.unwrap();

    let found = bob_client
        .fetch_user_by_username("ALICE")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.user.id, alice);
    assert!(found.is_following);
    assert!(!found.is_current_user);

    let updated = alice_client
        .update_profile(ProfileUpdate {
            bio: Some("hello there".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(updated.bio.as_deref(), Some("hello there"));
    assert_eq!(updated.username, "alice");

    let me = alice_client.fetch_user(alice).await.unwrap().unwrap();
    assert!(me.is_current_user);
    assert_eq!(me.user.bio.as_deref(), Some("hello there"));
}

#[tokio::test]
async fn test_invalid_username_rejected() {
    let store = MemoryStore::new();
    let client = client_for(&store, Uuid::new_v4());
    let err = client
        .create_profile(NewUser {
            username: "no spaces".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}
