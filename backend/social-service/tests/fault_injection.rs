mod common;

use common::{new_post, sign_up};
use doc_store::{FaultOp, MemoryStore};
use social_service::repository::Paths;
use tokio_test::assert_err;

#[tokio::test]
async fn test_failed_mirror_write_compensates_follow() {
    let store = MemoryStore::new();
    let (target, target_client) = sign_up(&store, "target").await;
    let (viewer, viewer_client) = sign_up(&store, "viewer").await;
    target_client.publish_post(new_post("p")).await.unwrap();

    store.fail_on(FaultOp::Set, Paths::follower_edge(target, viewer));
    let err = viewer_client.follow(target).await.unwrap_err();
    assert!(err.is_store_failure());

    assert!(!store.contains(&Paths::following_edge(viewer, target)));
    assert!(!store.contains(&Paths::follower_edge(target, viewer)));
    assert_eq!(store.child_count(&Paths::feed(viewer)), 0);

    store.clear_faults();
    assert!(viewer_client.follow(target).await.unwrap().created);
}

#[tokio::test]
async fn test_failed_first_follow_write_leaves_nothing() {
    let store = MemoryStore::new();
    let (target, _) = sign_up(&store, "target").await;
    let (viewer, viewer_client) = sign_up(&store, "viewer").await;

    store.fail_on(FaultOp::Set, Paths::following(viewer));
    assert_err!(viewer_client.follow(target).await);
    assert!(!store.contains(&Paths::following_edge(viewer, target)));
    assert!(!store.contains(&Paths::follower_edge(target, viewer)));
}

#[tokio::test]
async fn test_failed_following_removal_leaves_orphan_edge() {
    let store = MemoryStore::new();
    let (target, target_client) = sign_up(&store, "target").await;
    let (viewer, viewer_client) = sign_up(&store, "viewer").await;
    target_client.publish_post(new_post("p")).await.unwrap();
    viewer_client.follow(target).await.unwrap();

    store.fail_on(FaultOp::Remove, Paths::following_edge(viewer, target));
    assert_err!(viewer_client.unfollow(target).await);

    // Followers side is gone, following side stays, no compensation ran
    assert!(!store.contains(&Paths::follower_edge(target, viewer)));
    assert!(store.contains(&Paths::following_edge(viewer, target)));
    // Teardown never ran
    assert_eq!(store.child_count(&Paths::feed(viewer)), 1);
    assert!(viewer_client.is_following(target).await.unwrap());

    // The next follow repairs the mirror
    store.clear_faults();
    let outcome = viewer_client.follow(target).await.unwrap();
    assert!(outcome.repaired_mirror);
    assert!(!outcome.created);
    assert!(store.contains(&Paths::follower_edge(target, viewer)));
}

#[tokio::test]
async fn test_failed_followers_removal_keeps_both_sides() {
    let store = MemoryStore::new();
    let (target, _) = sign_up(&store, "target").await;
    let (viewer, viewer_client) = sign_up(&store, "viewer").await;
    viewer_client.follow(target).await.unwrap();

    store.fail_on(FaultOp::Remove, Paths::followers(target));
    assert_err!(viewer_client.unfollow(target).await);

    assert!(store.contains(&Paths::follower_edge(target, viewer)));
    assert!(store.contains(&Paths::following_edge(viewer, target)));
}

#[tokio::test]
async fn test_transport_failure_is_surfaced_verbatim() {
    let store = MemoryStore::new();
    let (_viewer, client) = sign_up(&store, "viewer").await;

    store.fail_times(FaultOp::Query, Paths::users(), 1);
    let err = client.fetch_user_by_username("anyone").await.unwrap_err();
    assert!(err.is_store_failure());

    // Not retried: the next call succeeds on its own
    assert!(client.fetch_user_by_username("anyone").await.unwrap().is_none());
}
