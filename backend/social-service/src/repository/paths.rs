//! Store path schema
//!
//! Every repository builds its paths here so all collections keep one
//! fixed top-level segment.
//! Format: {collection}/{partition}[/{partition}]/{key}

use doc_store::StorePath;
use uuid::Uuid;

pub const USERS: &str = "users";
pub const POSTS: &str = "posts";
pub const FEED: &str = "feed";
pub const FOLLOWING: &str = "following";
pub const FOLLOWERS: &str = "followers";
pub const LIKES: &str = "likes";
pub const BOOKMARKS: &str = "bookmarks";
pub const COMMENTS: &str = "comments";

/// Path builder
pub struct Paths;

impl Paths {
    // ============= Users =============

    /// Format: users
    pub fn users() -> StorePath {
        StorePath::collection(USERS)
    }

    /// Format: users/{user_id}
    pub fn user(user_id: Uuid) -> StorePath {
        Self::users().child(user_id)
    }

    // ============= Posts =============

    /// Format: posts/{owner_id}
    pub fn user_posts(owner_id: Uuid) -> StorePath {
        StorePath::collection(POSTS).child(owner_id)
    }

    /// Format: posts/{owner_id}/{post_id}
    pub fn post(owner_id: Uuid, post_id: Uuid) -> StorePath {
        Self::user_posts(owner_id).child(post_id)
    }

    // ============= Feed =============

    /// Format: feed/{recipient_id}
    pub fn feed(recipient_id: Uuid) -> StorePath {
        StorePath::collection(FEED).child(recipient_id)
    }

    /// Format: feed/{recipient_id}/{post_id}
    pub fn feed_entry(recipient_id: Uuid, post_id: Uuid) -> StorePath {
        Self::feed(recipient_id).child(post_id)
    }

    // ============= Graph =============

    /// Format: following/{user_id}
    pub fn following(user_id: Uuid) -> StorePath {
        StorePath::collection(FOLLOWING).child(user_id)
    }

    /// Format: following/{viewer_id}/{target_id}
    pub fn following_edge(viewer_id: Uuid, target_id: Uuid) -> StorePath {
        Self::following(viewer_id).child(target_id)
    }

    /// Format: followers/{user_id}
    pub fn followers(user_id: Uuid) -> StorePath {
        StorePath::collection(FOLLOWERS).child(user_id)
    }

    /// Format: followers/{target_id}/{viewer_id}
    pub fn follower_edge(target_id: Uuid, viewer_id: Uuid) -> StorePath {
        Self::followers(target_id).child(viewer_id)
    }

    // ============= Interactions =============

    /// Format: likes/{post_owner_id}/{post_id}
    pub fn post_likes(post_owner_id: Uuid, post_id: Uuid) -> StorePath {
        StorePath::collection(LIKES).child(post_owner_id).child(post_id)
    }

    /// Format: likes/{post_owner_id}/{post_id}/{viewer_id}
    pub fn like(post_owner_id: Uuid, post_id: Uuid, viewer_id: Uuid) -> StorePath {
        Self::post_likes(post_owner_id, post_id).child(viewer_id)
    }

    /// Format: bookmarks/{viewer_id}
    pub fn bookmarks(viewer_id: Uuid) -> StorePath {
        StorePath::collection(BOOKMARKS).child(viewer_id)
    }

    /// Format: bookmarks/{viewer_id}/{post_id}
    pub fn bookmark(viewer_id: Uuid, post_id: Uuid) -> StorePath {
        Self::bookmarks(viewer_id).child(post_id)
    }

    /// Format: comments/{post_owner_id}/{post_id}
    pub fn comments(post_owner_id: Uuid, post_id: Uuid) -> StorePath {
        StorePath::collection(COMMENTS).child(post_owner_id).child(post_id)
    }

    /// Format: comments/{post_owner_id}/{post_id}/{comment_id}
    pub fn comment(post_owner_id: Uuid, post_id: Uuid, comment_id: Uuid) -> StorePath {
        Self::comments(post_owner_id, post_id).child(comment_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_entry_path() {
        let user_id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let post_id = Uuid::parse_str("660e8400-e29b-41d4-a716-446655440001").unwrap();
        assert_eq!(
            Paths::feed_entry(user_id, post_id).to_string(),
            "feed/550e8400-e29b-41d4-a716-446655440000/660e8400-e29b-41d4-a716-446655440001"
        );
    }

    #[test]
    fn test_follow_edges_are_mirrored() {
        let viewer = Uuid::new_v4();
        let target = Uuid::new_v4();
        let following = Paths::following_edge(viewer, target);
        let follower = Paths::follower_edge(target, viewer);

        assert_eq!(following.collection_name(), FOLLOWING);
        assert_eq!(follower.collection_name(), FOLLOWERS);
        assert_eq!(following.key(), target.to_string());
        assert_eq!(follower.key(), viewer.to_string());
    }

    #[test]
    fn test_like_path_nests_under_post() {
        let owner = Uuid::new_v4();
        let post = Uuid::new_v4();
        let viewer = Uuid::new_v4();
        assert!(Paths::like(owner, post, viewer).is_child_of(&Paths::post_likes(owner, post)));
    }

    #[test]
    fn test_comments_nest_under_post_owner() {
        let owner = Uuid::new_v4();
        let post = Uuid::new_v4();
        let thread = Paths::comments(owner, post);

        assert_eq!(thread.collection_name(), COMMENTS);
        assert_eq!(thread.to_string(), format!("comments/{}/{}", owner, post));
        assert!(Paths::comment(owner, post, Uuid::new_v4()).is_child_of(&thread));
    }
}
