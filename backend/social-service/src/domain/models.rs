use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};

const MAX_USERNAME_LEN: usize = 30;
const MAX_CAPTION_LEN: usize = 2200;
const MAX_BIO_LEN: usize = 150;

/// Seconds since epoch with microsecond precision; the sole sort key of
/// posts, feed entries, bookmarks and comments.
pub fn now_timestamp() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// User profile stored at `users/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(skip)]
    pub id: Uuid,
    pub username: String,
    /// Lowercased username; the uniqueness index
    pub username_key: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Sign-up payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub avatar_url: Option<String>,
}

/// Partial profile edit; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub avatar_url: Option<String>,
}

pub fn validate_username(username: &str) -> ServiceResult<()> {
    if username.is_empty() || username.len() > MAX_USERNAME_LEN {
        return Err(ServiceError::InvalidInput(format!(
            "username must be 1-{} characters",
            MAX_USERNAME_LEN
        )));
    }
    let allowed = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if !allowed {
        return Err(ServiceError::InvalidInput(
            "username may only contain letters, digits, '_' and '.'".to_string(),
        ));
    }
    Ok(())
}

fn validate_bio(bio: Option<&str>) -> ServiceResult<()> {
    match bio {
        Some(bio) if bio.chars().count() > MAX_BIO_LEN => Err(ServiceError::InvalidInput(
            format!("bio must be at most {} characters", MAX_BIO_LEN),
        )),
        _ => Ok(()),
    }
}

impl NewUser {
    pub fn validate(&self) -> ServiceResult<()> {
        validate_username(&self.username)?;
        validate_bio(self.bio.as_deref())
    }

    pub fn into_user(self, id: Uuid) -> User {
        User {
            id,
            username_key: self.username.to_lowercase(),
            username: self.username,
            display_name: self.display_name,
            bio: self.bio,
            website: self.website,
            avatar_url: self.avatar_url,
        }
    }
}

impl ProfileUpdate {
    pub fn validate(&self) -> ServiceResult<()> {
        if let Some(username) = &self.username {
            validate_username(username)?;
        }
        validate_bio(self.bio.as_deref())
    }

    pub fn apply_to(self, user: &mut User) {
        if let Some(username) = self.username {
            user.username_key = username.to_lowercase();
            user.username = username;
        }
        if self.display_name.is_some() {
            user.display_name = self.display_name;
        }
        if self.bio.is_some() {
            user.bio = self.bio;
        }
        if self.website.is_some() {
            user.website = self.website;
        }
        if self.avatar_url.is_some() {
            user.avatar_url = self.avatar_url;
        }
    }
}

/// Canonical post stored at `posts/{owner_id}/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(skip)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub image_url: String,
    pub aspect_ratio: f64,
    #[serde(default)]
    pub caption: String,
    pub timestamp: f64,
}

impl Post {
    /// Pointer written into each recipient's feed
    pub fn feed_entry(&self) -> FeedEntry {
        FeedEntry {
            post_id: self.id,
            post_owner_id: self.owner_id,
            timestamp: self.timestamp,
        }
    }
}

/// Publish payload; the image itself is uploaded elsewhere
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPost {
    pub image_url: String,
    pub aspect_ratio: f64,
    #[serde(default)]
    pub caption: String,
}

impl NewPost {
    pub fn validate(&self) -> ServiceResult<()> {
        if self.image_url.trim().is_empty() {
            return Err(ServiceError::InvalidInput("image_url is required".to_string()));
        }
        if !self.aspect_ratio.is_finite() || self.aspect_ratio <= 0.0 {
            return Err(ServiceError::InvalidInput(
                "aspect_ratio must be a positive number".to_string(),
            ));
        }
        if self.caption.chars().count() > MAX_CAPTION_LEN {
            return Err(ServiceError::InvalidInput(format!(
                "caption must be at most {} characters",
                MAX_CAPTION_LEN
            )));
        }
        Ok(())
    }
}

pub fn validate_comment(caption: &str) -> ServiceResult<()> {
    if caption.trim().is_empty() {
        return Err(ServiceError::InvalidInput("comment is empty".to_string()));
    }
    if caption.chars().count() > MAX_CAPTION_LEN {
        return Err(ServiceError::InvalidInput(format!(
            "comment must be at most {} characters",
            MAX_CAPTION_LEN
        )));
    }
    Ok(())
}

/// Feed pointer stored at `feed/{recipient}/{post_id}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    #[serde(skip)]
    pub post_id: Uuid,
    pub post_owner_id: Uuid,
    pub timestamp: f64,
}

/// Bookmark stored at `bookmarks/{viewer}/{post_id}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    #[serde(skip)]
    pub post_id: Uuid,
    pub post_owner_id: Uuid,
    /// When the bookmark was made; the listing sort key
    pub timestamp: f64,
}

/// Comment stored at `comments/{post_id}/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(skip)]
    pub id: Uuid,
    pub sender_id: Uuid,
    pub caption: String,
    pub timestamp: f64,
}

/// A post with the viewer-relative state joined on
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerPost {
    pub post: Post,
    pub like_count: usize,
    pub is_liked: bool,
    pub is_bookmarked: bool,
}

/// A user with the viewer's relationship joined on
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerUser {
    pub user: User,
    pub is_following: bool,
    pub is_current_user: bool,
}

/// Profile counters, recomputed from the partitions on every read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub posts: usize,
    pub followers: usize,
    pub following: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowOutcome {
    /// A new edge was written
    pub created: bool,
    /// The edge existed but its `followers` mirror was missing and got rewritten
    pub repaired_mirror: bool,
    /// Feed entries copied from the target's history
    pub backfilled: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnfollowOutcome {
    pub removed: bool,
    /// Feed entries removed from the viewer's feed
    pub torn_down: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_validation() {
        assert!(validate_username("alice_01.x").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(31)).is_err());
    }

    #[test]
    fn test_new_user_lowercases_key() {
        let user = NewUser {
            username: "Alice".to_string(),
            ..Default::default()
        }
        .into_user(Uuid::nil());
        assert_eq!(user.username, "Alice");
        assert_eq!(user.username_key, "alice");
    }

    #[test]
    fn test_profile_update_leaves_unset_fields() {
        let mut user = NewUser {
            username: "bob".to_string(),
            bio: Some("hi".to_string()),
            ..Default::default()
        }
        .into_user(Uuid::nil());

        ProfileUpdate {
            username: Some("Bobby".to_string()),
            ..Default::default()
        }
        .apply_to(&mut user);

        assert_eq!(user.username_key, "bobby");
        assert_eq!(user.bio.as_deref(), Some("hi"));
    }

    #[test]
    fn test_new_post_validation() {
        let post = NewPost {
            image_url: "img://1".to_string(),
            aspect_ratio: 1.0,
            caption: String::new(),
        };
        assert!(post.validate().is_ok());

        let bad_ratio = NewPost {
            aspect_ratio: 0.0,
            ..post.clone()
        };
        assert!(bad_ratio.validate().is_err());

        let no_image = NewPost {
            image_url: " ".to_string(),
            ..post
        };
        assert!(no_image.validate().is_err());
    }

    #[test]
    fn test_post_document_omits_id() {
        let post = Post {
            id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            image_url: "img".to_string(),
            aspect_ratio: 1.5,
            caption: "c".to_string(),
            timestamp: 10.0,
        };
        let doc = serde_json::to_value(&post).unwrap();
        assert!(doc.get("id").is_none());
        assert_eq!(doc["timestamp"], 10.0);
    }
}
