//! Viewer-relative post state
//!
//! Posts never leave the service without the viewer's like and bookmark
//! state and the current like count joined on.

use super::barrier::join_all_first_error;
use crate::domain::models::{now_timestamp, Bookmark, Post, ViewerPost};
use crate::error::ServiceResult;
use crate::repository::{BookmarkRepository, LikeRepository, PostRepository};
use tracing::debug;
use uuid::Uuid;

#[derive(Clone)]
pub struct ViewerStateComposer {
    posts: PostRepository,
    likes: LikeRepository,
    bookmarks: BookmarkRepository,
}

impl ViewerStateComposer {
    pub fn new(posts: PostRepository, likes: LikeRepository, bookmarks: BookmarkRepository) -> Self {
        Self {
            posts,
            likes,
            bookmarks,
        }
    }

    /// Join like/bookmark state onto one post.
    ///
    /// The three lookups run concurrently and all settle before returning.
    pub async fn compose(&self, viewer_id: Uuid, post: Post) -> ServiceResult<ViewerPost> {
        let (is_liked, is_bookmarked, like_count) = futures::join!(
            self.likes.exists(post.owner_id, post.id, viewer_id),
            self.bookmarks.exists(viewer_id, post.id),
            self.likes.count(post.owner_id, post.id),
        );

        Ok(ViewerPost {
            is_liked: is_liked?,
            is_bookmarked: is_bookmarked?,
            like_count: like_count?,
            post,
        })
    }

    pub async fn compose_page(
        &self,
        viewer_id: Uuid,
        posts: Vec<Post>,
    ) -> ServiceResult<Vec<ViewerPost>> {
        let composed: Vec<_> = posts
            .into_iter()
            .map(|post| {
                let composer = self.clone();
                async move { composer.compose(viewer_id, post).await }
            })
            .collect();
        join_all_first_error(composed).await
    }

    pub async fn fetch_post(
        &self,
        viewer_id: Uuid,
        owner_id: Uuid,
        post_id: Uuid,
    ) -> ServiceResult<Option<ViewerPost>> {
        match self.posts.fetch(owner_id, post_id).await? {
            Some(post) => Ok(Some(self.compose(viewer_id, post).await?)),
            None => Ok(None),
        }
    }

    /// Like a post; returns false when it was already liked
    pub async fn like(&self, viewer_id: Uuid, owner_id: Uuid, post_id: Uuid) -> ServiceResult<bool> {
        if self.likes.exists(owner_id, post_id, viewer_id).await? {
            return Ok(false);
        }
        self.likes.add(owner_id, post_id, viewer_id).await?;
        debug!(viewer_id = %viewer_id, post_id = %post_id, "Post liked");
        Ok(true)
    }

    /// Unlike a post; returns false when it was not liked
    pub async fn unlike(&self, viewer_id: Uuid, owner_id: Uuid, post_id: Uuid) -> ServiceResult<bool> {
        if !self.likes.exists(owner_id, post_id, viewer_id).await? {
            return Ok(false);
        }
        self.likes.remove(owner_id, post_id, viewer_id).await?;
        debug!(viewer_id = %viewer_id, post_id = %post_id, "Post unliked");
        Ok(true)
    }

    pub async fn bookmark(
        &self,
        viewer_id: Uuid,
        owner_id: Uuid,
        post_id: Uuid,
    ) -> ServiceResult<bool> {
        if self.bookmarks.exists(viewer_id, post_id).await? {
            return Ok(false);
        }
        let bookmark = Bookmark {
            post_id,
            post_owner_id: owner_id,
            timestamp: now_timestamp(),
        };
        self.bookmarks.add(viewer_id, &bookmark).await?;
        debug!(viewer_id = %viewer_id, post_id = %post_id, "Post bookmarked");
        Ok(true)
    }

    pub async fn unbookmark(&self, viewer_id: Uuid, post_id: Uuid) -> ServiceResult<bool> {
        if !self.bookmarks.exists(viewer_id, post_id).await? {
            return Ok(false);
        }
        self.bookmarks.remove(viewer_id, post_id).await?;
        debug!(viewer_id = %viewer_id, post_id = %post_id, "Bookmark removed");
        Ok(true)
    }
}
