//! Client facade bound to the signed-in viewer
//!
//! Every operation resolves the viewer through the identity provider and
//! fails with `Unauthenticated` when nobody is signed in.

use crate::config::FeedConfig;
use crate::domain::models::{
    Comment, FeedEntry, FollowOutcome, NewPost, NewUser, Post, ProfileUpdate, UnfollowOutcome, User,
    UserStats, ViewerPost, ViewerUser,
};
use crate::error::ServiceResult;
use crate::identity::IdentityProvider;
use crate::observers::{FeedSession, StatsObserver};
use crate::pagination::{LiveUpdates, Page, PageCursor};
use crate::repository::{
    BookmarkRepository, CommentRepository, FeedRepository, FollowRepository, LikeRepository,
    PostRepository, UserRepository,
};
use crate::services::{
    CommentService, FanOutEngine, FeedService, SocialGraphService, UserService,
    ViewerStateComposer,
};
use doc_store::SharedStore;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct SocialClient {
    identity: Arc<dyn IdentityProvider>,
    users: UserService,
    graph: SocialGraphService,
    fanout: FanOutEngine,
    composer: ViewerStateComposer,
    feed: FeedService,
    comments: CommentService,
}

impl SocialClient {
    pub fn new(store: SharedStore, identity: Arc<dyn IdentityProvider>, config: &FeedConfig) -> Self {
        let users = UserRepository::new(store.clone());
        let posts = PostRepository::new(store.clone());
        let follows = FollowRepository::new(store.clone());

        let fanout = FanOutEngine::new(
            posts.clone(),
            FeedRepository::new(store.clone()),
            follows.clone(),
            config.fanout_concurrency,
        );
        let composer = ViewerStateComposer::new(
            posts.clone(),
            LikeRepository::new(store.clone()),
            BookmarkRepository::new(store.clone()),
        );
        let graph = SocialGraphService::new(
            store.clone(),
            follows,
            users.clone(),
            posts.clone(),
            fanout.clone(),
            config.follows_page_size,
        );
        let feed = FeedService::new(
            store.clone(),
            posts,
            composer.clone(),
            config.feed_page_size,
            config.posts_page_size,
        );
        let comments = CommentService::new(
            store.clone(),
            CommentRepository::new(store),
            config.comments_page_size,
        );

        Self {
            identity,
            users: UserService::new(users),
            graph,
            fanout,
            composer,
            feed,
            comments,
        }
    }

    fn viewer(&self) -> ServiceResult<Uuid> {
        self.identity.require_user()
    }

    // ============= Profiles =============

    /// Create the profile of the signed-in user
    pub async fn create_profile(&self, new_user: NewUser) -> ServiceResult<User> {
        self.users.create_user(self.viewer()?, new_user).await
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> ServiceResult<User> {
        self.users.update_profile(self.viewer()?, update).await
    }

    pub async fn fetch_user(&self, user_id: Uuid) -> ServiceResult<Option<ViewerUser>> {
        self.graph.viewer_user(self.viewer()?, user_id).await
    }

    pub async fn fetch_user_by_username(&self, username: &str) -> ServiceResult<Option<ViewerUser>> {
        let viewer = self.viewer()?;
        match self.users.fetch_user_by_username(username).await? {
            Some(user) => self.graph.viewer_user(viewer, user.id).await,
            None => Ok(None),
        }
    }

    pub async fn fetch_stats(&self, user_id: Uuid) -> ServiceResult<UserStats> {
        self.viewer()?;
        self.graph.fetch_stats(user_id).await
    }

    pub async fn observe_stats(&self, user_id: Uuid) -> ServiceResult<StatsObserver> {
        self.viewer()?;
        self.graph.observe_stats(user_id).await
    }

    // ============= Posts & feed =============

    pub async fn publish_post(&self, new_post: NewPost) -> ServiceResult<Post> {
        self.fanout.publish(self.viewer()?, new_post).await
    }

    pub async fn fetch_post(&self, owner_id: Uuid, post_id: Uuid) -> ServiceResult<Option<ViewerPost>> {
        self.composer
            .fetch_post(self.viewer()?, owner_id, post_id)
            .await
    }

    pub async fn fetch_feed_page(&self) -> ServiceResult<Page<ViewerPost>> {
        self.feed.fetch_feed_page(self.viewer()?).await
    }

    pub async fn fetch_next_feed_page(&self, cursor: &PageCursor) -> ServiceResult<Page<ViewerPost>> {
        self.feed.fetch_next_feed_page(self.viewer()?, cursor).await
    }

    /// Feed entries delivered at or after `since`
    pub async fn observe_feed(&self, since: Option<f64>) -> ServiceResult<LiveUpdates<FeedEntry>> {
        self.feed.observe_feed(self.viewer()?, since).await
    }

    /// A view-scoped feed with paging and live updates
    pub fn feed_session(&self) -> ServiceResult<FeedSession> {
        Ok(FeedSession::new(self.feed.clone(), self.viewer()?))
    }

    pub async fn fetch_user_posts_page(
        &self,
        author_id: Uuid,
        cursor: &PageCursor,
    ) -> ServiceResult<Page<ViewerPost>> {
        self.feed
            .fetch_user_posts_page(self.viewer()?, author_id, cursor)
            .await
    }

    pub async fn fetch_bookmarks_page(&self, cursor: &PageCursor) -> ServiceResult<Page<ViewerPost>> {
        self.feed.fetch_bookmarks_page(self.viewer()?, cursor).await
    }

    // ============= Interactions =============

    pub async fn like_post(&self, owner_id: Uuid, post_id: Uuid) -> ServiceResult<bool> {
        self.composer.like(self.viewer()?, owner_id, post_id).await
    }

    pub async fn unlike_post(&self, owner_id: Uuid, post_id: Uuid) -> ServiceResult<bool> {
        self.composer.unlike(self.viewer()?, owner_id, post_id).await
    }

    pub async fn bookmark_post(&self, owner_id: Uuid, post_id: Uuid) -> ServiceResult<bool> {
        self.composer.bookmark(self.viewer()?, owner_id, post_id).await
    }

    pub async fn unbookmark_post(&self, post_id: Uuid) -> ServiceResult<bool> {
        self.composer.unbookmark(self.viewer()?, post_id).await
    }

    pub async fn add_comment(
        &self,
        owner_id: Uuid,
        post_id: Uuid,
        caption: String,
    ) -> ServiceResult<Comment> {
        self.comments
            .add_comment(self.viewer()?, owner_id, post_id, caption)
            .await
    }

    pub async fn fetch_comments_page(
        &self,
        owner_id: Uuid,
        post_id: Uuid,
        cursor: &PageCursor,
    ) -> ServiceResult<Page<Comment>> {
        self.viewer()?;
        self.comments
            .fetch_comments_page(owner_id, post_id, cursor)
            .await
    }

    pub async fn comment_count(&self, owner_id: Uuid, post_id: Uuid) -> ServiceResult<usize> {
        self.viewer()?;
        self.comments.comment_count(owner_id, post_id).await
    }

    pub async fn observe_comments(
        &self,
        owner_id: Uuid,
        post_id: Uuid,
        since: Option<f64>,
    ) -> ServiceResult<LiveUpdates<Comment>> {
        self.viewer()?;
        self.comments
            .observe_comments(owner_id, post_id, since)
            .await
    }

    // ============= Graph =============

    pub async fn follow(&self, target_id: Uuid) -> ServiceResult<FollowOutcome> {
        self.graph.follow(self.viewer()?, target_id).await
    }

    pub async fn unfollow(&self, target_id: Uuid) -> ServiceResult<UnfollowOutcome> {
        self.graph.unfollow(self.viewer()?, target_id).await
    }

    pub async fn is_following(&self, target_id: Uuid) -> ServiceResult<bool> {
        self.graph.is_following(self.viewer()?, target_id).await
    }

    pub async fn fetch_followers(&self, user_id: Uuid) -> ServiceResult<Vec<ViewerUser>> {
        self.graph.followers(self.viewer()?, user_id).await
    }

    pub async fn fetch_followers_page(
        &self,
        user_id: Uuid,
        cursor: &PageCursor,
    ) -> ServiceResult<Page<ViewerUser>> {
        self.graph
            .followers_page(self.viewer()?, user_id, cursor)
            .await
    }

    pub async fn fetch_following(&self, user_id: Uuid) -> ServiceResult<Vec<ViewerUser>> {
        self.graph.following(self.viewer()?, user_id).await
    }

    pub async fn fetch_following_page(
        &self,
        user_id: Uuid,
        cursor: &PageCursor,
    ) -> ServiceResult<Page<ViewerUser>> {
        self.graph
            .following_page(self.viewer()?, user_id, cursor)
            .await
    }
}
