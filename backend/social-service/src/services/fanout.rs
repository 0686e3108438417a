//! Feed fan-out on write
//!
//! Publishing writes the canonical post once and a pointer into the feed of
//! the author and of every follower. Pointer writes are independent; the
//! ones that land are never rolled back.

use crate::domain::models::{FeedEntry, NewPost, Post};
use crate::error::{ServiceError, ServiceResult};
use crate::metrics::FeedMetrics;
use crate::repository::{FeedRepository, FollowRepository, PostRepository};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct FanOutEngine {
    posts: PostRepository,
    feed: FeedRepository,
    follows: FollowRepository,
    concurrency: usize,
    metrics: FeedMetrics,
}

/// Tally of a batch of independent feed writes
struct WriteTally {
    delivered: usize,
    failed: usize,
    first_error: Option<ServiceError>,
}

impl FanOutEngine {
    pub fn new(
        posts: PostRepository,
        feed: FeedRepository,
        follows: FollowRepository,
        concurrency: usize,
    ) -> Self {
        Self {
            posts,
            feed,
            follows,
            concurrency: concurrency.max(1),
            metrics: FeedMetrics::new(),
        }
    }

    /// Create a post and deliver it to the author's and followers' feeds.
    ///
    /// Failures while enumerating followers or writing their entries are
    /// reported as `PartialFanOut`; the post and any delivered entries stay.
    pub async fn publish(&self, author_id: Uuid, new_post: NewPost) -> ServiceResult<Post> {
        new_post.validate()?;

        let post = self.posts.create(author_id, new_post).await?;
        let entry = post.feed_entry();
        self.feed.insert(author_id, &entry).await?;

        let followers = match self.follows.follower_ids(author_id).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(post_id = %post.id, author_id = %author_id, error = %e, "Follower enumeration failed");
                return Err(ServiceError::PartialFanOut {
                    post_id: post.id,
                    delivered: 0,
                    failed: 0,
                    source: Box::new(e),
                });
            }
        };

        let tally = self.write_entries("publish", followers, entry).await;
        if let Some(source) = tally.first_error {
            warn!(
                post_id = %post.id,
                delivered = tally.delivered,
                failed = tally.failed,
                "Fan-out incomplete"
            );
            return Err(ServiceError::PartialFanOut {
                post_id: post.id,
                delivered: tally.delivered,
                failed: tally.failed,
                source: Box::new(source),
            });
        }

        info!(post_id = %post.id, author_id = %author_id, recipients = tally.delivered, "Post published");
        Ok(post)
    }

    /// Copy every post by `target_id` into the viewer's feed
    pub async fn backfill(&self, viewer_id: Uuid, target_id: Uuid) -> ServiceResult<usize> {
        let posts = self.posts.list_all(target_id).await?;
        let feed = self.feed.clone();
        let metrics = self.metrics.clone();

        let results: Vec<ServiceResult<()>> = stream::iter(posts)
            .map(|post| {
                let feed = feed.clone();
                let metrics = metrics.clone();
                async move {
                    let result = feed.insert(viewer_id, &post.feed_entry()).await;
                    metrics.record_fanout_write("backfill", result.is_ok());
                    result
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let written = settle(results)?;
        debug!(viewer_id = %viewer_id, target_id = %target_id, written, "Feed backfilled");
        Ok(written)
    }

    /// Remove every post by `target_id` from the viewer's feed.
    ///
    /// Posts published by the target while this runs may stay behind.
    pub async fn teardown(&self, viewer_id: Uuid, target_id: Uuid) -> ServiceResult<usize> {
        let posts = self.posts.list_all(target_id).await?;
        let feed = self.feed.clone();
        let metrics = self.metrics.clone();

        let results: Vec<ServiceResult<()>> = stream::iter(posts)
            .map(|post| {
                let feed = feed.clone();
                let metrics = metrics.clone();
                async move {
                    let result = feed.remove(viewer_id, post.id).await;
                    metrics.record_fanout_write("teardown", result.is_ok());
                    result
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let removed = settle(results)?;
        debug!(viewer_id = %viewer_id, target_id = %target_id, removed, "Feed torn down");
        Ok(removed)
    }

    async fn write_entries(
        &self,
        operation: &'static str,
        recipients: Vec<Uuid>,
        entry: FeedEntry,
    ) -> WriteTally {
        let feed = self.feed.clone();
        let metrics = self.metrics.clone();

        let results: Vec<(Uuid, ServiceResult<()>)> = stream::iter(recipients)
            .map(|recipient| {
                let feed = feed.clone();
                let metrics = metrics.clone();
                async move {
                    let result = feed.insert(recipient, &entry).await;
                    metrics.record_fanout_write(operation, result.is_ok());
                    (recipient, result)
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut tally = WriteTally {
            delivered: 0,
            failed: 0,
            first_error: None,
        };
        for (recipient, result) in results {
            match result {
                Ok(()) => tally.delivered += 1,
                Err(e) => {
                    warn!(recipient_id = %recipient, post_id = %entry.post_id, error = %e, "Feed entry write failed");
                    tally.failed += 1;
                    tally.first_error.get_or_insert(e);
                }
            }
        }
        tally
    }
}

/// Count successes, or surface the first failure once all have settled
fn settle(results: Vec<ServiceResult<()>>) -> ServiceResult<usize> {
    let total = results.len();
    match results.into_iter().find_map(Result::err) {
        Some(e) => Err(e),
        None => Ok(total),
    }
}
