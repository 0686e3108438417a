//! Social graph: mirrored follow edges plus their feed side effects

use super::barrier::join_all_first_error;
use super::fanout::FanOutEngine;
use super::saga::Saga;
use crate::domain::models::{FollowOutcome, UnfollowOutcome, UserStats, ViewerUser};
use crate::error::{ServiceError, ServiceResult};
use crate::observers::StatsObserver;
use crate::pagination::{CursorQuery, Page, PageCursor};
use crate::repository::{key_to_id, FollowRepository, Paths, PostRepository, UserRepository};
use doc_store::{Query, SharedStore, StorePath};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct SocialGraphService {
    store: SharedStore,
    follows: FollowRepository,
    users: UserRepository,
    posts: PostRepository,
    fanout: FanOutEngine,
    page_size: usize,
}

impl SocialGraphService {
    pub fn new(
        store: SharedStore,
        follows: FollowRepository,
        users: UserRepository,
        posts: PostRepository,
        fanout: FanOutEngine,
        page_size: usize,
    ) -> Self {
        Self {
            store,
            follows,
            users,
            posts,
            fanout,
            page_size,
        }
    }

    /// Follow `target_id`.
    ///
    /// An edge whose `followers` mirror is missing is repaired instead of
    /// rewritten. A new edge is written `following` first; if the mirror
    /// write fails, the `following` write is undone before the error
    /// returns. Once both sides exist the target's posts are backfilled.
    pub async fn follow(&self, viewer_id: Uuid, target_id: Uuid) -> ServiceResult<FollowOutcome> {
        if viewer_id == target_id {
            return Err(ServiceError::InvalidInput("cannot follow yourself".to_string()));
        }

        let (following, follower) = futures::join!(
            self.follows.following_exists(viewer_id, target_id),
            self.follows.follower_exists(target_id, viewer_id),
        );
        let mut outcome = FollowOutcome::default();

        match (following?, follower?) {
            (true, true) => {
                debug!(viewer_id = %viewer_id, target_id = %target_id, "Already following");
                return Ok(outcome);
            }
            (true, false) => {
                self.follows.put_follower(target_id, viewer_id).await?;
                warn!(viewer_id = %viewer_id, target_id = %target_id, "Repaired orphan follow edge");
                outcome.repaired_mirror = true;
            }
            (false, _) => {
                let (add, undo, mirror) = (
                    self.follows.clone(),
                    self.follows.clone(),
                    self.follows.clone(),
                );
                Saga::new("follow")
                    .step_with_compensation(
                        "following",
                        move || async move { add.put_following(viewer_id, target_id).await },
                        move || async move { undo.delete_following(viewer_id, target_id).await },
                    )
                    .step("followers", move || async move {
                        mirror.put_follower(target_id, viewer_id).await
                    })
                    .run()
                    .await?;
                outcome.created = true;
            }
        }

        outcome.backfilled = self.fanout.backfill(viewer_id, target_id).await?;
        info!(
            viewer_id = %viewer_id,
            target_id = %target_id,
            backfilled = outcome.backfilled,
            "Follow committed"
        );
        Ok(outcome)
    }

    /// Unfollow `target_id`.
    ///
    /// The `followers` side goes first, then `following`, each only if
    /// present. Nothing is compensated: a failed second removal leaves a
    /// `following` edge without its mirror, which the next follow repairs.
    pub async fn unfollow(&self, viewer_id: Uuid, target_id: Uuid) -> ServiceResult<UnfollowOutcome> {
        let mut saga = Saga::new("unfollow");

        if self.follows.follower_exists(target_id, viewer_id).await? {
            let follows = self.follows.clone();
            saga = saga.step("followers", move || async move {
                follows.delete_follower(target_id, viewer_id).await
            });
        }
        if self.follows.following_exists(viewer_id, target_id).await? {
            let follows = self.follows.clone();
            saga = saga.step("following", move || async move {
                follows.delete_following(viewer_id, target_id).await
            });
        }

        if saga.is_empty() {
            debug!(viewer_id = %viewer_id, target_id = %target_id, "Not following");
            return Ok(UnfollowOutcome::default());
        }
        saga.run().await?;

        let torn_down = self.fanout.teardown(viewer_id, target_id).await?;
        info!(viewer_id = %viewer_id, target_id = %target_id, torn_down, "Unfollow committed");
        Ok(UnfollowOutcome {
            removed: true,
            torn_down,
        })
    }

    pub async fn is_following(&self, viewer_id: Uuid, target_id: Uuid) -> ServiceResult<bool> {
        self.follows.following_exists(viewer_id, target_id).await
    }

    pub async fn follower_count(&self, user_id: Uuid) -> ServiceResult<usize> {
        self.follows.follower_count(user_id).await
    }

    pub async fn following_count(&self, user_id: Uuid) -> ServiceResult<usize> {
        self.follows.following_count(user_id).await
    }

    pub async fn post_count(&self, user_id: Uuid) -> ServiceResult<usize> {
        self.posts.count(user_id).await
    }

    /// Post, follower and following counts, fetched together
    pub async fn fetch_stats(&self, user_id: Uuid) -> ServiceResult<UserStats> {
        let (posts, followers, following) = futures::join!(
            self.post_count(user_id),
            self.follower_count(user_id),
            self.following_count(user_id),
        );
        Ok(UserStats {
            posts: posts?,
            followers: followers?,
            following: following?,
        })
    }

    /// Live stats: any change to the three partitions triggers a full recount
    pub async fn observe_stats(&self, user_id: Uuid) -> ServiceResult<StatsObserver> {
        let initial = self.fetch_stats(user_id).await?;

        let query = Query::ordered_by_key();
        let mut posts = self.store.observe(&Paths::user_posts(user_id), &query).await?;
        let mut followers = self.store.observe(&Paths::followers(user_id), &query).await?;
        let mut following = self.store.observe(&Paths::following(user_id), &query).await?;

        let (tx, rx) = watch::channel(initial);
        let graph = self.clone();

        let task = tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    event = posts.next() => event,
                    event = followers.next() => event,
                    event = following.next() => event,
                };
                match event {
                    None => break,
                    Some(Err(e)) => {
                        warn!(user_id = %user_id, error = %e, "Stats listener error");
                        continue;
                    }
                    Some(Ok(_)) => {}
                }

                // Fold queued events into one recount
                while posts.try_next().is_some()
                    || followers.try_next().is_some()
                    || following.try_next().is_some()
                {}

                if tx.is_closed() {
                    break;
                }
                match graph.fetch_stats(user_id).await {
                    Ok(stats) => {
                        tx.send_if_modified(|current| {
                            if *current == stats {
                                return false;
                            }
                            *current = stats;
                            true
                        });
                    }
                    Err(e) => warn!(user_id = %user_id, error = %e, "Stats recount failed"),
                }
            }
            debug!(user_id = %user_id, "Stats observer stopped");
        });

        Ok(StatsObserver::new(rx, task))
    }

    /// One page of the users following `user_id`, ascending by id
    pub async fn followers_page(
        &self,
        viewer_id: Uuid,
        user_id: Uuid,
        cursor: &PageCursor,
    ) -> ServiceResult<Page<ViewerUser>> {
        self.edge_page(viewer_id, Paths::followers(user_id), cursor).await
    }

    /// One page of the users `user_id` follows, ascending by id
    pub async fn following_page(
        &self,
        viewer_id: Uuid,
        user_id: Uuid,
        cursor: &PageCursor,
    ) -> ServiceResult<Page<ViewerUser>> {
        self.edge_page(viewer_id, Paths::following(user_id), cursor).await
    }

    pub async fn followers(&self, viewer_id: Uuid, user_id: Uuid) -> ServiceResult<Vec<ViewerUser>> {
        let ids = self.follows.follower_ids(user_id).await?;
        self.enrich(viewer_id, ids).await
    }

    pub async fn following(&self, viewer_id: Uuid, user_id: Uuid) -> ServiceResult<Vec<ViewerUser>> {
        let ids = self.follows.following_ids(user_id).await?;
        self.enrich(viewer_id, ids).await
    }

    /// Profile of `user_id` with the viewer's relationship joined on
    pub async fn viewer_user(&self, viewer_id: Uuid, user_id: Uuid) -> ServiceResult<Option<ViewerUser>> {
        let (user, is_following) = futures::join!(
            self.users.fetch(user_id),
            self.follows.following_exists(viewer_id, user_id),
        );
        let is_following = is_following?;
        Ok(user?.map(|user| ViewerUser {
            is_current_user: user.id == viewer_id,
            user,
            is_following,
        }))
    }

    async fn edge_page(
        &self,
        viewer_id: Uuid,
        path: StorePath,
        cursor: &PageCursor,
    ) -> ServiceResult<Page<ViewerUser>> {
        let page = CursorQuery::by_key(path, self.page_size)
            .next_page(self.store.as_ref(), cursor)
            .await?
            .try_map(|snapshot| key_to_id(&snapshot.key))?;

        let users = self.enrich(viewer_id, page.items).await?;
        Ok(Page {
            items: users,
            cursor: page.cursor,
        })
    }

    /// Resolve ids to users; ids without a profile are skipped
    async fn enrich(&self, viewer_id: Uuid, ids: Vec<Uuid>) -> ServiceResult<Vec<ViewerUser>> {
        let lookups: Vec<_> = ids
            .into_iter()
            .map(|id| {
                let graph = self.clone();
                async move { graph.viewer_user(viewer_id, id).await }
            })
            .collect();
        let resolved = join_all_first_error(lookups).await?;
        Ok(resolved.into_iter().flatten().collect())
    }
}
