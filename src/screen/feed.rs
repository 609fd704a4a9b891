use log::debug;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::report;
use crate::alert::Alerts;
use crate::auth::Principal;
use crate::entity::Entities;
use crate::friend::model::Friend;
use crate::friend::service::{friends_query, is_placeholder};
use crate::listener::{Listener, ListenerSlot, View, ViewState};
use crate::optimistic::{self, InFlight};
use crate::post::model::{Comment, Post};
use crate::post::service::feed_query;
use crate::state::AppState;
use crate::{post, user};

/// Posts by the signed-in user and their friends, newest first.
pub struct FeedScreen {
    me: Principal,
    service: post::Service,
    records: Entities<Post>,
    posts: View<Post>,
    friends: View<Friend>,
    in_flight: InFlight,
    alerts: Alerts,
    driver: JoinHandle<()>,
}

impl FeedScreen {
    pub async fn mount(state: &AppState, me: Principal) -> Self {
        let alerts = state.app.alerts().clone();
        let records = state.records.posts.clone();

        let friends = View::new(&alerts, "Failed to load friends");
        let posts = View::new(&alerts, "Failed to load posts").feeding(&records);

        let listener = Listener::open(&state.store, &friends_query(&me.uid), &friends).await;
        let slot = ListenerSlot::new(&state.store, posts.clone());
        let driver = tokio::spawn(follow_friends(
            me.uid.clone(),
            listener,
            slot,
            friends.subscribe(),
        ));

        Self {
            me,
            service: state.posts.clone(),
            records,
            posts,
            friends,
            in_flight: InFlight::new(),
            alerts,
            driver,
        }
    }

    pub fn posts(&self) -> Vec<Post> {
        let ids = self
            .posts
            .items()
            .into_iter()
            .map(|p| p.id)
            .collect::<Vec<_>>();
        self.records.project(&ids)
    }

    pub fn posts_view(&self) -> &View<Post> {
        &self.posts
    }

    pub fn friend_ids(&self) -> Vec<user::Id> {
        self.friends
            .items()
            .into_iter()
            .map(|f| f.id)
            .filter(|id| !is_placeholder(id.as_str()))
            .collect()
    }

    pub fn is_pending(&self, post_id: &str) -> bool {
        self.in_flight.is_pending(post_id)
    }

    pub async fn create_post(&self, content: &str) -> crate::Result<Post> {
        let res = self.service.create(&self.me, content).await;
        report(&self.alerts, res.map_err(Into::into))
    }

    /// Likes or unlikes depending on the current state, showing the change
    /// before the backend confirms it.
    pub async fn toggle_like(&self, post_id: &str) -> crate::Result<Post> {
        let res = self.like_or_unlike(post_id).await;
        report(&self.alerts, res)
    }

    async fn like_or_unlike(&self, post_id: &str) -> crate::Result<Post> {
        let prior = self
            .records
            .get(post_id)
            .ok_or_else(|| optimistic::Error::Missing(post_id.to_string()))?;
        let liked = prior.is_liked_by(&self.me.uid);
        let me = &self.me;
        let service = &self.service;

        optimistic::apply(
            &self.records,
            &self.in_flight,
            post_id,
            |p: &Post| {
                if liked {
                    p.without_like(&me.uid)
                } else {
                    p.with_like(&me.uid)
                }
            },
            |p: &Post| {
                if liked {
                    p.with_like(&me.uid)
                } else {
                    p.without_like(&me.uid)
                }
            },
            |_| async move {
                let res = if liked {
                    service.unlike(me, &prior.id).await
                } else {
                    service.like(me, &prior).await
                };
                res.map_err(crate::Error::from)
            },
        )
        .await
    }

    /// Writes first, then patches the local record.
    pub async fn comment(&self, post_id: &str, content: &str) -> crate::Result<Comment> {
        let res = self.add_comment(post_id, content).await;
        report(&self.alerts, res)
    }

    async fn add_comment(&self, post_id: &str, content: &str) -> crate::Result<Comment> {
        let post = match self.records.get(post_id) {
            Some(p) => p,
            None => self.service.find_by_id(post_id).await?,
        };
        let comment = self.service.add_comment(&self.me, &post, content).await?;

        if let Some(current) = self.records.get(post_id) {
            self.records.upsert(current.with_comment(&comment));
        }
        Ok(comment)
    }

    pub async fn remove_comment(&self, post_id: &str, comment: &Comment) -> crate::Result<()> {
        let res = self
            .service
            .remove_comment(&self.me, post_id, comment)
            .await
            .map_err(crate::Error::from);
        report(&self.alerts, res)
    }

    pub async fn unmount(mut self) {
        self.driver.abort();
        let _ = (&mut self.driver).await;
    }
}

impl Drop for FeedScreen {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

/// Re-targets the posts slot whenever the friend list changes. The
/// listeners are owned by the task and released when it is aborted.
async fn follow_friends(
    me: user::Id,
    friends: Listener<Friend>,
    mut posts: ListenerSlot<Post>,
    mut changes: watch::Receiver<ViewState<Friend>>,
) {
    let _friends = friends;

    loop {
        let authors = {
            let state = changes.borrow_and_update();
            (state.revision > 0).then(|| feed_authors(&me, &state.items))
        };

        if let Some(authors) = authors {
            debug!("feed follows {} authors", authors.len());
            posts.replace(feed_query(&authors)).await;
        }

        if changes.changed().await.is_err() {
            break;
        }
    }
}

fn feed_authors(me: &user::Id, friends: &[Friend]) -> Vec<user::Id> {
    let mut ids = friends
        .iter()
        .map(|f| f.id.clone())
        .filter(|id| !is_placeholder(id.as_str()) && id != me)
        .collect::<Vec<_>>();
    ids.push(me.clone());
    ids.sort();
    ids.dedup();
    ids
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;

    #[test]
    fn should_include_self_and_skip_placeholders() {
        let me = user::Id::from("u1");
        let friends = [
            Friend::new(&user::Id::from("u3"), Utc::now(), None),
            Friend::new(&user::Id::from("_dummy"), Utc::now(), None),
            Friend::new(&user::Id::from("u2"), Utc::now(), None),
        ];

        let ids = feed_authors(&me, &friends);

        assert_eq!(
            ids,
            vec![user::Id::from("u1"), user::Id::from("u2"), user::Id::from("u3")]
        );
    }
}
