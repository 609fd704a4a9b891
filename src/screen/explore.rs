use std::collections::HashSet;

use super::report;
use crate::alert::Alerts;
use crate::auth::Principal;
use crate::entity::Entities;
use crate::friend::model::{Friend, FriendRequest};
use crate::friend::service::{friends_query, incoming_query, is_placeholder};
use crate::listener::{Listener, View};
use crate::state::AppState;
use crate::user::model::User;
use crate::user::repository::everyone_query;
use crate::user::service::filter_by_name;
use crate::{friend, user};

/// People to meet: suggestions, current friends and incoming requests.
pub struct ExploreScreen {
    me: Principal,
    service: friend::Service,
    records: Entities<User>,
    users: View<User>,
    friends: View<Friend>,
    requests: View<FriendRequest>,
    listeners: (Listener<User>, Listener<Friend>, Listener<FriendRequest>),
    alerts: Alerts,
}

impl ExploreScreen {
    pub async fn mount(state: &AppState, me: Principal) -> Self {
        let alerts = state.app.alerts().clone();
        let records = state.records.users.clone();

        let users = View::new(&alerts, "Failed to load users").feeding(&records);
        let friends = View::new(&alerts, "Failed to load friends");
        let requests = View::new(&alerts, "Failed to load friend requests");

        let listeners = (
            Listener::open(&state.store, &everyone_query(), &users).await,
            Listener::open(&state.store, &friends_query(&me.uid), &friends).await,
            Listener::open(&state.store, &incoming_query(&me.uid), &requests).await,
        );

        Self {
            me,
            service: state.friends.clone(),
            records,
            users,
            friends,
            requests,
            listeners,
            alerts,
        }
    }

    fn friend_ids(&self) -> HashSet<user::Id> {
        self.friends
            .items()
            .into_iter()
            .map(|f| f.id)
            .filter(|id| !is_placeholder(id.as_str()))
            .collect()
    }

    /// Registered, active users who are neither me nor already friends.
    pub fn suggestions(&self) -> Vec<User> {
        let friends = self.friend_ids();
        self.users
            .items()
            .into_iter()
            .filter(|u| u.is_registered() && !u.is_deleted)
            .filter(|u| u.id != self.me.uid && !friends.contains(&u.id))
            .collect()
    }

    /// Profiles of current friends that the directory has delivered.
    pub fn friends(&self) -> Vec<User> {
        let mut ids = self
            .friend_ids()
            .into_iter()
            .map(|id| id.0)
            .collect::<Vec<_>>();
        ids.sort();
        self.records.project(&ids)
    }

    pub fn users_view(&self) -> &View<User> {
        &self.users
    }

    pub fn friends_view(&self) -> &View<Friend> {
        &self.friends
    }

    pub fn incoming(&self) -> Vec<FriendRequest> {
        self.requests.items()
    }

    pub fn requests_view(&self) -> &View<FriendRequest> {
        &self.requests
    }

    pub fn search(&self, name: &str) -> Vec<User> {
        let users = self
            .users
            .items()
            .into_iter()
            .filter(|u| u.id != self.me.uid && !u.is_deleted)
            .collect();
        filter_by_name(users, name)
    }

    pub async fn send_request(&self, to: &user::Id) -> crate::Result<FriendRequest> {
        let res = self.service.send_request(&self.me, to).await;
        report(&self.alerts, res.map_err(Into::into))
    }

    pub async fn accept(&self, request_id: &str) -> crate::Result<()> {
        let res = self.service.accept(&self.me, request_id).await;
        report(&self.alerts, res.map_err(Into::into))
    }

    pub async fn reject(&self, request_id: &str) -> crate::Result<()> {
        let res = self.service.reject(&self.me.uid, request_id).await;
        report(&self.alerts, res.map_err(Into::into))
    }

    pub async fn remove_friend(&self, friend: &user::Id) -> crate::Result<()> {
        let res = self.service.remove(&self.me.uid, friend).await;
        report(&self.alerts, res.map_err(Into::into))
    }

    pub fn unmount(mut self) {
        self.listeners.0.unsubscribe();
        self.listeners.1.unsubscribe();
        self.listeners.2.unsubscribe();
    }
}
