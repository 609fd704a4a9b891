use super::report;
use crate::alert::Alerts;
use crate::auth::Principal;
use crate::chat;
use crate::chat::model::Chat;
use crate::chat::service::chats_query;
use crate::entity::Entities;
use crate::listener::{Listener, View};
use crate::state::AppState;
use crate::user::model::User;
use crate::user::repository::directory_query;
use crate::user::service::filter_by_name;

/// Conversations of the signed-in user plus the directory to start new ones.
pub struct ChatListScreen {
    me: Principal,
    service: chat::Service,
    records: Entities<Chat>,
    chats: View<Chat>,
    users: View<User>,
    chats_listener: Listener<Chat>,
    users_listener: Listener<User>,
    alerts: Alerts,
}

impl ChatListScreen {
    pub async fn mount(state: &AppState, me: Principal) -> Self {
        let alerts = state.app.alerts().clone();
        let records = state.records.chats.clone();

        let chats = View::new(&alerts, "Failed to load chats").feeding(&records);
        let users = View::new(&alerts, "Failed to load users").feeding(&state.records.users);

        let chats_listener = Listener::open(&state.store, &chats_query(&me.uid), &chats).await;
        let users_listener = Listener::open(&state.store, &directory_query(&me.uid), &users).await;

        Self {
            me,
            service: state.chats.clone(),
            records,
            chats,
            users,
            chats_listener,
            users_listener,
            alerts,
        }
    }

    /// Most recently active first.
    pub fn chats(&self) -> Vec<Chat> {
        let ids = self
            .chats
            .items()
            .into_iter()
            .map(|c| c.id)
            .collect::<Vec<_>>();
        self.records.project(&ids)
    }

    pub fn chats_view(&self) -> &View<Chat> {
        &self.chats
    }

    pub fn unread_count(&self) -> usize {
        self.chats()
            .iter()
            .filter(|c| c.is_unread_for(&self.me.uid))
            .count()
    }

    pub fn users(&self) -> Vec<User> {
        self.users
            .items()
            .into_iter()
            .filter(|u| !u.is_deleted)
            .collect()
    }

    pub fn search(&self, name: &str) -> Vec<User> {
        filter_by_name(self.users(), name)
    }

    /// Id of the chat with `other`, created on first use.
    pub async fn start_chat(&self, other: &User) -> crate::Result<String> {
        let res = self.service.start_chat(&self.me, other).await;
        report(&self.alerts, res.map_err(Into::into))
    }

    pub async fn delete_chat(&self, chat_id: &str) -> crate::Result<()> {
        let res = self.service.delete_chat(&self.me.uid, chat_id).await;
        if res.is_ok() {
            self.records.remove(chat_id);
        }
        report(&self.alerts, res.map_err(Into::into))
    }

    pub fn unmount(mut self) {
        self.chats_listener.unsubscribe();
        self.users_listener.unsubscribe();
    }
}
