use super::report;
use crate::alert::Alerts;
use crate::auth::Principal;
use crate::chat;
use crate::chat::model::{Chat, Message};
use crate::chat::service::messages_query;
use crate::entity::Entities;
use crate::listener::{Listener, View};
use crate::state::AppState;

/// One-on-one conversation. Opening it marks the chat read.
pub struct ConversationScreen {
    me: Principal,
    chat_id: String,
    service: chat::Service,
    records: Entities<Chat>,
    messages: View<Message>,
    listener: Listener<Message>,
    alerts: Alerts,
}

impl ConversationScreen {
    pub async fn mount(state: &AppState, me: Principal, chat_id: &str) -> Self {
        let alerts = state.app.alerts().clone();
        let service = state.chats.clone();
        let records = state.records.chats.clone();

        match service.find_by_id(chat_id).await {
            Ok(chat) => records.upsert(chat),
            Err(e) => alerts.raise(crate::Error::from(e).alert()),
        }
        if let Err(e) = service.mark_read(&me.uid, chat_id).await {
            alerts.raise(crate::Error::from(e).alert());
        }

        let messages = View::new(&alerts, "Failed to load messages");
        let listener = Listener::open(&state.store, &messages_query(chat_id), &messages).await;

        Self {
            me,
            chat_id: chat_id.to_string(),
            service,
            records,
            messages,
            listener,
            alerts,
        }
    }

    pub fn chat(&self) -> Option<Chat> {
        self.records.get(&self.chat_id)
    }

    /// Newest first.
    pub fn messages(&self) -> Vec<Message> {
        self.messages.items()
    }

    pub fn messages_view(&self) -> &View<Message> {
        &self.messages
    }

    pub async fn send(&self, text: &str) -> crate::Result<Message> {
        let res = self.service.send_message(&self.me, &self.chat_id, text).await;
        report(&self.alerts, res.map_err(Into::into))
    }

    pub async fn mark_read(&self) -> crate::Result<()> {
        let res = self.service.mark_read(&self.me.uid, &self.chat_id).await;
        report(&self.alerts, res.map_err(Into::into))
    }

    pub fn unmount(mut self) {
        self.listener.unsubscribe();
    }
}
