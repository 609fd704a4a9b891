use super::report;
use crate::alert::Alerts;
use crate::auth::Principal;
use crate::chat::model::Message;
use crate::group;
use crate::group::model::Group;
use crate::group::service::messages_query;
use crate::listener::{Listener, View};
use crate::state::AppState;

pub struct GroupChatScreen {
    me: Principal,
    group: Group,
    service: group::Service,
    messages: View<Message>,
    listener: Listener<Message>,
    alerts: Alerts,
}

impl GroupChatScreen {
    /// Fails when the group cannot be loaded; nothing is subscribed then.
    pub async fn mount(state: &AppState, me: Principal, group_id: &str) -> crate::Result<Self> {
        let alerts = state.app.alerts().clone();
        let service = state.groups.clone();

        let group = report(
            &alerts,
            service.find_by_id(group_id).await.map_err(Into::into),
        )?;

        let messages = View::new(&alerts, "Failed to load messages");
        let listener = Listener::open(&state.store, &messages_query(group_id), &messages).await;

        Ok(Self {
            me,
            group,
            service,
            messages,
            listener,
            alerts,
        })
    }

    pub fn group(&self) -> &Group {
        &self.group
    }

    /// Oldest first.
    pub fn messages(&self) -> Vec<Message> {
        self.messages.items()
    }

    pub fn messages_view(&self) -> &View<Message> {
        &self.messages
    }

    pub async fn send(&self, text: &str) -> crate::Result<Message> {
        let res = self
            .service
            .send_message(&self.me, &self.group.id, text)
            .await;
        report(&self.alerts, res.map_err(Into::into))
    }

    /// Leaves the group and stops following its messages.
    pub async fn leave(&mut self) -> crate::Result<()> {
        let res = self.service.leave(&self.me.uid, &self.group.id).await;
        if res.is_ok() {
            self.group.members.retain(|m| m != &self.me.uid);
            self.listener.unsubscribe();
        }
        report(&self.alerts, res.map_err(Into::into))
    }

    pub fn unmount(mut self) {
        self.listener.unsubscribe();
    }
}
