use super::report;
use crate::alert::Alerts;
use crate::auth::Principal;
use crate::auth::gate::Route;
use crate::entity::Entities;
use crate::listener::{Listener, View};
use crate::notification;
use crate::notification::model::Notification;
use crate::notification::service::query_for;
use crate::optimistic::{self, InFlight};
use crate::state::AppState;

pub struct NotificationScreen {
    me: Principal,
    service: notification::Service,
    records: Entities<Notification>,
    view: View<Notification>,
    listener: Listener<Notification>,
    in_flight: InFlight,
    alerts: Alerts,
}

impl NotificationScreen {
    pub async fn mount(state: &AppState, me: Principal) -> Self {
        let alerts = state.app.alerts().clone();
        let records = state.records.notifications.clone();

        let view = View::new(&alerts, "Failed to load notifications").feeding(&records);
        let listener = Listener::open(&state.store, &query_for(&me.uid), &view).await;

        Self {
            me,
            service: state.notifications.clone(),
            records,
            view,
            listener,
            in_flight: InFlight::new(),
            alerts,
        }
    }

    /// Newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        let ids = self
            .view
            .items()
            .into_iter()
            .map(|n| n.id)
            .collect::<Vec<_>>();
        self.records.project(&ids)
    }

    pub fn view(&self) -> &View<Notification> {
        &self.view
    }

    pub fn unread_count(&self) -> usize {
        self.notifications().iter().filter(|n| !n.read).count()
    }

    /// Marks the notification read and returns where it points to.
    pub async fn open(&self, id: &str) -> crate::Result<Option<(Route, Option<String>)>> {
        let res = self.read(id).await;
        report(&self.alerts, res).map(|n| n.destination())
    }

    async fn read(&self, id: &str) -> crate::Result<Notification> {
        let current = self
            .records
            .get(id)
            .ok_or_else(|| optimistic::Error::Missing(id.to_string()))?;
        if current.read {
            return Ok(current);
        }

        let service = &self.service;
        optimistic::apply(
            &self.records,
            &self.in_flight,
            id,
            |n: &Notification| Notification {
                read: true,
                ..n.clone()
            },
            |n: &Notification| Notification {
                read: false,
                ..n.clone()
            },
            |n| async move { service.mark_read(&n.id).await.map_err(crate::Error::from) },
        )
        .await
    }

    pub async fn mark_all_read(&self) -> crate::Result<usize> {
        let res = self.service.mark_all_read(&self.me.uid).await;
        report(&self.alerts, res.map_err(Into::into))
    }

    pub async fn delete(&self, id: &str) -> crate::Result<()> {
        let res = self.service.delete(id).await;
        if res.is_ok() {
            self.records.remove(id);
        }
        report(&self.alerts, res.map_err(Into::into))
    }

    pub fn unmount(mut self) {
        self.listener.unsubscribe();
    }
}
