use bytes::Bytes;
use url::Url;

use super::report;
use crate::alert::{Alert, Alerts};
use crate::auth::Principal;
use crate::entity::Entities;
use crate::state::AppState;
use crate::user;
use crate::user::model::{ProfileUpdate, User};

/// The signed-in user's own profile, served from the local cache when fresh.
pub struct ProfileScreen {
    me: Principal,
    service: user::Service,
    records: Entities<User>,
    alerts: Alerts,
}

impl ProfileScreen {
    pub async fn mount(state: &AppState, me: Principal) -> Self {
        let screen = Self {
            me,
            service: state.users.clone(),
            records: state.records.users.clone(),
            alerts: state.app.alerts().clone(),
        };
        // failures are already reported
        let _ = screen.refresh(false).await;
        screen
    }

    pub fn profile(&self) -> Option<User> {
        self.records.get(self.me.uid.as_str())
    }

    pub async fn refresh(&self, force: bool) -> crate::Result<User> {
        let res = self.service.get_profile(&self.me.uid, force).await;
        if let Ok(user) = &res {
            self.records.upsert(user.clone());
        }
        report(&self.alerts, res.map_err(Into::into))
    }

    pub async fn save(&self, update: &ProfileUpdate) -> crate::Result<User> {
        let res = self.service.save_profile(&self.me.uid, update).await;
        if let Ok(user) = &res {
            self.records.upsert(user.clone());
            self.alerts
                .raise(Alert::new("Success", "Profile updated successfully"));
        }
        report(&self.alerts, res.map_err(Into::into))
    }

    pub async fn upload_picture(&self, data: Bytes, content_type: &str) -> crate::Result<Url> {
        let res = self
            .service
            .upload_profile_picture(&self.me.uid, data, content_type)
            .await;
        let url = report(&self.alerts, res.map_err(Into::into))?;

        if let Some(mut user) = self.profile() {
            user.profile_picture = Some(url.to_string());
            self.records.upsert(user);
        }
        Ok(url)
    }
}
