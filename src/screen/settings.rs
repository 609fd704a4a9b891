use log::info;
use serde_json::Value;

use super::report;
use crate::alert::{Alert, Alerts};
use crate::auth::Principal;
use crate::cache::LocalCache;
use crate::context::{AppStore, Theme};
use crate::session;
use crate::state::AppState;
use crate::store::Fields;

pub struct SettingsScreen {
    me: Principal,
    cache: LocalCache,
    session: session::Service,
    app: AppStore,
    alerts: Alerts,
}

impl SettingsScreen {
    /// Applies the cached theme, if any.
    pub async fn mount(state: &AppState, me: Principal) -> Self {
        if let Some(settings) = state.cache.get_settings().await {
            state.app.set_theme(Theme::from_dark_mode(settings.dark_mode));
        }

        Self {
            me,
            cache: state.cache.clone(),
            session: state.session.clone(),
            app: state.app.clone(),
            alerts: state.app.alerts().clone(),
        }
    }

    pub fn theme(&self) -> Theme {
        self.app.snapshot().theme
    }

    pub async fn toggle_dark_mode(&self) -> Theme {
        let dark = !self.theme().is_dark();

        let mut partial = Fields::new();
        partial.insert("darkMode".into(), Value::Bool(dark));
        let settings = self.cache.merge_settings(partial).await;

        let theme = Theme::from_dark_mode(settings.dark_mode);
        self.app.set_theme(theme);
        self.alerts.raise(Alert::new(
            "Theme Changed",
            if theme.is_dark() {
                "Dark mode enabled"
            } else {
                "Light mode enabled"
            },
        ));
        theme
    }

    pub async fn sign_out(&self) -> crate::Result<()> {
        let res = self.session.sign_out().await;
        report(&self.alerts, res.map_err(Into::into))
    }

    /// Deletes every trace of the account, then signs out locally.
    pub async fn delete_account(&self) -> crate::Result<()> {
        let res = self.session.delete_account(&self.me).await;
        if res.is_ok() {
            info!("account {} deleted", self.me.uid);
            self.app.set_principal(None);
        }
        report(&self.alerts, res.map_err(Into::into))
    }
}
