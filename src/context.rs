use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::alert::Alerts;
use crate::auth::Principal;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn from_dark_mode(dark: bool) -> Self {
        if dark { Theme::Dark } else { Theme::Light }
    }

    pub fn is_dark(&self) -> bool {
        matches!(self, Theme::Dark)
    }
}

/// Process-wide view of who is signed in and how the app is themed.
/// Replaced as a whole, never mutated in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppContext {
    pub principal: Option<Principal>,
    pub theme: Theme,
}

/// Explicitly passed holder of the [`AppContext`] and the alert channel.
#[derive(Clone)]
pub struct AppStore {
    ctx: Arc<watch::Sender<AppContext>>,
    alerts: Alerts,
}

impl Default for AppStore {
    fn default() -> Self {
        let (tx, _) = watch::channel(AppContext::default());
        Self {
            ctx: Arc::new(tx),
            alerts: Alerts::new(),
        }
    }
}

impl AppStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> AppContext {
        self.ctx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AppContext> {
        self.ctx.subscribe()
    }

    pub fn set_principal(&self, principal: Option<Principal>) {
        self.ctx.send_if_modified(|ctx| {
            if ctx.principal == principal {
                return false;
            }
            *ctx = AppContext {
                principal: principal.clone(),
                theme: ctx.theme,
            };
            true
        });
    }

    pub fn set_theme(&self, theme: Theme) {
        self.ctx.send_if_modified(|ctx| {
            if ctx.theme == theme {
                return false;
            }
            *ctx = AppContext {
                principal: ctx.principal.clone(),
                theme,
            };
            true
        });
    }

    pub fn alerts(&self) -> &Alerts {
        &self.alerts
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::user;

    fn principal() -> Principal {
        Principal {
            uid: user::Id::from("u1"),
            email: "jora@focushub.app".into(),
            display_name: Some("jora".into()),
            photo_url: None,
        }
    }

    #[test]
    fn should_replace_context_and_keep_theme() {
        let store = AppStore::new();
        store.set_theme(Theme::Dark);

        store.set_principal(Some(principal()));

        let ctx = store.snapshot();
        assert_eq!(ctx.principal, Some(principal()));
        assert!(ctx.theme.is_dark());
    }

    #[test]
    fn should_not_notify_on_same_value() {
        let store = AppStore::new();
        let mut rx = store.subscribe();
        rx.borrow_and_update();

        store.set_theme(Theme::Light);

        assert!(!rx.has_changed().unwrap());
    }
}
