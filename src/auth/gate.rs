use log::debug;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{AuthState, Backend, Principal};
use crate::context::AppStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Welcome,
    Login,
    SignUp,
    ForgetPassword,
    Home,
    Feed,
    Profile,
    EditProfile,
    Explore,
    ChatList,
    OneOnOneChat,
    GroupChatScreen,
    NotificationScreen,
    SettingsScreen,
    FirebaseTest,
}

impl Route {
    pub const PUBLIC: [Route; 4] = [
        Route::Welcome,
        Route::Login,
        Route::SignUp,
        Route::ForgetPassword,
    ];

    pub const PRIVATE: [Route; 11] = [
        Route::Home,
        Route::Feed,
        Route::Profile,
        Route::EditProfile,
        Route::Explore,
        Route::ChatList,
        Route::OneOnOneChat,
        Route::GroupChatScreen,
        Route::NotificationScreen,
        Route::SettingsScreen,
        Route::FirebaseTest,
    ];

    pub fn is_private(&self) -> bool {
        Self::PRIVATE.contains(self)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateState {
    /// No auth event yet; nothing is rendered.
    Loading,
    Public,
    Private(Principal),
}

impl GateState {
    pub fn routes(&self) -> &'static [Route] {
        match self {
            GateState::Loading => &[],
            GateState::Public => &Route::PUBLIC,
            GateState::Private(_) => &Route::PRIVATE,
        }
    }

    pub fn initial_route(&self) -> Option<Route> {
        self.routes().first().copied()
    }

    fn from_auth(state: &AuthState) -> Self {
        match state {
            AuthState::Unknown => GateState::Loading,
            AuthState::SignedOut => GateState::Public,
            AuthState::SignedIn(p) => GateState::Private(p.clone()),
        }
    }
}

/// Root-level switch between the public and the private route set.
pub struct AuthGate {
    state: watch::Receiver<GateState>,
    task: Option<JoinHandle<()>>,
}

impl AuthGate {
    pub fn mount(auth: Backend, store: AppStore) -> Self {
        let (tx, rx) = watch::channel(GateState::Loading);
        let mut changes = auth.state_changes();

        let task = tokio::spawn(async move {
            loop {
                {
                    let current = changes.borrow_and_update();
                    if !matches!(*current, AuthState::Unknown) {
                        store.set_principal(current.principal().cloned());
                    }
                    let next = GateState::from_auth(&current);
                    tx.send_if_modified(|s| {
                        if *s == next {
                            return false;
                        }
                        debug!("auth gate switched to {next:?}");
                        *s = next;
                        true
                    });
                }

                if changes.changed().await.is_err() {
                    break;
                }
            }
        });

        Self {
            state: rx,
            task: Some(task),
        }
    }

    pub fn state(&self) -> GateState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GateState> {
        self.state.clone()
    }

    /// Resolves on the first auth event. Never resolves if the backend
    /// stays silent.
    pub async fn ready(&self) -> GateState {
        let mut rx = self.state.clone();
        let state = match rx.wait_for(|s| *s != GateState::Loading).await {
            Ok(s) => s.clone(),
            Err(_) => self.state(),
        };
        state
    }

    pub fn unmount(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("auth gate unmounted");
        }
    }
}

impl Drop for AuthGate {
    fn drop(&mut self) {
        self.stop();
    }
}
