use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use log::{debug, info};
use tokio::sync::watch;

use super::{AuthState, Error, Principal};
use crate::user;

#[async_trait]
pub trait AuthBackend {
    async fn sign_up(&self, email: &str, password: &str) -> super::Result<Principal>;

    async fn sign_in(&self, email: &str, password: &str) -> super::Result<Principal>;

    async fn sign_out(&self) -> super::Result<()>;

    fn current(&self) -> Option<Principal>;

    /// Stream of session changes; starts at whatever the backend knows now.
    fn state_changes(&self) -> watch::Receiver<AuthState>;

    async fn update_profile(
        &self,
        display_name: Option<String>,
        photo_url: Option<String>,
    ) -> super::Result<Principal>;

    async fn send_password_reset(&self, email: &str) -> super::Result<()>;

    async fn delete_current(&self) -> super::Result<()>;
}

struct Account {
    principal: Principal,
    password: String,
}

#[derive(Default)]
struct Inner {
    accounts: HashMap<String, Account>,
    current: Option<String>,
    password_resets: Vec<String>,
    offline: bool,
}

impl Inner {
    fn check_online(&self) -> super::Result<()> {
        if self.offline {
            return Err(Error::Unavailable("network unavailable".into()));
        }
        Ok(())
    }

    fn current_principal(&self) -> Option<Principal> {
        self.current
            .as_ref()
            .and_then(|email| self.accounts.get(email))
            .map(|a| a.principal.clone())
    }

    fn state(&self) -> AuthState {
        match self.current_principal() {
            Some(p) => AuthState::SignedIn(p),
            None => AuthState::SignedOut,
        }
    }
}

/// Email/password accounts kept in memory. The session state stays
/// `Unknown` until [`MemoryAuth::restore_session`] or a sign-in/up fires.
#[derive(Clone)]
pub struct MemoryAuth {
    inner: Arc<Mutex<Inner>>,
    state: Arc<watch::Sender<AuthState>>,
}

impl Default for MemoryAuth {
    fn default() -> Self {
        let (tx, _) = watch::channel(AuthState::Unknown);
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            state: Arc::new(tx),
        }
    }
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the first session event, as an SDK does once it has read its
    /// persisted session.
    pub fn restore_session(&self) {
        let state = self.lock().state();
        self.state.send_replace(state);
    }

    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    pub fn password_resets(&self) -> Vec<String> {
        self.lock().password_resets.clone()
    }

    fn publish(&self, inner: &Inner) {
        self.state.send_replace(inner.state());
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl AuthBackend for MemoryAuth {
    async fn sign_up(&self, email: &str, password: &str) -> super::Result<Principal> {
        super::validate_email(email)?;
        super::validate_password(password)?;

        let mut inner = self.lock();
        inner.check_online()?;

        let key = normalize(email);
        if inner.accounts.contains_key(&key) {
            return Err(Error::EmailInUse(email.to_string()));
        }

        let principal = Principal {
            uid: user::Id::random(),
            email: key.clone(),
            display_name: None,
            photo_url: None,
        };
        inner.accounts.insert(
            key.clone(),
            Account {
                principal: principal.clone(),
                password: password.to_string(),
            },
        );
        inner.current = Some(key);
        info!("account created for {}", principal.uid);

        self.publish(&inner);
        Ok(principal)
    }

    async fn sign_in(&self, email: &str, password: &str) -> super::Result<Principal> {
        super::validate_email(email)?;

        let mut inner = self.lock();
        inner.check_online()?;

        let key = normalize(email);
        let principal = match inner.accounts.get(&key) {
            None => return Err(Error::UserNotFound(email.to_string())),
            Some(a) if a.password != password => return Err(Error::WrongPassword),
            Some(a) => a.principal.clone(),
        };
        inner.current = Some(key);
        debug!("signed in {}", principal.uid);

        self.publish(&inner);
        Ok(principal)
    }

    async fn sign_out(&self) -> super::Result<()> {
        let mut inner = self.lock();
        inner.current = None;
        self.publish(&inner);
        Ok(())
    }

    fn current(&self) -> Option<Principal> {
        self.lock().current_principal()
    }

    fn state_changes(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    async fn update_profile(
        &self,
        display_name: Option<String>,
        photo_url: Option<String>,
    ) -> super::Result<Principal> {
        let mut inner = self.lock();
        inner.check_online()?;

        let key = inner.current.clone().ok_or(Error::NotSignedIn)?;
        let account = inner.accounts.get_mut(&key).ok_or(Error::NotSignedIn)?;
        if display_name.is_some() {
            account.principal.display_name = display_name;
        }
        if photo_url.is_some() {
            account.principal.photo_url = photo_url;
        }
        let principal = account.principal.clone();

        self.publish(&inner);
        Ok(principal)
    }

    async fn send_password_reset(&self, email: &str) -> super::Result<()> {
        super::validate_email(email)?;

        let mut inner = self.lock();
        inner.check_online()?;

        let key = normalize(email);
        if !inner.accounts.contains_key(&key) {
            return Err(Error::UserNotFound(email.to_string()));
        }
        inner.password_resets.push(key);
        Ok(())
    }

    async fn delete_current(&self) -> super::Result<()> {
        let mut inner = self.lock();
        inner.check_online()?;

        let key = inner.current.take().ok_or(Error::NotSignedIn)?;
        inner.accounts.remove(&key);
        info!("account deleted for {key}");

        self.publish(&inner);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn should_sign_up_and_in() {
        let auth = MemoryAuth::new();

        let created = auth.sign_up("Jora@FocusHub.app", "secret1").await.unwrap();
        auth.sign_out().await.unwrap();
        let signed_in = auth.sign_in("jora@focushub.app", "secret1").await.unwrap();

        assert_eq!(created.uid, signed_in.uid);
        assert_eq!(auth.current(), Some(signed_in));
    }

    #[tokio::test]
    async fn should_reject_duplicate_email() {
        let auth = MemoryAuth::new();
        auth.sign_up("jora@focushub.app", "secret1").await.unwrap();

        let res = auth.sign_up("jora@focushub.app", "secret2").await;

        assert_eq!(res, Err(Error::EmailInUse("jora@focushub.app".into())));
    }

    #[tokio::test]
    async fn should_reject_wrong_password_and_unknown_user() {
        let auth = MemoryAuth::new();
        auth.sign_up("jora@focushub.app", "secret1").await.unwrap();

        assert_eq!(
            auth.sign_in("jora@focushub.app", "nope").await,
            Err(Error::WrongPassword)
        );
        assert_eq!(
            auth.sign_in("valera@focushub.app", "secret1").await,
            Err(Error::UserNotFound("valera@focushub.app".into()))
        );
    }

    #[tokio::test]
    async fn should_stay_unknown_until_restored() {
        let auth = MemoryAuth::new();
        let rx = auth.state_changes();
        assert_eq!(*rx.borrow(), AuthState::Unknown);

        auth.restore_session();

        assert_eq!(*rx.borrow(), AuthState::SignedOut);
    }

    #[tokio::test]
    async fn should_fail_when_offline() {
        let auth = MemoryAuth::new();
        auth.set_offline(true);

        assert!(matches!(
            auth.sign_up("jora@focushub.app", "secret1").await,
            Err(Error::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn should_record_password_reset() {
        let auth = MemoryAuth::new();
        auth.sign_up("jora@focushub.app", "secret1").await.unwrap();

        auth.send_password_reset("jora@focushub.app").await.unwrap();

        assert_eq!(auth.password_resets(), vec!["jora@focushub.app".to_string()]);
    }
}
