use async_trait::async_trait;
use log::{info, warn};
use url::Url;

use super::Error;
use super::model::{self, SignUpForm};
use crate::auth::{self, Principal};
use crate::cache::LocalCache;
use crate::store::{Query, Store, WriteBatch};
use crate::user::model::User;
use crate::{friend, notification, storage, user};

#[async_trait]
pub trait SessionService {
    async fn sign_up(&self, form: SignUpForm) -> super::Result<User>;

    /// Fails with `ProfileMissing` and signs out again when the account
    /// has no profile document.
    async fn sign_in(&self, email: &str, password: &str) -> super::Result<User>;

    async fn sign_out(&self) -> super::Result<()>;

    async fn reset_password(&self, email: &str) -> super::Result<()>;

    async fn delete_account(&self, me: &Principal) -> super::Result<()>;
}

#[derive(Clone)]
pub struct SessionServiceImpl {
    auth: auth::Backend,
    users: user::Service,
    store: Store,
    storage: storage::Storage,
    cache: LocalCache,
}

impl SessionServiceImpl {
    pub fn new(
        auth: auth::Backend,
        users: user::Service,
        store: Store,
        storage: storage::Storage,
        cache: LocalCache,
    ) -> Self {
        Self {
            auth,
            users,
            store,
            storage,
            cache,
        }
    }
}

#[async_trait]
impl SessionService for SessionServiceImpl {
    async fn sign_up(&self, form: SignUpForm) -> super::Result<User> {
        let errors = form.validate();
        if !errors.is_empty() {
            return Err(Error::Invalid(errors));
        }

        let principal = self.auth.sign_up(form.email.trim(), &form.password).await?;
        self.auth
            .update_profile(Some(form.name.trim().to_string()), None)
            .await?;

        let user = form.into_user(principal.uid);
        self.users.create(&user).await?;
        self.cache.save_user_profile(&user).await;
        info!("signed up {}", user.id);

        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> super::Result<User> {
        let errors = model::validate_credentials(email, password);
        if !errors.is_empty() {
            return Err(Error::Invalid(errors));
        }

        let principal = self.auth.sign_in(email.trim(), password).await?;

        let Some(user) = self.users.find_profile(&principal.uid).await? else {
            warn!("account {} has no profile", principal.uid);
            self.auth.sign_out().await?;
            return Err(Error::ProfileMissing(principal.uid));
        };

        self.cache.save_user_profile(&user).await;
        Ok(user)
    }

    async fn sign_out(&self) -> super::Result<()> {
        self.auth.sign_out().await?;
        self.cache.clear().await;
        Ok(())
    }

    async fn reset_password(&self, email: &str) -> super::Result<()> {
        if email.trim().is_empty() {
            return Err(Error::Invalid(vec![(
                auth::Field::Email,
                "Email is required".to_string(),
            )]));
        }
        self.auth.send_password_reset(email.trim()).await?;
        Ok(())
    }

    async fn delete_account(&self, me: &Principal) -> super::Result<()> {
        let uid = &me.uid;
        let profile = self.users.find_profile(uid).await?;

        let mut batch = WriteBatch::new();

        for edge in self.store.query(&friend::service::friends_query(uid)).await? {
            let friend = user::Id::from(edge.id());
            batch.delete(user::friends(&friend).doc(uid));
            batch.delete(edge.path);
        }

        let addressed = Query::collection(&notification::collection()).where_eq("userId", uid);
        for doc in self.store.query(&addressed).await? {
            batch.delete(doc.path);
        }

        for field in ["from", "to"] {
            let q = Query::collection(&friend::requests()).where_eq(field, uid);
            for doc in self.store.query(&q).await? {
                batch.delete(doc.path);
            }
        }

        batch.delete(user::collection().doc(uid));
        self.store.commit(batch).await?;

        if let Some(picture) = profile.and_then(|p| p.profile_picture) {
            match Url::parse(&picture) {
                Ok(url) => {
                    if let Err(e) = self.storage.delete(&url).await {
                        warn!("failed to delete profile picture of {uid}: {e}");
                    }
                }
                Err(e) => warn!("profile picture of {uid} is not a url: {e}"),
            }
        }

        self.auth.delete_current().await?;
        self.cache.clear().await;
        info!("account {uid} deleted");

        Ok(())
    }
}
