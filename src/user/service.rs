use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, warn};
use url::Url;

use super::model::{ProfileUpdate, User};
use super::{Error, Id, Repository};
use crate::cache::LocalCache;
use crate::{auth, clock, storage};

#[async_trait]
pub trait UserService {
    async fn create(&self, user: &User) -> super::Result<()>;

    /// Cache first for the signed-in user, backend otherwise.
    async fn get_profile(&self, id: &Id, force_refresh: bool) -> super::Result<User>;

    async fn find_profile(&self, id: &Id) -> super::Result<Option<User>>;

    async fn find_by_ids(&self, ids: &[Id]) -> super::Result<Vec<User>>;

    async fn save_profile(&self, id: &Id, update: &ProfileUpdate) -> super::Result<User>;

    async fn upload_profile_picture(
        &self,
        id: &Id,
        data: Bytes,
        content_type: &str,
    ) -> super::Result<Url>;

    /// Everyone but `me`.
    async fn directory(&self, me: &Id) -> super::Result<Vec<User>>;

    async fn search(&self, me: &Id, name: &str) -> super::Result<Vec<User>>;
}

#[derive(Clone)]
pub struct UserServiceImpl {
    repo: Repository,
    auth: auth::Backend,
    cache: LocalCache,
    storage: storage::Storage,
    clock: clock::Shared,
}

impl UserServiceImpl {
    pub fn new(
        repo: Repository,
        auth: auth::Backend,
        cache: LocalCache,
        storage: storage::Storage,
        clock: clock::Shared,
    ) -> Self {
        Self {
            repo,
            auth,
            cache,
            storage,
            clock,
        }
    }
}

#[async_trait]
impl UserService for UserServiceImpl {
    async fn create(&self, user: &User) -> super::Result<()> {
        self.repo.insert(user).await
    }

    async fn get_profile(&self, id: &Id, force_refresh: bool) -> super::Result<User> {
        let is_self = self.is_signed_in_as(id);

        if is_self {
            if let Some(cached) = self.cache.get_user_profile(force_refresh).await {
                if &cached.id == id {
                    debug!("profile of {id} served from cache");
                    return Ok(cached);
                }
            }
        }

        let user = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.clone()))?;

        if is_self {
            self.cache.save_user_profile(&user).await;
        }
        Ok(user)
    }

    async fn find_profile(&self, id: &Id) -> super::Result<Option<User>> {
        self.repo.find_by_id(id).await
    }

    async fn find_by_ids(&self, ids: &[Id]) -> super::Result<Vec<User>> {
        self.repo.find_by_ids(ids).await
    }

    async fn save_profile(&self, id: &Id, update: &ProfileUpdate) -> super::Result<User> {
        if update.name.trim().is_empty() {
            return Err(Error::MissingName);
        }

        self.repo.update_profile(id, update).await?;

        if self.is_signed_in_as(id) {
            self.auth
                .update_profile(Some(update.name.clone()), update.profile_picture.clone())
                .await?;
        }

        self.refresh(id).await
    }

    async fn upload_profile_picture(
        &self,
        id: &Id,
        data: Bytes,
        content_type: &str,
    ) -> super::Result<Url> {
        let path = storage::profile_picture_path(id, self.clock.now().timestamp_millis());
        let url = self.storage.put(&path, data, content_type).await?;

        self.repo.set_picture(id, url.as_str()).await?;
        if self.is_signed_in_as(id) {
            self.auth
                .update_profile(None, Some(url.to_string()))
                .await?;
        }

        if let Err(e) = self.refresh(id).await {
            warn!("failed to refresh cached profile of {id}: {e}");
        }
        Ok(url)
    }

    async fn directory(&self, me: &Id) -> super::Result<Vec<User>> {
        self.repo.find_all_except(me).await
    }

    async fn search(&self, me: &Id, name: &str) -> super::Result<Vec<User>> {
        let users = self.directory(me).await?;
        Ok(filter_by_name(users, name))
    }
}

impl UserServiceImpl {
    fn is_signed_in_as(&self, id: &Id) -> bool {
        self.auth.current().is_some_and(|p| &p.uid == id)
    }

    async fn refresh(&self, id: &Id) -> super::Result<User> {
        let user = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.clone()))?;

        if self.is_signed_in_as(id) {
            self.cache.save_user_profile(&user).await;
        }
        Ok(user)
    }
}

/// Case-insensitive substring match on the display name. A blank query matches everyone.
pub fn filter_by_name(users: Vec<User>, name: &str) -> Vec<User> {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return users;
    }
    users
        .into_iter()
        .filter(|u| u.name.to_lowercase().contains(&needle))
        .collect()
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{TimeDelta, Utc};

    use super::*;
    use crate::auth::service::{AuthBackend, MemoryAuth};
    use crate::cache::client::MemoryKv;
    use crate::clock::ManualClock;
    use crate::store::memory::MemoryStore;
    use crate::storage::MemoryStorage;
    use crate::user::repository::StoreUserRepository;

    struct Fixture {
        store: MemoryStore,
        auth: MemoryAuth,
        clock: ManualClock,
        service: UserServiceImpl,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let auth = MemoryAuth::new();
        let clock = ManualClock::new(Utc::now());
        let cache = LocalCache::new(
            Arc::new(MemoryKv::new()),
            "@focushub",
            Duration::from_secs(300),
            Arc::new(clock.clone()),
        );
        let service = UserServiceImpl::new(
            Arc::new(StoreUserRepository::new(Arc::new(store.clone()))),
            Arc::new(auth.clone()),
            cache,
            Arc::new(MemoryStorage::new(Url::parse("memory://focus-hub/").unwrap())),
            Arc::new(clock.clone()),
        );
        Fixture {
            store,
            auth,
            clock,
            service,
        }
    }

    async fn signed_up(f: &Fixture) -> Id {
        let principal = f.auth.sign_up("jora@focushub.app", "secret1").await.unwrap();
        f.service
            .create(&User::new(principal.uid.clone(), "Jora", "jora@focushub.app"))
            .await
            .unwrap();
        principal.uid
    }

    #[tokio::test]
    async fn should_serve_own_profile_from_cache_within_ttl() {
        let f = fixture();
        let me = signed_up(&f).await;

        f.service.get_profile(&me, false).await.unwrap();
        let reads = f.store.stats().reads;
        f.clock.advance(TimeDelta::minutes(4));
        f.service.get_profile(&me, false).await.unwrap();
        assert_eq!(f.store.stats().reads, reads);

        f.clock.advance(TimeDelta::minutes(2));
        f.service.get_profile(&me, false).await.unwrap();
        assert_eq!(f.store.stats().reads, reads + 1);
    }

    #[tokio::test]
    async fn should_bypass_cache_on_force_refresh() {
        let f = fixture();
        let me = signed_up(&f).await;
        f.service.get_profile(&me, false).await.unwrap();
        let reads = f.store.stats().reads;

        f.service.get_profile(&me, true).await.unwrap();

        assert_eq!(f.store.stats().reads, reads + 1);
    }

    #[tokio::test]
    async fn should_save_profile_and_sync_display_name() {
        let f = fixture();
        let me = signed_up(&f).await;
        let update = ProfileUpdate {
            name: "Jora Cardan".into(),
            university: "UTM".into(),
            ..Default::default()
        };

        let saved = f.service.save_profile(&me, &update).await.unwrap();

        assert_eq!(saved.name, "Jora Cardan");
        assert_eq!(saved.email, "jora@focushub.app");
        assert!(saved.last_updated.is_some());
        assert_eq!(
            f.auth.current().unwrap().display_name.as_deref(),
            Some("Jora Cardan")
        );
    }

    #[tokio::test]
    async fn should_require_name() {
        let f = fixture();
        let me = signed_up(&f).await;
        let writes = f.store.stats().writes;

        let res = f.service.save_profile(&me, &ProfileUpdate::default()).await;

        assert!(matches!(res, Err(Error::MissingName)));
        assert_eq!(f.store.stats().writes, writes);
    }

    #[tokio::test]
    async fn should_upload_picture() {
        let f = fixture();
        let me = signed_up(&f).await;

        let url = f
            .service
            .upload_profile_picture(&me, Bytes::from_static(b"jpg"), "image/jpeg")
            .await
            .unwrap();

        assert!(url.path().starts_with(&format!("/profile_pictures/{me}/")));
        let user = f.service.get_profile(&me, false).await.unwrap();
        assert_eq!(user.profile_picture.as_deref(), Some(url.as_str()));
        assert_eq!(f.auth.current().unwrap().photo_url, Some(url.to_string()));
    }

    #[test]
    fn should_filter_by_name_ignoring_case() {
        let users = vec![
            User::new(Id::from("u1"), "Valera", "v@x.y"),
            User::new(Id::from("u2"), "Radu", "r@x.y"),
        ];

        let found = filter_by_name(users.clone(), "  vAL ");

        assert_eq!(found.len(), 1);
        assert_eq!(filter_by_name(users, "").len(), 2);
    }
}
