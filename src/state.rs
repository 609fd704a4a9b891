use std::sync::Arc;

use log::info;

use crate::auth::service::MemoryAuth;
use crate::cache::client::{MemoryKv, RedisKv};
use crate::cache::{Kv, LocalCache};
use crate::chat::model::Chat;
use crate::chat::service::ChatServiceImpl;
use crate::clock::{self, SystemClock};
use crate::context::AppStore;
use crate::entity::Entities;
use crate::friend::service::FriendServiceImpl;
use crate::group::service::GroupServiceImpl;
use crate::integration::{self, Config};
use crate::notification::model::Notification;
use crate::notification::service::NotificationServiceImpl;
use crate::post::model::Post;
use crate::post::service::PostServiceImpl;
use crate::session::service::SessionServiceImpl;
use crate::storage::MemoryStorage;
use crate::store::Store;
use crate::store::memory::MemoryStore;
use crate::user::model::User;
use crate::user::repository::StoreUserRepository;
use crate::user::service::UserServiceImpl;
use crate::{auth, chat, friend, group, notification, post, session, storage, user};

/// The remote collaborators every service is built on.
#[derive(Clone)]
pub struct Backends {
    pub store: Store,
    pub auth: auth::Backend,
    pub storage: storage::Storage,
    pub kv: Kv,
    pub clock: clock::Shared,
}

impl Backends {
    pub fn in_memory(config: &Config) -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            auth: Arc::new(MemoryAuth::new()),
            storage: Arc::new(MemoryStorage::new(config.storage_base_url.clone())),
            kv: Arc::new(MemoryKv::new()),
            clock: Arc::new(SystemClock),
        }
    }
}

/// Central record store shared by screens, so the same document seen
/// through two queries is one value.
#[derive(Clone, Default)]
pub struct Records {
    pub posts: Entities<Post>,
    pub users: Entities<User>,
    pub chats: Entities<Chat>,
    pub notifications: Entities<Notification>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Store,
    pub auth: auth::Backend,
    pub storage: storage::Storage,
    pub cache: LocalCache,
    pub app: AppStore,
    pub records: Records,

    pub users: user::Service,
    pub posts: post::Service,
    pub chats: chat::Service,
    pub groups: group::Service,
    pub friends: friend::Service,
    pub notifications: notification::Service,
    pub session: session::Service,
}

impl AppState {
    pub async fn init(config: &Config) -> integration::Result<Self> {
        let mut backends = Backends::in_memory(config);

        if let Some(redis) = &config.redis {
            let con = integration::cache::init(redis).await?;
            backends.kv = Arc::new(RedisKv::new(con));
            info!("local cache backed by redis at {}", redis.url());
        }

        Ok(Self::with_backends(config.clone(), backends))
    }

    pub fn with_backends(config: Config, backends: Backends) -> Self {
        let Backends {
            store,
            auth,
            storage,
            kv,
            clock,
        } = backends;

        let cache = LocalCache::new(kv, &config.cache_namespace, config.cache_ttl, clock.clone());

        let users: user::Service = Arc::new(UserServiceImpl::new(
            Arc::new(StoreUserRepository::new(store.clone())),
            auth.clone(),
            cache.clone(),
            storage.clone(),
            clock,
        ));

        let session: session::Service = Arc::new(SessionServiceImpl::new(
            auth.clone(),
            users.clone(),
            store.clone(),
            storage.clone(),
            cache.clone(),
        ));

        Self {
            posts: Arc::new(PostServiceImpl::new(store.clone())),
            chats: Arc::new(ChatServiceImpl::new(store.clone())),
            groups: Arc::new(GroupServiceImpl::new(store.clone(), storage.clone())),
            friends: Arc::new(FriendServiceImpl::new(store.clone())),
            notifications: Arc::new(NotificationServiceImpl::new(store.clone())),
            users,
            session,
            config,
            store,
            auth,
            storage,
            cache,
            app: AppStore::new(),
            records: Records::default(),
        }
    }
}
