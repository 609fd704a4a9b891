use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use redis::AsyncCommands;

use super::Error;

/// Durable string key/value storage the local cache is written against.
#[async_trait]
pub trait KeyValueStore {
    async fn get(&self, key: &str) -> super::Result<Option<String>>;

    async fn set(&self, key: &str, value: String) -> super::Result<()>;

    async fn remove_many(&self, keys: &[String]) -> super::Result<()>;
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, String>,
    failing: bool,
}

#[derive(Clone, Default)]
pub struct MemoryKv {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys = self.lock().entries.keys().cloned().collect::<Vec<_>>();
        keys.sort();
        keys
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn checked(&self) -> super::Result<MutexGuard<'_, Inner>> {
        let inner = self.lock();
        if inner.failing {
            return Err(Error::Unavailable("storage is failing".into()));
        }
        Ok(inner)
    }
}

#[async_trait]
impl KeyValueStore for MemoryKv {
    async fn get(&self, key: &str) -> super::Result<Option<String>> {
        Ok(self.checked()?.entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> super::Result<()> {
        self.checked()?.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove_many(&self, keys: &[String]) -> super::Result<()> {
        let mut inner = self.checked()?;
        for k in keys {
            inner.entries.remove(k);
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct RedisKv {
    con: redis::aio::ConnectionManager,
}

impl RedisKv {
    pub fn new(con: redis::aio::ConnectionManager) -> Self {
        Self { con }
    }
}

#[async_trait]
impl KeyValueStore for RedisKv {
    async fn get(&self, key: &str) -> super::Result<Option<String>> {
        let mut con = self.con.clone();
        let value: Option<String> = con.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> super::Result<()> {
        let mut con = self.con.clone();
        let _: () = con.set(key, value).await?;
        Ok(())
    }

    async fn remove_many(&self, keys: &[String]) -> super::Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut con = self.con.clone();
        let _: () = con.del(keys.to_vec()).await?;
        Ok(())
    }
}
