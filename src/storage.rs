use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use url::Url;

use crate::user;

type Result<T> = std::result::Result<T, Error>;
pub type Storage = Arc<dyn ObjectStorage + Send + Sync>;

pub fn profile_picture_path(uid: &user::Id, millis: i64) -> String {
    format!("profile_pictures/{uid}/{millis}")
}

pub fn group_image_path(uid: &user::Id, millis: i64) -> String {
    format!("group_images/{uid}/{millis}")
}

#[async_trait]
pub trait ObjectStorage {
    /// Stores the object and returns its download URL.
    async fn put(&self, path: &str, data: Bytes, content_type: &str) -> Result<Url>;

    async fn get(&self, url: &Url) -> Result<Bytes>;

    async fn delete(&self, url: &Url) -> Result<()>;
}

struct Object {
    data: Bytes,
    content_type: String,
}

#[derive(Default)]
struct Inner {
    objects: HashMap<String, Object>,
    failing: bool,
}

#[derive(Clone)]
pub struct MemoryStorage {
    base: Url,
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStorage {
    pub fn new(base: Url) -> Self {
        Self {
            base,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    pub fn content_type(&self, url: &Url) -> Option<String> {
        let path = self.path_of(url).ok()?;
        self.lock()
            .objects
            .get(&path)
            .map(|o| o.content_type.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn path_of(&self, url: &Url) -> Result<String> {
        url.as_str()
            .strip_prefix(self.base.as_str())
            .map(str::to_string)
            .ok_or_else(|| Error::NotFound(url.to_string()))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn put(&self, path: &str, data: Bytes, content_type: &str) -> Result<Url> {
        let url = self.base.join(path.trim_start_matches('/'))?;

        let mut inner = self.lock();
        if inner.failing {
            return Err(Error::Unavailable("upload failed".into()));
        }
        inner.objects.insert(
            self.path_of(&url)?,
            Object {
                data,
                content_type: content_type.to_string(),
            },
        );
        debug!("stored object at {url}");

        Ok(url)
    }

    async fn get(&self, url: &Url) -> Result<Bytes> {
        let path = self.path_of(url)?;
        self.lock()
            .objects
            .get(&path)
            .map(|o| o.data.clone())
            .ok_or_else(|| Error::NotFound(url.to_string()))
    }

    async fn delete(&self, url: &Url) -> Result<()> {
        let path = self.path_of(url)?;
        let mut inner = self.lock();
        if inner.failing {
            return Err(Error::Unavailable("delete failed".into()));
        }
        inner
            .objects
            .remove(&path)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(url.to_string()))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("object storage unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    _Url(#[from] url::ParseError),
}

#[cfg(test)]
mod test {
    use super::*;

    fn storage() -> MemoryStorage {
        MemoryStorage::new(Url::parse("memory://focus-hub/").unwrap())
    }

    #[tokio::test]
    async fn should_put_get_delete() {
        let storage = storage();
        let path = profile_picture_path(&user::Id::from("u1"), 1_700_000_000_000);

        let url = storage
            .put(&path, Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();

        assert_eq!(
            url.as_str(),
            "memory://focus-hub/profile_pictures/u1/1700000000000"
        );
        assert_eq!(storage.get(&url).await.unwrap(), Bytes::from_static(b"png"));
        assert_eq!(storage.content_type(&url), Some("image/png".into()));

        storage.delete(&url).await.unwrap();
        assert!(matches!(storage.get(&url).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn should_fail_uploads_when_told_to() {
        let storage = storage();
        storage.set_failing(true);

        let res = storage
            .put("group_images/u1/1", Bytes::new(), "image/png")
            .await;

        assert!(matches!(res, Err(Error::Unavailable(_))));
        assert!(storage.is_empty());
    }
}
