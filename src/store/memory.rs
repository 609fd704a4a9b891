use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use log::{debug, warn};
use tokio::sync::mpsc;

use super::model::{self, Document, Fields, Snapshot, WriteBatch, WriteOp};
use super::{CollectionPath, DocPath, DocumentStore, Error, ListenerId, Query, Registration};
use crate::clock;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub reads: usize,
    pub writes: usize,
    pub listens: usize,
    pub unlistens: usize,
    pub active_listeners: usize,
}

struct Watcher {
    query: Query,
    tx: mpsc::UnboundedSender<super::Result<Snapshot>>,
}

#[derive(Default)]
struct Inner {
    docs: BTreeMap<DocPath, Fields>,
    watchers: HashMap<ListenerId, Watcher>,
    next_listener: u64,
    denied: Vec<String>,
    fail_write_in: Option<usize>,
    stats: Stats,
}

impl Inner {
    fn check_allowed(&self, path: &str) -> super::Result<()> {
        let path = path.trim_matches('/');
        if self.denied.iter().any(|p| path.starts_with(p.as_str())) {
            return Err(Error::PermissionDenied(path.to_string()));
        }
        Ok(())
    }

    fn snapshot(&self, q: &Query) -> Snapshot {
        let docs = self
            .docs
            .iter()
            .filter(|(path, _)| path.collection() == &q.collection)
            .map(|(path, data)| Document::new(path.clone(), data.clone()))
            .collect::<Vec<_>>();

        Snapshot {
            docs: q.apply(docs.iter()),
        }
    }

    fn notify(&self, touched: &HashSet<CollectionPath>) {
        for (id, w) in &self.watchers {
            if !touched.contains(&w.query.collection) {
                continue;
            }
            if w.tx.send(Ok(self.snapshot(&w.query))).is_err() {
                debug!("listener {id:?} dropped its receiver");
            }
        }
    }
}

/// In-process document store with realtime listeners, used for tests, local
/// development and the connectivity self-test.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> Stats {
        let inner = self.lock();
        Stats {
            active_listeners: inner.watchers.len(),
            ..inner.stats
        }
    }

    /// Rejects every read, write and listen under `prefix` with
    /// `PermissionDenied`, and pushes that error to matching open listeners.
    pub fn deny(&self, prefix: &str) {
        let mut inner = self.lock();
        let prefix = prefix.trim_matches('/').to_string();
        for w in inner.watchers.values() {
            if w.query.collection.starts_with(&prefix) {
                let _ = w
                    .tx
                    .send(Err(Error::PermissionDenied(w.query.collection.to_string())));
            }
        }
        inner.denied.push(prefix);
    }

    pub fn allow(&self, prefix: &str) {
        let prefix = prefix.trim_matches('/');
        self.lock().denied.retain(|p| p != prefix);
    }

    /// Lets `n` more commits succeed, then fails the next one with `Unavailable`.
    pub fn fail_nth_write(&self, n: usize) {
        self.lock().fail_write_in = Some(n);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &DocPath) -> super::Result<Option<Document>> {
        let mut inner = self.lock();
        inner.check_allowed(&path.to_string())?;
        inner.stats.reads += 1;

        Ok(inner
            .docs
            .get(path)
            .map(|data| Document::new(path.clone(), data.clone())))
    }

    async fn query(&self, q: &Query) -> super::Result<Vec<Document>> {
        let mut inner = self.lock();
        inner.check_allowed(q.collection.as_str())?;
        inner.stats.reads += 1;

        Ok(inner.snapshot(q).docs)
    }

    async fn commit(&self, batch: WriteBatch) -> super::Result<()> {
        let mut inner = self.lock();

        for op in batch.ops() {
            inner.check_allowed(&op.path().to_string())?;
        }

        if let Some(n) = inner.fail_write_in {
            if n == 0 {
                inner.fail_write_in = None;
                warn!("injected write failure for batch of {} ops", batch.len());
                return Err(Error::Unavailable("injected write failure".into()));
            }
            inner.fail_write_in = Some(n - 1);
        }

        let now = clock::now_millis();
        let mut staged: HashMap<DocPath, Option<Fields>> = HashMap::new();

        for op in batch.into_ops() {
            let path = op.path().clone();
            let current = match staged.get(&path) {
                Some(v) => v.clone(),
                None => inner.docs.get(&path).cloned(),
            };

            let next = match op {
                WriteOp::Create { data, .. } => {
                    if current.is_some() {
                        return Err(Error::AlreadyExists(path));
                    }
                    Some(data)
                }
                WriteOp::Set { data, merge, .. } => match (merge, current) {
                    (true, Some(mut existing)) => {
                        model::merge_fields(&mut existing, data);
                        Some(existing)
                    }
                    _ => Some(data),
                },
                WriteOp::Update { updates, .. } => {
                    let Some(mut existing) = current else {
                        return Err(Error::NotFound(path));
                    };
                    for (field, update) in &updates {
                        model::apply_update(&mut existing, field, update, now);
                    }
                    Some(existing)
                }
                WriteOp::Delete { .. } => None,
            };

            staged.insert(path, next);
        }

        let mut touched = HashSet::new();
        for (path, data) in staged {
            touched.insert(path.collection().clone());
            match data {
                Some(d) => {
                    inner.docs.insert(path, d);
                }
                None => {
                    inner.docs.remove(&path);
                }
            }
        }

        inner.stats.writes += 1;
        inner.notify(&touched);

        Ok(())
    }

    async fn listen(&self, q: &Query) -> super::Result<Registration> {
        let mut inner = self.lock();
        inner.check_allowed(q.collection.as_str())?;

        let id = ListenerId(inner.next_listener);
        inner.next_listener += 1;

        let (tx, mut rx) = mpsc::unbounded_channel();
        // cannot fail: the receiver is still in scope
        let _ = tx.send(Ok(inner.snapshot(q)));

        inner.watchers.insert(
            id,
            Watcher {
                query: q.clone(),
                tx,
            },
        );
        inner.stats.listens += 1;
        debug!("listener {id:?} opened on {}", q.collection);

        let snapshots = async_stream::stream! {
            while let Some(item) = rx.recv().await {
                yield item;
            }
        };

        Ok(Registration {
            id,
            snapshots: Box::pin(snapshots),
        })
    }

    fn unlisten(&self, id: ListenerId) {
        let mut inner = self.lock();
        if inner.watchers.remove(&id).is_some() {
            inner.stats.unlistens += 1;
            debug!("listener {id:?} closed");
        }
    }
}

#[cfg(test)]
mod test {
    use futures::StreamExt;
    use serde_json::json;

    use super::super::FieldUpdate;
    use super::*;

    fn fields(v: serde_json::Value) -> Fields {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn should_add_and_get() {
        let store = MemoryStore::new();
        let posts = CollectionPath::new("posts");

        let path = store
            .add(&posts, fields(json!({ "content": "hello" })))
            .await
            .unwrap();

        let doc = store.get(&path).await.unwrap().unwrap();
        assert_eq!(doc.data["content"], json!("hello"));
        assert_eq!(store.stats().writes, 1);
        assert_eq!(store.stats().reads, 1);
    }

    #[tokio::test]
    async fn should_fail_update_of_missing_document() {
        let store = MemoryStore::new();
        let path = CollectionPath::new("posts").doc("missing");

        let res = store
            .update(&path, vec![("content".into(), FieldUpdate::set("x"))])
            .await;

        assert!(matches!(res, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn should_reject_create_over_existing() {
        let store = MemoryStore::new();
        let path = CollectionPath::new("chats").doc("direct_u1_u2");

        let mut batch = WriteBatch::new();
        batch.create(path.clone(), Fields::new());
        store.commit(batch.clone()).await.unwrap();

        assert!(matches!(
            store.commit(batch).await,
            Err(Error::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn should_apply_batch_atomically() {
        let store = MemoryStore::new();
        let users = CollectionPath::new("users");
        let a = users.doc("u1").sub("friends").doc("u2");
        let missing = users.doc("nobody");

        let mut batch = WriteBatch::new();
        batch
            .set(a.clone(), Fields::new())
            .update(missing, vec![("name".into(), FieldUpdate::set("x"))]);

        assert!(store.commit(batch).await.is_err());
        assert!(store.get(&a).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_fail_injected_write_once() {
        let store = MemoryStore::new();
        let path = CollectionPath::new("test").doc("t");
        store.fail_nth_write(1);

        store.set(&path, Fields::new(), false).await.unwrap();
        assert!(matches!(
            store.set(&path, Fields::new(), false).await,
            Err(Error::Unavailable(_))
        ));
        store.set(&path, Fields::new(), false).await.unwrap();
    }

    #[tokio::test]
    async fn should_deny_prefix() {
        let store = MemoryStore::new();
        store.deny("notifications");

        let q = Query::collection(&CollectionPath::new("notifications"));
        assert!(matches!(
            store.query(&q).await,
            Err(Error::PermissionDenied(_))
        ));

        store.allow("notifications");
        assert!(store.query(&q).await.is_ok());
    }

    #[tokio::test]
    async fn should_push_snapshots_to_listener() {
        let store = MemoryStore::new();
        let posts = CollectionPath::new("posts");
        let q = Query::collection(&posts);

        let mut reg = store.listen(&q).await.unwrap();
        let first = reg.snapshots.next().await.unwrap().unwrap();
        assert!(first.is_empty());

        store
            .set(&posts.doc("p1"), fields(json!({ "content": "a" })), false)
            .await
            .unwrap();
        let second = reg.snapshots.next().await.unwrap().unwrap();
        assert_eq!(second.docs.len(), 1);

        store.unlisten(reg.id);
        store.unlisten(reg.id);

        let stats = store.stats();
        assert_eq!(stats.listens, 1);
        assert_eq!(stats.unlistens, 1);
        assert_eq!(stats.active_listeners, 0);
    }

    #[tokio::test]
    async fn should_not_notify_other_collections() {
        let store = MemoryStore::new();
        let q = Query::collection(&CollectionPath::new("posts"));
        let mut reg = store.listen(&q).await.unwrap();
        let _ = reg.snapshots.next().await;

        store
            .set(&CollectionPath::new("users").doc("u1"), Fields::new(), false)
            .await
            .unwrap();
        store.unlisten(reg.id);

        // the sender is gone, so the stream ends without another snapshot
        assert!(reg.snapshots.next().await.is_none());
    }
}
