use std::fmt::Display;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;

pub mod memory;
pub mod model;
pub mod query;

pub use model::{Document, FieldUpdate, Fields, Snapshot, WriteBatch, WriteOp};
pub use query::{Direction, Filter, Query};

pub type Result<T> = std::result::Result<T, Error>;
pub type Store = Arc<dyn DocumentStore + Send + Sync>;
pub type SnapshotStream = Pin<Box<dyn Stream<Item = Result<Snapshot>> + Send>>;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(name: &str) -> Self {
        Self(name.trim_matches('/').to_string())
    }

    pub fn doc(&self, id: impl Display) -> DocPath {
        DocPath {
            collection: self.clone(),
            id: id.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix.trim_matches('/'))
    }
}

impl Display for CollectionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath {
    collection: CollectionPath,
    id: String,
}

impl DocPath {
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    pub fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    /// Nested collection under this document, e.g. `users/{id}/friends`.
    pub fn sub(&self, name: &str) -> CollectionPath {
        CollectionPath(format!("{}/{}/{}", self.collection, self.id, name))
    }

    pub fn parse(path: &str) -> Option<Self> {
        let (collection, id) = path.trim_matches('/').rsplit_once('/')?;
        if collection.is_empty() || id.is_empty() {
            return None;
        }
        Some(CollectionPath::new(collection).doc(id))
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.to_string().starts_with(prefix.trim_matches('/'))
    }
}

impl Display for DocPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// An open backend subscription: the first item of `snapshots` is the
/// current result set, every later item a full replacement.
pub struct Registration {
    pub id: ListenerId,
    pub snapshots: SnapshotStream,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("document not found: {0}")]
    NotFound(DocPath),
    #[error("document already exists: {0}")]
    AlreadyExists(DocPath),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("invalid document {path}: {reason}")]
    InvalidDocument { path: String, reason: String },

    #[error(transparent)]
    _ParseJson(#[from] serde_json::Error),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>>;

    async fn query(&self, q: &Query) -> Result<Vec<Document>>;

    /// Applies every operation of the batch or none of them.
    async fn commit(&self, batch: WriteBatch) -> Result<()>;

    async fn listen(&self, q: &Query) -> Result<Registration>;

    fn unlisten(&self, id: ListenerId);

    async fn add(&self, collection: &CollectionPath, data: Fields) -> Result<DocPath> {
        let mut batch = WriteBatch::new();
        let path = batch.create_in(collection, data);
        self.commit(batch).await?;
        Ok(path)
    }

    async fn set(&self, path: &DocPath, data: Fields, merge: bool) -> Result<()> {
        let mut batch = WriteBatch::new();
        if merge {
            batch.merge(path.clone(), data);
        } else {
            batch.set(path.clone(), data);
        }
        self.commit(batch).await
    }

    async fn update(&self, path: &DocPath, updates: Vec<(String, FieldUpdate)>) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.update(path.clone(), updates);
        self.commit(batch).await
    }

    async fn delete(&self, path: &DocPath) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.delete(path.clone());
        self.commit(batch).await
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_build_nested_paths() {
        let friends = CollectionPath::new("users").doc("u1").sub("friends");
        assert_eq!(friends.as_str(), "users/u1/friends");
        assert_eq!(friends.doc("u2").to_string(), "users/u1/friends/u2");
    }

    #[test]
    fn should_parse_doc_path() {
        let path = DocPath::parse("chats/c1/messages/m1").unwrap();

        assert_eq!(path.collection().as_str(), "chats/c1/messages");
        assert_eq!(path.id(), "m1");
        assert!(DocPath::parse("chats").is_none());
    }
}
