use std::fmt::Display;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{self, CollectionPath};
use crate::{auth, storage};

pub mod model;
pub mod repository;
pub mod service;

type Result<T> = std::result::Result<T, Error>;
pub type Repository = Arc<dyn repository::UserRepository + Send + Sync>;
pub type Service = Arc<dyn service::UserService + Send + Sync>;

const USERS: &str = "users";
const FRIENDS: &str = "friends";

pub fn collection() -> CollectionPath {
    CollectionPath::new(USERS)
}

/// `users/{id}/friends`
pub fn friends(id: &Id) -> CollectionPath {
    collection().doc(id).sub(FRIENDS)
}

/// Authentication identity; doubles as the id of the `users` document.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(pub String);

impl Id {
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<&Id> for Value {
    fn from(id: &Id) -> Self {
        Value::String(id.0.clone())
    }
}

impl From<Id> for Value {
    fn from(id: Id) -> Self {
        Value::String(id.0)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("user not found: {0}")]
    NotFound(Id),
    #[error("name is required")]
    MissingName,

    #[error(transparent)]
    _Auth(#[from] auth::Error),
    #[error(transparent)]
    _Storage(#[from] storage::Error),
    #[error(transparent)]
    _Store(#[from] store::Error),
}
