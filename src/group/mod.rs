use std::sync::Arc;

use crate::store::{self, CollectionPath};
use crate::{storage, user};

pub mod model;
pub mod service;

type Result<T> = std::result::Result<T, Error>;
pub type Service = Arc<dyn service::GroupService + Send + Sync>;

const GROUPS: &str = "groups";
const MESSAGES: &str = "messages";

pub fn collection() -> CollectionPath {
    CollectionPath::new(GROUPS)
}

/// `groups/{id}/messages`
pub fn messages(group_id: &str) -> CollectionPath {
    collection().doc(group_id).sub(MESSAGES)
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("group name is required")]
    MissingName,
    #[error("group not found: {0}")]
    NotFound(String),
    #[error("{0} is not a member")]
    NotMember(user::Id),
    #[error("message is empty")]
    EmptyMessage,
    #[error("failed to generate group image: {0}")]
    Image(String),

    #[error(transparent)]
    _Storage(#[from] storage::Error),
    #[error(transparent)]
    _Store(#[from] store::Error),
}
