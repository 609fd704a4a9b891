use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::store::{self, CollectionPath};
use crate::user;

pub mod model;
pub mod service;

type Result<T> = std::result::Result<T, Error>;
pub type Service = Arc<dyn service::FriendService + Send + Sync>;

const FRIEND_REQUESTS: &str = "friend_requests";

pub fn requests() -> CollectionPath {
    CollectionPath::new(FRIEND_REQUESTS)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

pub enum Transition<'a> {
    Accept { responder: &'a user::Id },
    Reject { responder: &'a user::Id },
}

impl Status {
    /// Only the recipient may answer, and only while the request is pending.
    pub fn transition(&self, to: &user::Id, t: Transition<'_>) -> Result<Status> {
        let (responder, next) = match t {
            Transition::Accept { responder } => (responder, Status::Accepted),
            Transition::Reject { responder } => (responder, Status::Rejected),
        };

        if responder != to {
            return Err(Error::NotRecipient(responder.clone()));
        }
        if *self != Status::Pending {
            return Err(Error::NotPending(*self));
        }
        Ok(next)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("friend request not found: {0}")]
    NotFound(String),
    #[error("cannot befriend oneself")]
    SelfReference,
    #[error("already friends with {0}")]
    AlreadyFriends(user::Id),
    #[error("a request to {0} is already pending")]
    AlreadyRequested(user::Id),
    #[error("{0} is not the recipient of this request")]
    NotRecipient(user::Id),
    #[error("request is no longer pending: {0:?}")]
    NotPending(Status),

    #[error(transparent)]
    _Store(#[from] store::Error),
}
