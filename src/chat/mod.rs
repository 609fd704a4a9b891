use std::sync::Arc;

use crate::store::{self, CollectionPath};
use crate::user;

pub mod model;
pub mod service;

type Result<T> = std::result::Result<T, Error>;
pub type Service = Arc<dyn service::ChatService + Send + Sync>;

const CHATS: &str = "chats";
const MESSAGES: &str = "messages";

pub fn collection() -> CollectionPath {
    CollectionPath::new(CHATS)
}

/// `chats/{id}/messages`
pub fn messages(chat_id: &str) -> CollectionPath {
    collection().doc(chat_id).sub(MESSAGES)
}

/// Same id whichever side starts the chat.
pub fn direct_id(a: &user::Id, b: &user::Id) -> String {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    format!("direct_{first}_{second}")
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("chat not found: {0}")]
    NotFound(String),
    #[error("cannot start a chat with yourself")]
    SelfChat,
    #[error("{0} is not a participant")]
    NotParticipant(user::Id),
    #[error("message is empty")]
    EmptyMessage,

    #[error(transparent)]
    _Store(#[from] store::Error),
}
