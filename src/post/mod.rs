use std::sync::Arc;

use crate::store::{self, CollectionPath};

pub mod model;
pub mod service;

type Result<T> = std::result::Result<T, Error>;
pub type Service = Arc<dyn service::PostService + Send + Sync>;

const POSTS: &str = "posts";

pub fn collection() -> CollectionPath {
    CollectionPath::new(POSTS)
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("post content is empty")]
    EmptyContent,
    #[error("post not found: {0}")]
    NotFound(String),
    #[error("only the author can do this")]
    NotAuthor,

    #[error(transparent)]
    _Store(#[from] store::Error),
}
