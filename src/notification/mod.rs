use std::sync::Arc;

use crate::store::{self, CollectionPath};

pub mod model;
pub mod service;

type Result<T> = std::result::Result<T, Error>;
pub type Service = Arc<dyn service::NotificationService + Send + Sync>;

const NOTIFICATIONS: &str = "notifications";

pub fn collection() -> CollectionPath {
    CollectionPath::new(NOTIFICATIONS)
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    _Store(#[from] store::Error),
}
