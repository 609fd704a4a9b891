use std::sync::Arc;

use crate::auth::{self, Field};
use crate::store;
use crate::user;

pub mod model;
pub mod service;

type Result<T> = std::result::Result<T, Error>;
pub type Service = Arc<dyn service::SessionService + Send + Sync>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid form: {0:?}")]
    Invalid(Vec<(Field, String)>),
    #[error("no profile found for {0}")]
    ProfileMissing(user::Id),

    #[error(transparent)]
    _Auth(#[from] auth::Error),
    #[error(transparent)]
    _User(#[from] user::Error),
    #[error(transparent)]
    _Store(#[from] store::Error),
}

impl Error {
    /// Message to show next to `field`, if any.
    pub fn field_message(&self, field: Field) -> Option<String> {
        match self {
            Error::Invalid(errors) => errors
                .iter()
                .find(|(f, _)| *f == field)
                .map(|(_, m)| m.clone()),
            Error::_Auth(e) if e.field() == Some(field) => Some(e.field_message().to_string()),
            _ => None,
        }
    }
}
