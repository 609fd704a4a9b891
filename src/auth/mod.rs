use std::sync::Arc;

use email_address::EmailAddress;
use serde::{Deserialize, Serialize};

use crate::user;

pub mod gate;
pub mod service;

type Result<T> = std::result::Result<T, Error>;
pub type Backend = Arc<dyn service::AuthBackend + Send + Sync>;

pub const MIN_PASSWORD_LEN: usize = 6;

/// The currently authenticated identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub uid: user::Id,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl Principal {
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or("User")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthState {
    /// The backend has not reported a session yet.
    Unknown,
    SignedOut,
    SignedIn(Principal),
}

impl AuthState {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            AuthState::SignedIn(p) => Some(p),
            _ => None,
        }
    }
}

/// Form field an error belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Email,
    Password,
    ConfirmPassword,
}

pub fn validate_email(email: &str) -> Result<()> {
    if EmailAddress::is_valid(email.trim()) {
        Ok(())
    } else {
        Err(Error::InvalidEmail(email.to_string()))
    }
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::WeakPassword);
    }
    Ok(())
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid email: {0}")]
    InvalidEmail(String),
    #[error("email already in use: {0}")]
    EmailInUse(String),
    #[error("password is too weak")]
    WeakPassword,
    #[error("wrong password")]
    WrongPassword,
    #[error("no account found for {0}")]
    UserNotFound(String),
    #[error("not signed in")]
    NotSignedIn,
    #[error("auth backend unavailable: {0}")]
    Unavailable(String),
}

impl Error {
    pub fn field(&self) -> Option<Field> {
        match self {
            Error::InvalidEmail(_) | Error::EmailInUse(_) | Error::UserNotFound(_) => {
                Some(Field::Email)
            }
            Error::WeakPassword | Error::WrongPassword => Some(Field::Password),
            Error::NotSignedIn | Error::Unavailable(_) => None,
        }
    }

    pub fn field_message(&self) -> &'static str {
        match self {
            Error::InvalidEmail(_) => "Invalid email format",
            Error::EmailInUse(_) => "Email is already registered",
            Error::WeakPassword => "Password is too weak",
            Error::WrongPassword => "Incorrect password",
            Error::UserNotFound(_) => "No account found with this email",
            Error::NotSignedIn => "Please log in to continue",
            Error::Unavailable(_) => "Something went wrong",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_validate_email() {
        assert!(validate_email("jora@focushub.app").is_ok());
        assert_eq!(
            validate_email("jora"),
            Err(Error::InvalidEmail("jora".into()))
        );
    }

    #[test]
    fn should_require_six_chars() {
        assert_eq!(validate_password("12345"), Err(Error::WeakPassword));
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn should_map_errors_to_fields() {
        assert_eq!(Error::EmailInUse("a".into()).field(), Some(Field::Email));
        assert_eq!(Error::WrongPassword.field(), Some(Field::Password));
        assert_eq!(Error::NotSignedIn.field(), None);
    }
}
