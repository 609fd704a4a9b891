use log::debug;

use crate::alert::Alert;
use crate::{
    auth, chat, friend, group, integration, notification, optimistic, post, session, storage,
    store, user,
};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    _Auth(#[from] auth::Error),
    #[error(transparent)]
    _Chat(#[from] chat::Error),
    #[error(transparent)]
    _Friend(#[from] friend::Error),
    #[error(transparent)]
    _Group(#[from] group::Error),
    #[error(transparent)]
    _Integration(#[from] integration::Error),
    #[error(transparent)]
    _Notification(#[from] notification::Error),
    #[error(transparent)]
    _Optimistic(#[from] optimistic::Error),
    #[error(transparent)]
    _Post(#[from] post::Error),
    #[error(transparent)]
    _Session(#[from] session::Error),
    #[error(transparent)]
    _Storage(#[from] storage::Error),
    #[error(transparent)]
    _Store(#[from] store::Error),
    #[error(transparent)]
    _User(#[from] user::Error),
}

impl Error {
    /// What the user gets to see. Backend failures collapse into one
    /// generic message.
    pub fn alert(&self) -> Alert {
        match self {
            Error::_Auth(e) => auth_alert(e),
            Error::_Session(e) => match e {
                session::Error::Invalid(errors) => Alert::new(
                    "Validation Error",
                    errors
                        .first()
                        .map(|(_, m)| m.as_str())
                        .unwrap_or("Please check the form"),
                ),
                session::Error::ProfileMissing(_) => Alert::error("User profile not found"),
                session::Error::_Auth(e) => auth_alert(e),
                session::Error::_User(e) => user_alert(e),
                session::Error::_Store(e) => backend_alert(e),
            },
            Error::_User(e) => user_alert(e),
            Error::_Optimistic(optimistic::Error::InFlight(_)) => {
                Alert::new("Please wait", "Your last action is still in progress")
            }
            Error::_Post(post::Error::EmptyContent) => Alert::error("Post cannot be empty"),
            Error::_Post(post::Error::NotAuthor) => {
                Alert::error("You can only change your own posts and comments")
            }
            Error::_Chat(chat::Error::SelfChat) => Alert::error("You cannot chat with yourself"),
            Error::_Chat(chat::Error::EmptyMessage) | Error::_Group(group::Error::EmptyMessage) => {
                Alert::error("Message cannot be empty")
            }
            Error::_Chat(chat::Error::NotParticipant(_)) => {
                Alert::error("You are not part of this chat")
            }
            Error::_Group(group::Error::MissingName) => Alert::error("Group name is required"),
            Error::_Group(group::Error::NotMember(_)) => {
                Alert::error("You are not a member of this group")
            }
            Error::_Friend(friend::Error::SelfReference) => {
                Alert::error("You cannot send a friend request to yourself")
            }
            Error::_Friend(friend::Error::AlreadyFriends(_)) => {
                Alert::new("Notice", "You are already friends with this user")
            }
            Error::_Friend(friend::Error::AlreadyRequested(_)) => Alert::new(
                "Notice",
                "You have already sent a friend request to this user",
            ),
            Error::_Friend(friend::Error::NotRecipient(_) | friend::Error::NotPending(_)) => {
                Alert::new("Notice", "This request can no longer be answered")
            }
            other => backend_alert(other),
        }
    }
}

fn auth_alert(e: &auth::Error) -> Alert {
    Alert::new("Authentication Failed", e.field_message())
}

fn user_alert(e: &user::Error) -> Alert {
    match e {
        user::Error::MissingName => Alert::error("Name is required"),
        user::Error::_Auth(e) => auth_alert(e),
        other => backend_alert(other),
    }
}

fn backend_alert(e: &dyn std::error::Error) -> Alert {
    debug!("backend error: {e}");
    Alert::error("Something went wrong")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_map_auth_errors_to_field_messages() {
        let e = Error::from(session::Error::from(auth::Error::WrongPassword));

        assert_eq!(
            e.alert(),
            Alert::new("Authentication Failed", "Incorrect password")
        );
    }

    #[test]
    fn should_hide_backend_details() {
        let e = Error::from(store::Error::PermissionDenied("notifications".into()));

        assert_eq!(e.alert(), Alert::error("Something went wrong"));
    }

    #[test]
    fn should_explain_duplicate_request() {
        let e = Error::from(friend::Error::AlreadyRequested(user::Id::from("u2")));

        assert_eq!(e.alert().title, "Notice");
    }
}
