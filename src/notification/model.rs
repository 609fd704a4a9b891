use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Principal;
use crate::auth::gate::Route;
use crate::entity::Entity;
use crate::store::{self, DocPath, WriteBatch, model};
use crate::{clock, user};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Like,
    Comment,
    FriendRequest,
    FriendAccept,
    Message,
    Follow,
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default)]
    pub id: String,
    pub user_id: user::Id,
    pub sender_id: user::Id,
    #[serde(default)]
    pub sender_name: String,
    #[serde(
        default,
        rename = "senderPhotoURL",
        skip_serializing_if = "Option::is_none"
    )]
    pub sender_photo_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Kind,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub read: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl Notification {
    /// Notification for `to` about something `sender` did.
    pub fn new(kind: Kind, to: &user::Id, sender: &Principal) -> Self {
        let name = sender.display_name.as_deref().unwrap_or("Someone");
        let message = match kind {
            Kind::Like => format!("{name} liked your post"),
            Kind::Comment => format!("{name} commented on your post"),
            Kind::FriendRequest => format!("{name} sent you a friend request"),
            Kind::FriendAccept => format!("{name} accepted your friend request"),
            Kind::Message => format!("{name} sent you a message"),
            Kind::Follow => format!("{name} started following you"),
            Kind::Other => format!("New activity from {name}"),
        };

        Self {
            id: String::new(),
            user_id: to.clone(),
            sender_id: sender.uid.clone(),
            sender_name: sender.name().to_string(),
            sender_photo_url: sender.photo_url.clone(),
            kind,
            message,
            read: false,
            timestamp: clock::now(),
            post_id: None,
            chat_id: None,
            request_id: None,
        }
    }

    pub fn with_post(mut self, post_id: &str) -> Self {
        self.post_id = Some(post_id.to_string());
        self
    }

    pub fn with_chat(mut self, chat_id: &str) -> Self {
        self.chat_id = Some(chat_id.to_string());
        self
    }

    pub fn with_request(mut self, request_id: &str) -> Self {
        self.request_id = Some(request_id.to_string());
        self
    }

    /// Screen a tap on this notification leads to, with its parameter.
    pub fn destination(&self) -> Option<(Route, Option<String>)> {
        match self.kind {
            Kind::Like | Kind::Comment => Some((Route::Feed, self.post_id.clone())),
            Kind::Follow | Kind::FriendAccept => {
                Some((Route::Profile, Some(self.sender_id.to_string())))
            }
            Kind::FriendRequest => Some((Route::Explore, self.request_id.clone())),
            Kind::Message => Some((Route::OneOnOneChat, self.chat_id.clone())),
            Kind::Other => None,
        }
    }
}

impl Entity for Notification {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Adds the creation of `n` to `batch`.
pub fn stage(batch: &mut WriteBatch, n: &Notification) -> store::Result<DocPath> {
    let fields = model::encode(n)?;
    Ok(batch.create_in(&super::collection(), fields))
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::store::{CollectionPath, Document};

    fn valera() -> Principal {
        Principal {
            uid: user::Id::from("u2"),
            email: "valera@focushub.app".into(),
            display_name: Some("Valera".into()),
            photo_url: None,
        }
    }

    #[test]
    fn should_store_kind_as_type() {
        let n = Notification::new(Kind::FriendRequest, &user::Id::from("u1"), &valera())
            .with_request("r1");

        let fields = model::encode(&n).unwrap();

        assert_eq!(fields["type"], json!("friend_request"));
        assert_eq!(fields["requestId"], json!("r1"));
        assert_eq!(fields["message"], json!("Valera sent you a friend request"));
        assert!(!fields.contains_key("postId"));
    }

    #[test]
    fn should_tolerate_unknown_kinds() {
        let doc = Document::new(
            CollectionPath::new("notifications").doc("n1"),
            json!({ "userId": "u1", "senderId": "u2", "type": "poke", "timestamp": 5 })
                .as_object()
                .cloned()
                .unwrap(),
        );

        let n: Notification = doc.decode().unwrap();

        assert_eq!(n.kind, Kind::Other);
        assert_eq!(n.destination(), None);
    }

    #[test]
    fn should_route_by_kind() {
        let to = user::Id::from("u1");

        let like = Notification::new(Kind::Like, &to, &valera()).with_post("p1");
        let accept = Notification::new(Kind::FriendAccept, &to, &valera());

        assert_eq!(like.destination(), Some((Route::Feed, Some("p1".into()))));
        assert_eq!(
            accept.destination(),
            Some((Route::Profile, Some("u2".into())))
        );
    }
}
