use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::user;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Kind {
    #[default]
    #[serde(rename = "one-on-one")]
    OneOnOne,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: Kind,
    pub participants: Vec<user::Id>,
    #[serde(default)]
    pub participants_info: BTreeMap<user::Id, ParticipantInfo>,
    #[serde(default)]
    pub last_message: String,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_message_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub unread_for: Vec<user::Id>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Chat {
    pub fn has_participant(&self, uid: &user::Id) -> bool {
        self.participants.contains(uid)
    }

    pub fn other_participant(&self, me: &user::Id) -> Option<&user::Id> {
        self.participants.iter().find(|p| *p != me)
    }

    pub fn other_info(&self, me: &user::Id) -> Option<&ParticipantInfo> {
        self.other_participant(me)
            .and_then(|other| self.participants_info.get(other))
    }

    pub fn is_unread_for(&self, uid: &user::Id) -> bool {
        self.unread_for.contains(uid)
    }
}

impl Entity for Chat {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    pub id: String,
    pub sender_id: user::Id,
    #[serde(default)]
    pub sender_name: String,
    pub text: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

impl Entity for Message {
    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::store::model;

    #[test]
    fn should_use_store_field_names() {
        let chat = Chat {
            id: "direct_u1_u2".into(),
            kind: Kind::OneOnOne,
            participants: vec![user::Id::from("u1"), user::Id::from("u2")],
            participants_info: BTreeMap::from([(
                user::Id::from("u2"),
                ParticipantInfo {
                    name: "Valera".into(),
                    photo_url: None,
                },
            )]),
            last_message: String::new(),
            last_message_time: None,
            unread_for: vec![user::Id::from("u2")],
            created_at: None,
        };

        let fields = model::encode(&chat).unwrap();

        assert_eq!(fields["type"], json!("one-on-one"));
        assert_eq!(
            fields["participantsInfo"],
            json!({ "u2": { "name": "Valera", "photoURL": null } })
        );
        assert_eq!(fields["unreadFor"], json!(["u2"]));
        assert_eq!(chat.other_info(&user::Id::from("u1")).unwrap().name, "Valera");
        assert!(chat.other_info(&user::Id::from("u2")).is_none());
    }
}
