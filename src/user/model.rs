use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Id;
use crate::entity::Entity;

const DEFAULT_MALE_PICTURE: &str = "male.jpg";
const DEFAULT_FEMALE_PICTURE: &str = "female.jpg";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Male,
    Female,
    Other,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: Id,
    #[serde(default)]
    pub uid: Id,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub university: String,
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub semester: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_deleted: bool,
}

impl User {
    pub fn new(uid: Id, name: &str, email: &str) -> Self {
        Self {
            id: uid.clone(),
            uid,
            name: name.to_string(),
            email: email.to_string(),
            ..Default::default()
        }
    }

    /// Registered users carry an email; placeholders created by other flows do not.
    pub fn is_registered(&self) -> bool {
        !self.email.trim().is_empty()
    }

    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            "User"
        } else {
            self.name.as_str()
        }
    }

    pub fn picture_or_default(&self) -> &str {
        match (&self.profile_picture, self.gender) {
            (Some(p), _) => p.as_str(),
            (None, Gender::Female) => DEFAULT_FEMALE_PICTURE,
            (None, _) => DEFAULT_MALE_PICTURE,
        }
    }
}

impl Entity for User {
    fn id(&self) -> &str {
        self.id.as_str()
    }
}

/// Editable part of a profile, written with merge semantics.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: String,
    pub phone: String,
    pub gender: Gender,
    pub date_of_birth: String,
    pub university: String,
    pub degree: String,
    pub semester: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::store::{CollectionPath, Document, model};

    #[test]
    fn should_decode_sparse_document() {
        let doc = Document::new(
            CollectionPath::new("users").doc("u1"),
            json!({
                "name": "jora",
                "email": "jora@focushub.app",
                "createdAt": 1_700_000_000_000i64
            })
            .as_object()
            .cloned()
            .unwrap(),
        );

        let user: User = doc.decode().unwrap();

        assert_eq!(user.id, Id::from("u1"));
        assert_eq!(user.gender, Gender::Male);
        assert!(user.is_registered());
        assert_eq!(user.created_at.unwrap().timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn should_not_store_id_as_field() {
        let user = User::new(Id::from("u1"), "jora", "jora@focushub.app");

        let fields = model::encode(&user).unwrap();

        assert!(!fields.contains_key("id"));
        assert_eq!(fields["uid"], json!("u1"));
    }

    #[test]
    fn should_fall_back_to_gendered_picture() {
        let mut user = User::new(Id::from("u2"), "", "");
        user.gender = Gender::Female;

        assert_eq!(user.picture_or_default(), "female.jpg");
        assert_eq!(user.display_name(), "User");
    }
}
