use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::user;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub members: Vec<user::Id>,
    pub created_by: user::Id,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn is_member(&self, uid: &user::Id) -> bool {
        self.members.contains(uid)
    }
}

impl Entity for Group {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Picture picked for a new group.
#[derive(Clone, Debug)]
pub struct Image {
    pub data: Bytes,
    pub content_type: String,
}

#[derive(Clone, Debug, Default)]
pub struct NewGroup {
    pub name: String,
    pub image: Option<Image>,
    pub members: Vec<user::Id>,
}
