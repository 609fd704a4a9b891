use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Status;
use crate::entity::Entity;
use crate::user;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    #[serde(default)]
    pub id: String,
    pub from: user::Id,
    pub to: user::Id,
    #[serde(default)]
    pub status: Status,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl FriendRequest {
    pub fn new(from: &user::Id, to: &user::Id, now: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            from: from.clone(),
            to: to.clone(),
            status: Status::Pending,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}

impl Entity for FriendRequest {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Edge `users/{owner}/friends/{id}`; `id` is the friend's uid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Friend {
    #[serde(default)]
    pub id: user::Id,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub since: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl Friend {
    pub fn new(id: &user::Id, since: DateTime<Utc>, request_id: Option<&str>) -> Self {
        Self {
            id: id.clone(),
            since: Some(since),
            request_id: request_id.map(str::to_string),
        }
    }
}

impl Entity for Friend {
    fn id(&self) -> &str {
        self.id.as_str()
    }
}
