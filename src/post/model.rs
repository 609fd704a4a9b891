use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::user;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub author_id: user::Id,
    #[serde(default)]
    pub author_name: String,
    pub content: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(default)]
    pub id: String,
    pub author_id: user::Id,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub content: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub liked_by: Vec<user::Id>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Post {
    pub fn is_liked_by(&self, uid: &user::Id) -> bool {
        self.liked_by.contains(uid)
    }

    pub fn like_count(&self) -> usize {
        self.liked_by.len()
    }

    pub fn with_like(&self, uid: &user::Id) -> Post {
        let mut post = self.clone();
        if !post.is_liked_by(uid) {
            post.liked_by.push(uid.clone());
        }
        post
    }

    pub fn without_like(&self, uid: &user::Id) -> Post {
        let mut post = self.clone();
        post.liked_by.retain(|u| u != uid);
        post
    }

    pub fn with_comment(&self, comment: &Comment) -> Post {
        let mut post = self.clone();
        if !post.comments.contains(comment) {
            post.comments.push(comment.clone());
        }
        post
    }
}

impl Entity for Post {
    fn id(&self) -> &str {
        &self.id
    }
}
