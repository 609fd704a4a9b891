use std::collections::BTreeMap;

use async_trait::async_trait;
use log::{debug, info};
use serde_json::Value;

use super::model::{Chat, Kind, Message, ParticipantInfo};
use super::{Error, direct_id};
use crate::auth::Principal;
use crate::notification::model::{self as notification, Notification};
use crate::store::{self, Direction, FieldUpdate, Query, Store, WriteBatch, model};
use crate::user::model::User;
use crate::{clock, user};

#[async_trait]
pub trait ChatService {
    /// Returns the id of the one-on-one chat between `me` and `other`,
    /// creating it on first use.
    async fn start_chat(&self, me: &Principal, other: &User) -> super::Result<String>;

    async fn find_by_id(&self, id: &str) -> super::Result<Chat>;

    async fn send_message(&self, me: &Principal, chat_id: &str, text: &str)
    -> super::Result<Message>;

    async fn mark_read(&self, me: &user::Id, chat_id: &str) -> super::Result<()>;

    async fn delete_chat(&self, me: &user::Id, chat_id: &str) -> super::Result<()>;
}

/// Chats `me` takes part in, most recently active first.
pub fn chats_query(me: &user::Id) -> Query {
    Query::collection(&super::collection())
        .where_array_contains("participants", me)
        .order_by("lastMessageTime", Direction::Desc)
}

/// Messages of a chat, newest first.
pub fn messages_query(chat_id: &str) -> Query {
    Query::collection(&super::messages(chat_id)).order_by("createdAt", Direction::Desc)
}

#[derive(Clone)]
pub struct ChatServiceImpl {
    store: Store,
}

impl ChatServiceImpl {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    async fn find_existing(
        &self,
        me: &user::Id,
        other: &user::Id,
    ) -> super::Result<Option<String>> {
        let q = Query::collection(&super::collection())
            .where_array_contains("participants", me)
            .where_eq("type", "one-on-one");

        let existing = self
            .store
            .query(&q)
            .await?
            .into_iter()
            .find(|d| {
                d.field("participants")
                    .and_then(|p| p.as_array())
                    .is_some_and(|p| p.contains(&Value::from(other)))
            })
            .map(|d| d.id().to_string());

        Ok(existing)
    }
}

#[async_trait]
impl ChatService for ChatServiceImpl {
    async fn start_chat(&self, me: &Principal, other: &User) -> super::Result<String> {
        if me.uid == other.id {
            return Err(Error::SelfChat);
        }

        if let Some(id) = self.find_existing(&me.uid, &other.id).await? {
            debug!("reusing chat {id}");
            return Ok(id);
        }

        let id = direct_id(&me.uid, &other.id);
        let now = clock::now();
        let chat = Chat {
            id: id.clone(),
            kind: Kind::OneOnOne,
            participants: vec![me.uid.clone(), other.id.clone()],
            participants_info: BTreeMap::from([
                (
                    me.uid.clone(),
                    ParticipantInfo {
                        name: me.name().to_string(),
                        photo_url: me.photo_url.clone(),
                    },
                ),
                (
                    other.id.clone(),
                    ParticipantInfo {
                        name: other.display_name().to_string(),
                        photo_url: other.profile_picture.clone(),
                    },
                ),
            ]),
            last_message: String::new(),
            last_message_time: Some(now),
            unread_for: Vec::new(),
            created_at: Some(now),
        };

        let mut batch = WriteBatch::new();
        batch.create(super::collection().doc(&id), model::encode(&chat)?);

        match self.store.commit(batch).await {
            Ok(()) => {
                info!("chat {id} created");
                Ok(id)
            }
            // the other side created it first
            Err(store::Error::AlreadyExists(_)) => Ok(id),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, id: &str) -> super::Result<Chat> {
        match self.store.get(&super::collection().doc(id)).await? {
            Some(doc) => Ok(doc.decode()?),
            None => Err(Error::NotFound(id.to_string())),
        }
    }

    async fn send_message(
        &self,
        me: &Principal,
        chat_id: &str,
        text: &str,
    ) -> super::Result<Message> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::EmptyMessage);
        }

        let chat = self.find_by_id(chat_id).await?;
        if !chat.has_participant(&me.uid) {
            return Err(Error::NotParticipant(me.uid.clone()));
        }

        let mut message = Message {
            id: String::new(),
            sender_id: me.uid.clone(),
            sender_name: me.name().to_string(),
            text: text.to_string(),
            created_at: clock::now(),
            read: false,
        };

        let others = chat
            .participants
            .iter()
            .filter(|p| **p != me.uid)
            .cloned()
            .collect::<Vec<_>>();

        let mut batch = WriteBatch::new();
        let path = batch.create_in(&super::messages(chat_id), model::encode(&message)?);
        batch.update(
            super::collection().doc(chat_id),
            vec![
                ("lastMessage".into(), FieldUpdate::set(text)),
                ("lastMessageTime".into(), FieldUpdate::ServerTimestamp),
                (
                    "unreadFor".into(),
                    FieldUpdate::ArrayUnion(others.iter().map(Into::into).collect()),
                ),
            ],
        );
        for other in &others {
            let n = Notification::new(notification::Kind::Message, other, me).with_chat(chat_id);
            notification::stage(&mut batch, &n)?;
        }

        self.store.commit(batch).await?;
        message.id = path.id().to_string();

        Ok(message)
    }

    async fn mark_read(&self, me: &user::Id, chat_id: &str) -> super::Result<()> {
        let unread = self
            .store
            .query(&Query::collection(&super::messages(chat_id)).where_eq("read", false))
            .await?;

        let sender = Value::from(me);
        let mut batch = WriteBatch::new();
        batch.update(
            super::collection().doc(chat_id),
            vec![("unreadFor".into(), FieldUpdate::remove(me))],
        );
        for doc in unread.iter().filter(|d| d.field("senderId") != Some(&sender)) {
            batch.update(doc.path.clone(), vec![("read".into(), FieldUpdate::set(true))]);
        }

        self.store.commit(batch).await?;
        Ok(())
    }

    async fn delete_chat(&self, me: &user::Id, chat_id: &str) -> super::Result<()> {
        let chat = self.find_by_id(chat_id).await?;
        if !chat.has_participant(me) {
            return Err(Error::NotParticipant(me.clone()));
        }

        let messages = self
            .store
            .query(&Query::collection(&super::messages(chat_id)))
            .await?;

        let mut batch = WriteBatch::new();
        for doc in messages {
            batch.delete(doc.path);
        }
        batch.delete(super::collection().doc(chat_id));

        self.store.commit(batch).await?;
        info!("chat {chat_id} deleted by {me}");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::notification::service::{NotificationService, NotificationServiceImpl};
    use crate::store::DocumentStore;
    use crate::store::memory::MemoryStore;

    fn principal(uid: &str, name: &str) -> Principal {
        Principal {
            uid: user::Id::from(uid),
            email: format!("{name}@focushub.app"),
            display_name: Some(name.into()),
            photo_url: None,
        }
    }

    fn user_of(p: &Principal) -> User {
        User::new(p.uid.clone(), p.name(), &p.email)
    }

    #[tokio::test]
    async fn should_start_chat_once_from_either_side() {
        let store = MemoryStore::new();
        let chats = ChatServiceImpl::new(Arc::new(store.clone()));
        let jora = principal("u1", "jora");
        let valera = principal("u2", "valera");

        let first = chats.start_chat(&jora, &user_of(&valera)).await.unwrap();
        let second = chats.start_chat(&jora, &user_of(&valera)).await.unwrap();
        let third = chats.start_chat(&valera, &user_of(&jora)).await.unwrap();

        assert_eq!(first, "direct_u1_u2");
        assert_eq!(first, second);
        assert_eq!(first, third);
        let all = store
            .query(&Query::collection(&crate::chat::collection()))
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn should_reuse_legacy_chat_with_random_id() {
        let store = MemoryStore::new();
        let chats = ChatServiceImpl::new(Arc::new(store.clone()));
        let legacy = store
            .add(
                &crate::chat::collection(),
                serde_json::json!({ "type": "one-on-one", "participants": ["u2", "u1"] })
                    .as_object()
                    .cloned()
                    .unwrap(),
            )
            .await
            .unwrap();

        let id = chats
            .start_chat(&principal("u1", "jora"), &user_of(&principal("u2", "valera")))
            .await
            .unwrap();

        assert_eq!(id, legacy.id());
    }

    #[tokio::test]
    async fn should_reject_chat_with_self() {
        let chats = ChatServiceImpl::new(Arc::new(MemoryStore::new()));
        let jora = principal("u1", "jora");

        assert!(matches!(
            chats.start_chat(&jora, &user_of(&jora)).await,
            Err(Error::SelfChat)
        ));
    }

    #[tokio::test]
    async fn should_send_and_mark_read() {
        let store = MemoryStore::new();
        let chats = ChatServiceImpl::new(Arc::new(store.clone()));
        let notifications = NotificationServiceImpl::new(Arc::new(store.clone()));
        let jora = principal("u1", "jora");
        let valera = principal("u2", "valera");
        let id = chats.start_chat(&jora, &user_of(&valera)).await.unwrap();

        chats.send_message(&jora, &id, " salut ").await.unwrap();

        let chat = chats.find_by_id(&id).await.unwrap();
        assert_eq!(chat.last_message, "salut");
        assert!(chat.is_unread_for(&valera.uid));
        assert!(!chat.is_unread_for(&jora.uid));
        assert_eq!(notifications.find_for(&valera.uid).await.unwrap().len(), 1);

        chats.mark_read(&valera.uid, &id).await.unwrap();

        let chat = chats.find_by_id(&id).await.unwrap();
        assert!(chat.unread_for.is_empty());
        let messages = store.query(&messages_query(&id)).await.unwrap();
        assert_eq!(messages[0].field("read"), Some(&serde_json::Value::Bool(true)));
    }

    #[tokio::test]
    async fn should_only_let_participants_send_and_delete() {
        let store = MemoryStore::new();
        let chats = ChatServiceImpl::new(Arc::new(store.clone()));
        let jora = principal("u1", "jora");
        let radu = principal("u3", "radu");
        let id = chats
            .start_chat(&jora, &user_of(&principal("u2", "valera")))
            .await
            .unwrap();
        chats.send_message(&jora, &id, "hi").await.unwrap();

        assert!(matches!(
            chats.send_message(&radu, &id, "hey").await,
            Err(Error::NotParticipant(_))
        ));
        assert!(matches!(
            chats.delete_chat(&radu.uid, &id).await,
            Err(Error::NotParticipant(_))
        ));

        chats.delete_chat(&jora.uid, &id).await.unwrap();

        assert!(matches!(chats.find_by_id(&id).await, Err(Error::NotFound(_))));
        assert!(store.query(&messages_query(&id)).await.unwrap().is_empty());
    }
}
