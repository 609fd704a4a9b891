use async_trait::async_trait;
use log::info;
use serde_json::Value;

use super::Error;
use super::model::{Comment, Post};
use crate::auth::Principal;
use crate::notification::model::{self as notification, Kind, Notification};
use crate::store::{Direction, FieldUpdate, Query, Store, WriteBatch, model};
use crate::{clock, user};

#[async_trait]
pub trait PostService {
    async fn create(&self, author: &Principal, content: &str) -> super::Result<Post>;

    async fn find_by_id(&self, id: &str) -> super::Result<Post>;

    async fn delete(&self, me: &Principal, id: &str) -> super::Result<()>;

    /// Adds `me` to `likedBy`. `post` is the state the user acted on; a
    /// `like` notification goes to the author unless it was already liked.
    async fn like(&self, me: &Principal, post: &Post) -> super::Result<()>;

    async fn unlike(&self, me: &Principal, post_id: &str) -> super::Result<()>;

    async fn add_comment(
        &self,
        me: &Principal,
        post: &Post,
        content: &str,
    ) -> super::Result<Comment>;

    async fn remove_comment(
        &self,
        me: &Principal,
        post_id: &str,
        comment: &Comment,
    ) -> super::Result<()>;
}

/// Posts written by any of `authors`, newest first.
pub fn feed_query(authors: &[user::Id]) -> Query {
    Query::collection(&super::collection())
        .where_in("authorId", authors.iter().map(Value::from).collect())
        .order_by("createdAt", Direction::Desc)
}

#[derive(Clone)]
pub struct PostServiceImpl {
    store: Store,
}

impl PostServiceImpl {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PostService for PostServiceImpl {
    async fn create(&self, author: &Principal, content: &str) -> super::Result<Post> {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::EmptyContent);
        }

        let mut post = Post {
            id: String::new(),
            author_id: author.uid.clone(),
            author_name: author.name().to_string(),
            content: content.to_string(),
            created_at: clock::now(),
            liked_by: Vec::new(),
            comments: Vec::new(),
        };
        let path = self
            .store
            .add(&super::collection(), model::encode(&post)?)
            .await?;
        post.id = path.id().to_string();

        Ok(post)
    }

    async fn find_by_id(&self, id: &str) -> super::Result<Post> {
        match self.store.get(&super::collection().doc(id)).await? {
            Some(doc) => Ok(doc.decode()?),
            None => Err(Error::NotFound(id.to_string())),
        }
    }

    async fn delete(&self, me: &Principal, id: &str) -> super::Result<()> {
        let post = self.find_by_id(id).await?;
        if post.author_id != me.uid {
            return Err(Error::NotAuthor);
        }

        self.store.delete(&super::collection().doc(id)).await?;
        info!("post {id} deleted by {}", me.uid);
        Ok(())
    }

    async fn like(&self, me: &Principal, post: &Post) -> super::Result<()> {
        let mut batch = WriteBatch::new();
        batch.update(
            super::collection().doc(&post.id),
            vec![("likedBy".into(), FieldUpdate::union(&me.uid))],
        );

        if post.author_id != me.uid && !post.is_liked_by(&me.uid) {
            let n = Notification::new(Kind::Like, &post.author_id, me).with_post(&post.id);
            notification::stage(&mut batch, &n)?;
        }

        self.store.commit(batch).await?;
        Ok(())
    }

    async fn unlike(&self, me: &Principal, post_id: &str) -> super::Result<()> {
        self.store
            .update(
                &super::collection().doc(post_id),
                vec![("likedBy".into(), FieldUpdate::remove(&me.uid))],
            )
            .await?;
        Ok(())
    }

    async fn add_comment(
        &self,
        me: &Principal,
        post: &Post,
        content: &str,
    ) -> super::Result<Comment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::EmptyContent);
        }

        let comment = Comment {
            id: uuid::Uuid::new_v4().simple().to_string(),
            author_id: me.uid.clone(),
            author_name: me.name().to_string(),
            content: content.to_string(),
            created_at: clock::now(),
        };

        let mut batch = WriteBatch::new();
        batch.update(
            super::collection().doc(&post.id),
            vec![(
                "comments".into(),
                FieldUpdate::union(model::encode_value(&comment)?),
            )],
        );
        if post.author_id != me.uid {
            let n = Notification::new(Kind::Comment, &post.author_id, me).with_post(&post.id);
            notification::stage(&mut batch, &n)?;
        }

        self.store.commit(batch).await?;
        Ok(comment)
    }

    async fn remove_comment(
        &self,
        me: &Principal,
        post_id: &str,
        comment: &Comment,
    ) -> super::Result<()> {
        if comment.author_id != me.uid {
            return Err(Error::NotAuthor);
        }

        let value = model::encode_value(comment)?;
        self.store
            .update(
                &super::collection().doc(post_id),
                vec![("comments".into(), FieldUpdate::ArrayRemove(vec![value]))],
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::notification::service::{NotificationService, NotificationServiceImpl};
    use crate::store::memory::MemoryStore;

    fn principal(uid: &str, name: &str) -> Principal {
        Principal {
            uid: user::Id::from(uid),
            email: format!("{name}@focushub.app"),
            display_name: Some(name.into()),
            photo_url: None,
        }
    }

    struct Fixture {
        store: MemoryStore,
        posts: PostServiceImpl,
        notifications: NotificationServiceImpl,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        Fixture {
            posts: PostServiceImpl::new(Arc::new(store.clone())),
            notifications: NotificationServiceImpl::new(Arc::new(store.clone())),
            store,
        }
    }

    #[tokio::test]
    async fn should_reject_empty_post() {
        let f = fixture();

        let res = f.posts.create(&principal("u1", "jora"), "   ").await;

        assert!(matches!(res, Err(Error::EmptyContent)));
        assert_eq!(f.store.stats().writes, 0);
    }

    #[tokio::test]
    async fn should_like_idempotently_and_notify_once() {
        let f = fixture();
        let jora = principal("u1", "jora");
        let valera = principal("u2", "valera");
        let post = f.posts.create(&jora, "study group at 6").await.unwrap();

        f.posts.like(&valera, &post).await.unwrap();
        let liked = f.posts.find_by_id(&post.id).await.unwrap();
        f.posts.like(&valera, &liked).await.unwrap();

        let after = f.posts.find_by_id(&post.id).await.unwrap();
        assert_eq!(after.liked_by, vec![valera.uid.clone()]);
        assert_eq!(f.notifications.find_for(&jora.uid).await.unwrap().len(), 1);

        f.posts.unlike(&valera, &post.id).await.unwrap();
        f.posts.unlike(&valera, &post.id).await.unwrap();
        assert!(f.posts.find_by_id(&post.id).await.unwrap().liked_by.is_empty());
    }

    #[tokio::test]
    async fn should_not_notify_self_like() {
        let f = fixture();
        let jora = principal("u1", "jora");
        let post = f.posts.create(&jora, "note to self").await.unwrap();

        f.posts.like(&jora, &post).await.unwrap();

        assert!(f.notifications.find_for(&jora.uid).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_comment_and_remove_own_comment() {
        let f = fixture();
        let jora = principal("u1", "jora");
        let valera = principal("u2", "valera");
        let post = f.posts.create(&jora, "who has the notes?").await.unwrap();

        let comment = f.posts.add_comment(&valera, &post, "me").await.unwrap();

        let with_comment = f.posts.find_by_id(&post.id).await.unwrap();
        assert_eq!(with_comment.comments, vec![comment.clone()]);
        let notified = f.notifications.find_for(&jora.uid).await.unwrap();
        assert_eq!(notified[0].kind, Kind::Comment);
        assert_eq!(notified[0].post_id.as_deref(), Some(post.id.as_str()));

        assert!(matches!(
            f.posts.remove_comment(&jora, &post.id, &comment).await,
            Err(Error::NotAuthor)
        ));
        f.posts.remove_comment(&valera, &post.id, &comment).await.unwrap();
        assert!(f.posts.find_by_id(&post.id).await.unwrap().comments.is_empty());
    }

    #[tokio::test]
    async fn should_only_let_author_delete() {
        let f = fixture();
        let jora = principal("u1", "jora");
        let post = f.posts.create(&jora, "mine").await.unwrap();

        assert!(matches!(
            f.posts.delete(&principal("u2", "valera"), &post.id).await,
            Err(Error::NotAuthor)
        ));
        f.posts.delete(&jora, &post.id).await.unwrap();
        assert!(matches!(
            f.posts.find_by_id(&post.id).await,
            Err(Error::NotFound(_))
        ));
    }
}
