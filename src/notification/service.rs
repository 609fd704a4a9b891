use async_trait::async_trait;
use log::debug;

use super::model::{self, Notification};
use crate::store::{Direction, FieldUpdate, Query, Store, WriteBatch};
use crate::user;

#[async_trait]
pub trait NotificationService {
    async fn create(&self, n: &Notification) -> super::Result<String>;

    async fn find_for(&self, user: &user::Id) -> super::Result<Vec<Notification>>;

    async fn mark_read(&self, id: &str) -> super::Result<()>;

    /// Returns how many notifications changed.
    async fn mark_all_read(&self, user: &user::Id) -> super::Result<usize>;

    async fn delete(&self, id: &str) -> super::Result<()>;
}

/// Notifications addressed to `user`, newest first.
pub fn query_for(user: &user::Id) -> Query {
    Query::collection(&super::collection())
        .where_eq("userId", user)
        .order_by("timestamp", Direction::Desc)
}

#[derive(Clone)]
pub struct NotificationServiceImpl {
    store: Store,
}

impl NotificationServiceImpl {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl NotificationService for NotificationServiceImpl {
    async fn create(&self, n: &Notification) -> super::Result<String> {
        let mut batch = WriteBatch::new();
        let path = model::stage(&mut batch, n)?;
        self.store.commit(batch).await?;
        Ok(path.id().to_string())
    }

    async fn find_for(&self, user: &user::Id) -> super::Result<Vec<Notification>> {
        let docs = self.store.query(&query_for(user)).await?;
        let notifications = docs
            .iter()
            .map(|d| d.decode())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(notifications)
    }

    async fn mark_read(&self, id: &str) -> super::Result<()> {
        self.store
            .update(
                &super::collection().doc(id),
                vec![("read".into(), FieldUpdate::set(true))],
            )
            .await?;
        Ok(())
    }

    async fn mark_all_read(&self, user: &user::Id) -> super::Result<usize> {
        let q = Query::collection(&super::collection())
            .where_eq("userId", user)
            .where_eq("read", false);
        let unread = self.store.query(&q).await?;
        if unread.is_empty() {
            return Ok(0);
        }

        let mut batch = WriteBatch::new();
        for doc in &unread {
            batch.update(
                doc.path.clone(),
                vec![("read".into(), FieldUpdate::set(true))],
            );
        }
        self.store.commit(batch).await?;
        debug!("marked {} notifications read for {user}", unread.len());

        Ok(unread.len())
    }

    async fn delete(&self, id: &str) -> super::Result<()> {
        self.store.delete(&super::collection().doc(id)).await?;
        Ok(())
    }
}
