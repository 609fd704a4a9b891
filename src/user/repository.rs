use async_trait::async_trait;

use super::Id;
use super::model::{ProfileUpdate, User};
use crate::store::{self, Direction, FieldUpdate, Query, Store, WriteBatch, model};

#[async_trait]
pub trait UserRepository {
    async fn find_by_id(&self, id: &Id) -> super::Result<Option<User>>;

    async fn find_by_ids(&self, ids: &[Id]) -> super::Result<Vec<User>>;

    async fn find_all_except(&self, id: &Id) -> super::Result<Vec<User>>;

    async fn insert(&self, user: &User) -> super::Result<()>;

    async fn update_profile(&self, id: &Id, update: &ProfileUpdate) -> super::Result<()>;

    async fn set_picture(&self, id: &Id, url: &str) -> super::Result<()>;
}

/// Every user document, including ones written without a `uid` field.
/// Callers drop themselves by document id.
pub fn everyone_query() -> Query {
    Query::collection(&super::collection())
}

/// Every user but `me`, ordered by uid.
pub fn directory_query(me: &Id) -> Query {
    Query::collection(&super::collection())
        .where_not_eq("uid", me)
        .order_by("uid", Direction::Asc)
}

pub struct StoreUserRepository {
    store: Store,
}

impl StoreUserRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UserRepository for StoreUserRepository {
    async fn find_by_id(&self, id: &Id) -> super::Result<Option<User>> {
        let doc = self.store.get(&super::collection().doc(id)).await?;
        match doc {
            Some(d) => Ok(Some(d.decode()?)),
            None => Ok(None),
        }
    }

    async fn find_by_ids(&self, ids: &[Id]) -> super::Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::with_capacity(0));
        }

        let q = Query::collection(&super::collection())
            .where_id_in(ids.iter().map(|id| id.0.clone()).collect());

        decode_all(self.store.query(&q).await?)
    }

    async fn find_all_except(&self, id: &Id) -> super::Result<Vec<User>> {
        decode_all(self.store.query(&directory_query(id)).await?)
    }

    async fn insert(&self, user: &User) -> super::Result<()> {
        let fields = model::encode(user)?;
        self.store
            .set(&super::collection().doc(&user.id), fields, false)
            .await?;
        Ok(())
    }

    async fn update_profile(&self, id: &Id, update: &ProfileUpdate) -> super::Result<()> {
        let path = super::collection().doc(id);
        let mut batch = WriteBatch::new();
        batch
            .merge(path.clone(), model::encode(update)?)
            .update(path, vec![("lastUpdated".into(), FieldUpdate::ServerTimestamp)]);

        self.store.commit(batch).await?;
        Ok(())
    }

    async fn set_picture(&self, id: &Id, url: &str) -> super::Result<()> {
        self.store
            .update(
                &super::collection().doc(id),
                vec![
                    ("profilePicture".into(), FieldUpdate::set(url)),
                    ("lastUpdated".into(), FieldUpdate::ServerTimestamp),
                ],
            )
            .await?;
        Ok(())
    }
}

fn decode_all(docs: Vec<store::Document>) -> super::Result<Vec<User>> {
    docs.iter()
        .map(|d| d.decode().map_err(super::Error::from))
        .collect()
}
