use std::collections::HashSet;

use async_trait::async_trait;
use log::{debug, info, warn};

use super::model::{Friend, FriendRequest};
use super::{Error, Status, Transition};
use crate::auth::Principal;
use crate::notification::model::{self as notification, Kind, Notification};
use crate::store::{DocPath, FieldUpdate, Query, Store, WriteBatch, model};
use crate::{clock, user};

#[async_trait]
pub trait FriendService {
    async fn send_request(&self, me: &Principal, to: &user::Id) -> super::Result<FriendRequest>;

    async fn find_request(&self, id: &str) -> super::Result<FriendRequest>;

    /// Pending requests addressed to `me`.
    async fn incoming(&self, me: &user::Id) -> super::Result<Vec<FriendRequest>>;

    async fn accept(&self, me: &Principal, request_id: &str) -> super::Result<()>;

    async fn reject(&self, me: &user::Id, request_id: &str) -> super::Result<()>;

    async fn remove(&self, me: &user::Id, friend: &user::Id) -> super::Result<()>;

    async fn friends(&self, me: &user::Id) -> super::Result<Vec<Friend>>;

    async fn is_friend(&self, me: &user::Id, other: &user::Id) -> super::Result<bool>;

    /// Restores missing reverse edges of `me`'s friendships. Returns how
    /// many edges were written.
    async fn reconcile(&self, me: &user::Id) -> super::Result<usize>;
}

/// `users/{me}/friends`
pub fn friends_query(me: &user::Id) -> Query {
    Query::collection(&user::friends(me))
}

pub fn incoming_query(me: &user::Id) -> Query {
    Query::collection(&super::requests())
        .where_eq("to", me)
        .where_eq("status", "pending")
}

fn edge(owner: &user::Id, friend: &user::Id) -> DocPath {
    user::friends(owner).doc(friend)
}

/// Legacy clients left placeholder documents such as `_dummy` in the
/// friends collection.
pub(crate) fn is_placeholder(id: &str) -> bool {
    id.starts_with('_')
}

#[derive(Clone)]
pub struct FriendServiceImpl {
    store: Store,
}

impl FriendServiceImpl {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    async fn requests_between(
        &self,
        from: &user::Id,
        to: &user::Id,
        status: Status,
    ) -> super::Result<Vec<FriendRequest>> {
        let status = model::encode_value(&status)?;
        let q = Query::collection(&super::requests())
            .where_eq("from", from)
            .where_eq("to", to)
            .where_eq("status", status);

        let docs = self.store.query(&q).await?;
        Ok(docs
            .iter()
            .map(|d| d.decode())
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn requests_involving(
        &self,
        me: &user::Id,
        status: Status,
    ) -> super::Result<Vec<FriendRequest>> {
        let status = model::encode_value(&status)?;
        let mut found = Vec::new();
        for field in ["from", "to"] {
            let q = Query::collection(&super::requests())
                .where_eq(field, me)
                .where_eq("status", status.clone());
            for doc in self.store.query(&q).await? {
                found.push(doc.decode()?);
            }
        }
        Ok(found)
    }
}

#[async_trait]
impl FriendService for FriendServiceImpl {
    async fn send_request(&self, me: &Principal, to: &user::Id) -> super::Result<FriendRequest> {
        if &me.uid == to {
            return Err(Error::SelfReference);
        }
        if self.is_friend(&me.uid, to).await? {
            return Err(Error::AlreadyFriends(to.clone()));
        }
        if !self
            .requests_between(&me.uid, to, Status::Pending)
            .await?
            .is_empty()
        {
            return Err(Error::AlreadyRequested(to.clone()));
        }

        let mut request = FriendRequest::new(&me.uid, to, clock::now());

        let mut batch = WriteBatch::new();
        let path = batch.create_in(&super::requests(), model::encode(&request)?);
        request.id = path.id().to_string();
        let n = Notification::new(Kind::FriendRequest, to, me).with_request(&request.id);
        notification::stage(&mut batch, &n)?;

        self.store.commit(batch).await?;
        info!("friend request {} from {} to {to}", request.id, me.uid);

        Ok(request)
    }

    async fn find_request(&self, id: &str) -> super::Result<FriendRequest> {
        match self.store.get(&super::requests().doc(id)).await? {
            Some(doc) => Ok(doc.decode()?),
            None => Err(Error::NotFound(id.to_string())),
        }
    }

    async fn incoming(&self, me: &user::Id) -> super::Result<Vec<FriendRequest>> {
        let docs = self.store.query(&incoming_query(me)).await?;
        Ok(docs
            .iter()
            .map(|d| d.decode())
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn accept(&self, me: &Principal, request_id: &str) -> super::Result<()> {
        let request = self.find_request(request_id).await?;
        let next = request.status.transition(
            &request.to,
            Transition::Accept {
                responder: &me.uid,
            },
        )?;

        let now = clock::now();
        let mut batch = WriteBatch::new();
        batch
            .update(
                super::requests().doc(request_id),
                vec![
                    ("status".into(), FieldUpdate::Set(model::encode_value(&next)?)),
                    ("updatedAt".into(), FieldUpdate::ServerTimestamp),
                ],
            )
            .set(
                edge(&request.to, &request.from),
                model::encode(&Friend::new(&request.from, now, Some(request_id)))?,
            )
            .set(
                edge(&request.from, &request.to),
                model::encode(&Friend::new(&request.to, now, Some(request_id)))?,
            );
        let n = Notification::new(Kind::FriendAccept, &request.from, me)
            .with_request(request_id);
        notification::stage(&mut batch, &n)?;

        self.store.commit(batch).await?;
        info!("{} and {} are now friends", request.from, request.to);
        Ok(())
    }

    async fn reject(&self, me: &user::Id, request_id: &str) -> super::Result<()> {
        let request = self.find_request(request_id).await?;
        let next = request
            .status
            .transition(&request.to, Transition::Reject { responder: me })?;

        self.store
            .update(
                &super::requests().doc(request_id),
                vec![
                    ("status".into(), FieldUpdate::Set(model::encode_value(&next)?)),
                    ("updatedAt".into(), FieldUpdate::ServerTimestamp),
                ],
            )
            .await?;
        Ok(())
    }

    async fn remove(&self, me: &user::Id, friend: &user::Id) -> super::Result<()> {
        let mut batch = WriteBatch::new();
        batch.delete(edge(me, friend)).delete(edge(friend, me));

        // accepted requests would otherwise bring the edges back on reconcile
        for (from, to) in [(me, friend), (friend, me)] {
            for r in self.requests_between(from, to, Status::Accepted).await? {
                batch.delete(super::requests().doc(&r.id));
            }
        }

        self.store.commit(batch).await?;
        info!("{me} and {friend} are no longer friends");
        Ok(())
    }

    async fn friends(&self, me: &user::Id) -> super::Result<Vec<Friend>> {
        let docs = self.store.query(&friends_query(me)).await?;
        Ok(docs
            .iter()
            .filter(|d| !is_placeholder(d.id()))
            .map(|d| d.decode())
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn is_friend(&self, me: &user::Id, other: &user::Id) -> super::Result<bool> {
        Ok(self.store.get(&edge(me, other)).await?.is_some())
    }

    async fn reconcile(&self, me: &user::Id) -> super::Result<usize> {
        let now = clock::now();
        let mut batch = WriteBatch::new();
        let mut staged = HashSet::new();

        for f in self.friends(me).await? {
            if !self.is_friend(&f.id, me).await? {
                warn!("missing edge {} -> {me}, repairing", f.id);
                let reverse = Friend {
                    id: me.clone(),
                    since: f.since.or(Some(now)),
                    request_id: f.request_id.clone(),
                };
                batch.set(edge(&f.id, me), model::encode(&reverse)?);
                staged.insert((f.id.clone(), me.clone()));
            }
        }

        for r in self.requests_involving(me, Status::Accepted).await? {
            for (owner, friend) in [(&r.from, &r.to), (&r.to, &r.from)] {
                let key = (owner.clone(), friend.clone());
                if staged.contains(&key) || self.is_friend(owner, friend).await? {
                    continue;
                }
                warn!("missing edge {owner} -> {friend} of request {}, repairing", r.id);
                batch.set(
                    edge(owner, friend),
                    model::encode(&Friend::new(
                        friend,
                        r.updated_at.unwrap_or(now),
                        Some(r.id.as_str()),
                    ))?,
                );
                staged.insert(key);
            }
        }

        if batch.is_empty() {
            debug!("friend edges of {me} are consistent");
            return Ok(0);
        }

        let repaired = batch.len();
        self.store.commit(batch).await?;
        Ok(repaired)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::notification::service::{NotificationService, NotificationServiceImpl};
    use crate::store::memory::MemoryStore;
    use crate::store::{DocumentStore, Fields};

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
        friends: FriendServiceImpl,
        notifications: NotificationServiceImpl,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        Fixture {
            friends: FriendServiceImpl::new(Arc::new(store.clone())),
            notifications: NotificationServiceImpl::new(Arc::new(store.clone())),
            store,
        }
    }

    #[tokio::test]
    async fn should_reject_self_and_duplicate_requests() {
        let f = fixture();
        let jora = principal("u1", "jora");
        let valera = user::Id::from("u2");

        assert!(matches!(
            f.friends.send_request(&jora, &jora.uid).await,
            Err(Error::SelfReference)
        ));

        f.friends.send_request(&jora, &valera).await.unwrap();
        assert!(matches!(
            f.friends.send_request(&jora, &valera).await,
            Err(Error::AlreadyRequested(_))
        ));
    }

    #[tokio::test]
    async fn should_make_friendship_symmetric_on_accept() {
        let f = fixture();
        let jora = principal("u1", "jora");
        let valera = principal("u2", "valera");
        let request = f.friends.send_request(&jora, &valera.uid).await.unwrap();

        assert!(matches!(
            f.friends.accept(&jora, &request.id).await,
            Err(Error::NotRecipient(_))
        ));
        f.friends.accept(&valera, &request.id).await.unwrap();

        assert!(f.friends.is_friend(&jora.uid, &valera.uid).await.unwrap());
        assert!(f.friends.is_friend(&valera.uid, &jora.uid).await.unwrap());
        assert_eq!(
            f.friends.find_request(&request.id).await.unwrap().status,
            Status::Accepted
        );
        let to_jora = f.notifications.find_for(&jora.uid).await.unwrap();
        assert_eq!(to_jora[0].kind, Kind::FriendAccept);
        assert!(matches!(
            f.friends.accept(&valera, &request.id).await,
            Err(Error::NotPending(Status::Accepted))
        ));
        assert!(matches!(
            f.friends.send_request(&jora, &valera.uid).await,
            Err(Error::AlreadyFriends(_))
        ));
    }

    #[tokio::test]
    async fn should_leave_nothing_applied_when_accept_fails() {
        let f = fixture();
        let jora = principal("u1", "jora");
        let valera = principal("u2", "valera");
        let request = f.friends.send_request(&jora, &valera.uid).await.unwrap();
        f.store.fail_nth_write(0);

        assert!(f.friends.accept(&valera, &request.id).await.is_err());

        assert!(!f.friends.is_friend(&jora.uid, &valera.uid).await.unwrap());
        assert!(!f.friends.is_friend(&valera.uid, &jora.uid).await.unwrap());
        assert_eq!(
            f.friends.find_request(&request.id).await.unwrap().status,
            Status::Pending
        );
    }

    #[tokio::test]
    async fn should_reject_request() {
        let f = fixture();
        let jora = principal("u1", "jora");
        let valera = principal("u2", "valera");
        let request = f.friends.send_request(&jora, &valera.uid).await.unwrap();

        f.friends.reject(&valera.uid, &request.id).await.unwrap();

        assert!(f.friends.incoming(&valera.uid).await.unwrap().is_empty());
        assert!(!f.friends.is_friend(&valera.uid, &jora.uid).await.unwrap());
        f.friends.send_request(&jora, &valera.uid).await.unwrap();
    }

    #[tokio::test]
    async fn should_remove_both_edges_for_good() {
        let f = fixture();
        let jora = principal("u1", "jora");
        let valera = principal("u2", "valera");
        let request = f.friends.send_request(&jora, &valera.uid).await.unwrap();
        f.friends.accept(&valera, &request.id).await.unwrap();

        f.friends.remove(&jora.uid, &valera.uid).await.unwrap();

        assert!(f.friends.friends(&jora.uid).await.unwrap().is_empty());
        assert!(f.friends.friends(&valera.uid).await.unwrap().is_empty());
        assert_eq!(f.friends.reconcile(&jora.uid).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn should_repair_legacy_one_sided_edges() {
        let f = fixture();
        let me = user::Id::from("u1");
        let legacy = user::Id::from("u2");
        f.store
            .set(&edge(&me, &legacy), Fields::new(), false)
            .await
            .unwrap();
        f.store
            .set(&edge(&me, &user::Id::from("_dummy")), Fields::new(), false)
            .await
            .unwrap();

        assert_eq!(f.friends.reconcile(&me).await.unwrap(), 1);

        assert!(f.friends.is_friend(&legacy, &me).await.unwrap());
        assert_eq!(f.friends.friends(&me).await.unwrap().len(), 1);
        assert_eq!(f.friends.reconcile(&me).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn should_restore_edges_of_accepted_request() {
        let f = fixture();
        let me = user::Id::from("u1");
        let mut request = FriendRequest::new(&user::Id::from("u2"), &me, clock::now());
        request.status = Status::Accepted;
        f.store
            .add(&crate::friend::requests(), model::encode(&request).unwrap())
            .await
            .unwrap();

        assert_eq!(f.friends.reconcile(&me).await.unwrap(), 2);

        assert!(f.friends.is_friend(&me, &user::Id::from("u2")).await.unwrap());
        assert!(f.friends.is_friend(&user::Id::from("u2"), &me).await.unwrap());
    }
}
