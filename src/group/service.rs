use async_trait::async_trait;
use bytes::Bytes;
use identicon_rs::Identicon;
use log::{debug, info};

use super::Error;
use super::model::{Group, Image, NewGroup};
use crate::auth::Principal;
use crate::chat::model::Message;
use crate::store::{Direction, FieldUpdate, Query, Store, model};
use crate::{clock, storage, user};

const PNG: &str = "image/png";

#[async_trait]
pub trait GroupService {
    async fn create(&self, me: &Principal, new: NewGroup) -> super::Result<Group>;

    async fn find_by_id(&self, id: &str) -> super::Result<Group>;

    async fn join(&self, me: &user::Id, group_id: &str) -> super::Result<()>;

    async fn leave(&self, me: &user::Id, group_id: &str) -> super::Result<()>;

    async fn send_message(
        &self,
        me: &Principal,
        group_id: &str,
        text: &str,
    ) -> super::Result<Message>;
}

/// Groups `me` belongs to.
pub fn groups_query(me: &user::Id) -> Query {
    Query::collection(&super::collection())
        .where_array_contains("members", me)
        .order_by("createdAt", Direction::Desc)
}

/// Messages of a group, oldest first.
pub fn messages_query(group_id: &str) -> Query {
    Query::collection(&super::messages(group_id)).order_by("createdAt", Direction::Asc)
}

#[derive(Clone)]
pub struct GroupServiceImpl {
    store: Store,
    storage: storage::Storage,
}

impl GroupServiceImpl {
    pub fn new(store: Store, storage: storage::Storage) -> Self {
        Self { store, storage }
    }

    async fn upload_image(
        &self,
        me: &user::Id,
        name: &str,
        image: Option<Image>,
    ) -> super::Result<String> {
        let image = match image {
            Some(image) => image,
            None => generate_image(name)?,
        };

        let path = storage::group_image_path(me, clock::now_millis());
        let url = self
            .storage
            .put(&path, image.data, &image.content_type)
            .await?;

        Ok(url.to_string())
    }
}

/// Identicon derived from the group name.
pub fn generate_image(seed: &str) -> super::Result<Image> {
    let png = Identicon::new(seed)
        .export_png_data()
        .map_err(|e| Error::Image(e.to_string()))?;

    Ok(Image {
        data: Bytes::from(png),
        content_type: PNG.to_string(),
    })
}

#[async_trait]
impl GroupService for GroupServiceImpl {
    async fn create(&self, me: &Principal, new: NewGroup) -> super::Result<Group> {
        let name = new.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::MissingName);
        }

        let mut members = vec![me.uid.clone()];
        for m in new.members {
            if !members.contains(&m) {
                members.push(m);
            }
        }

        let image = self.upload_image(&me.uid, &name, new.image).await?;

        let mut group = Group {
            id: String::new(),
            name,
            image,
            members,
            created_by: me.uid.clone(),
            created_at: clock::now(),
        };
        let path = self
            .store
            .add(&super::collection(), model::encode(&group)?)
            .await?;
        group.id = path.id().to_string();
        info!("group {} created by {}", group.id, me.uid);

        Ok(group)
    }

    async fn find_by_id(&self, id: &str) -> super::Result<Group> {
        match self.store.get(&super::collection().doc(id)).await? {
            Some(doc) => Ok(doc.decode()?),
            None => Err(Error::NotFound(id.to_string())),
        }
    }

    async fn join(&self, me: &user::Id, group_id: &str) -> super::Result<()> {
        self.store
            .update(
                &super::collection().doc(group_id),
                vec![("members".into(), FieldUpdate::union(me))],
            )
            .await?;
        debug!("{me} joined group {group_id}");
        Ok(())
    }

    async fn leave(&self, me: &user::Id, group_id: &str) -> super::Result<()> {
        self.store
            .update(
                &super::collection().doc(group_id),
                vec![("members".into(), FieldUpdate::remove(me))],
            )
            .await?;
        debug!("{me} left group {group_id}");
        Ok(())
    }

    async fn send_message(
        &self,
        me: &Principal,
        group_id: &str,
        text: &str,
    ) -> super::Result<Message> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::EmptyMessage);
        }

        let group = self.find_by_id(group_id).await?;
        if !group.is_member(&me.uid) {
            return Err(Error::NotMember(me.uid.clone()));
        }

        let mut message = Message {
            id: String::new(),
            sender_id: me.uid.clone(),
            sender_name: me.name().to_string(),
            text: text.to_string(),
            created_at: clock::now(),
            read: false,
        };
        let path = self
            .store
            .add(&super::messages(group_id), model::encode(&message)?)
            .await?;
        message.id = path.id().to_string();

        Ok(message)
    }
}
