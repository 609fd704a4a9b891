use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{CollectionPath, DocPath};

pub type Fields = serde_json::Map<String, Value>;

#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub path: DocPath,
    pub data: Fields,
}

impl Document {
    pub fn new(path: DocPath, data: Fields) -> Self {
        Self { path, data }
    }

    pub fn id(&self) -> &str {
        self.path.id()
    }

    /// Looks up a possibly dotted field path (`participantsInfo.u1.name`).
    pub fn field(&self, field: &str) -> Option<&Value> {
        let mut parts = field.split('.');
        let mut current = self.data.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    /// Decodes the document into `T`, exposing the document id as `id`.
    pub fn decode<T: DeserializeOwned>(&self) -> super::Result<T> {
        let mut data = self.data.clone();
        data.insert("id".into(), Value::String(self.id().to_string()));

        serde_json::from_value(Value::Object(data)).map_err(|e| super::Error::InvalidDocument {
            path: self.path.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Serializes an entity into document fields. The `id` field lives in the
/// document path and is never stored as data.
pub fn encode<T: Serialize>(value: &T) -> super::Result<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(map)
        }
        other => Err(super::Error::InvalidDocument {
            path: String::new(),
            reason: format!("expected an object, got {other}"),
        }),
    }
}

/// Serializes a single field value, e.g. an enum stored as a string.
pub fn encode_value<T: Serialize>(value: &T) -> super::Result<Value> {
    Ok(serde_json::to_value(value)?)
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldUpdate {
    Set(Value),
    ArrayUnion(Vec<Value>),
    ArrayRemove(Vec<Value>),
    ServerTimestamp,
    Increment(i64),
    Delete,
}

impl FieldUpdate {
    pub fn set(value: impl Into<Value>) -> Self {
        Self::Set(value.into())
    }

    pub fn union(value: impl Into<Value>) -> Self {
        Self::ArrayUnion(vec![value.into()])
    }

    pub fn remove(value: impl Into<Value>) -> Self {
        Self::ArrayRemove(vec![value.into()])
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum WriteOp {
    /// Fails when the document already exists.
    Create { path: DocPath, data: Fields },
    Set { path: DocPath, data: Fields, merge: bool },
    /// Fails when the document does not exist.
    Update {
        path: DocPath,
        updates: Vec<(String, FieldUpdate)>,
    },
    Delete { path: DocPath },
}

impl WriteOp {
    pub fn path(&self) -> &DocPath {
        match self {
            WriteOp::Create { path, .. }
            | WriteOp::Set { path, .. }
            | WriteOp::Update { path, .. }
            | WriteOp::Delete { path } => path,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, path: DocPath, data: Fields) -> &mut Self {
        self.ops.push(WriteOp::Create { path, data });
        self
    }

    /// Creates a document with a generated id and returns its path.
    pub fn create_in(&mut self, collection: &CollectionPath, data: Fields) -> DocPath {
        let path = new_doc(collection);
        self.create(path.clone(), data);
        path
    }

    pub fn set(&mut self, path: DocPath, data: Fields) -> &mut Self {
        self.ops.push(WriteOp::Set {
            path,
            data,
            merge: false,
        });
        self
    }

    pub fn merge(&mut self, path: DocPath, data: Fields) -> &mut Self {
        self.ops.push(WriteOp::Set {
            path,
            data,
            merge: true,
        });
        self
    }

    pub fn update(&mut self, path: DocPath, updates: Vec<(String, FieldUpdate)>) -> &mut Self {
        self.ops.push(WriteOp::Update { path, updates });
        self
    }

    pub fn delete(&mut self, path: DocPath) -> &mut Self {
        self.ops.push(WriteOp::Delete { path });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

pub fn new_doc(collection: &CollectionPath) -> DocPath {
    collection.doc(uuid::Uuid::new_v4().simple())
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub docs: Vec<Document>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

pub(crate) fn apply_update(data: &mut Fields, field: &str, update: &FieldUpdate, now_millis: i64) {
    let (parent, leaf) = match field.rsplit_once('.') {
        Some((parent, leaf)) => (Some(parent), leaf),
        None => (None, field),
    };

    let target = match parent {
        Some(parent) => object_at(data, parent),
        None => data,
    };

    match update {
        FieldUpdate::Set(value) => {
            target.insert(leaf.to_string(), value.clone());
        }
        FieldUpdate::ServerTimestamp => {
            target.insert(leaf.to_string(), Value::from(now_millis));
        }
        FieldUpdate::Delete => {
            target.remove(leaf);
        }
        FieldUpdate::Increment(by) => {
            let current = target.get(leaf).and_then(Value::as_i64).unwrap_or(0);
            target.insert(leaf.to_string(), Value::from(current + by));
        }
        FieldUpdate::ArrayUnion(values) => {
            let mut array = take_array(target, leaf);
            for v in values {
                if !array.contains(v) {
                    array.push(v.clone());
                }
            }
            target.insert(leaf.to_string(), Value::Array(array));
        }
        FieldUpdate::ArrayRemove(values) => {
            let mut array = take_array(target, leaf);
            array.retain(|v| !values.contains(v));
            target.insert(leaf.to_string(), Value::Array(array));
        }
    }
}

/// Deep merge used by `set` with merge semantics: nested objects are merged,
/// everything else is overwritten.
pub(crate) fn merge_fields(target: &mut Fields, incoming: Fields) {
    for (key, value) in incoming {
        let value = match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                merge_fields(existing, nested);
                continue;
            }
            (_, value) => value,
        };
        target.insert(key, value);
    }
}

fn object_at<'a>(data: &'a mut Fields, path: &str) -> &'a mut Fields {
    let mut current = data;
    for part in path.split('.') {
        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Fields::new()));
        if !entry.is_object() {
            *entry = Value::Object(Fields::new());
        }
        current = match entry {
            Value::Object(map) => map,
            _ => unreachable!("entry was just replaced by an object"),
        };
    }
    current
}

fn take_array(target: &mut Fields, leaf: &str) -> Vec<Value> {
    match target.remove(leaf) {
        Some(Value::Array(array)) => array,
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod test {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    fn fields(v: Value) -> Fields {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn should_union_without_duplicates() {
        let mut data = fields(json!({ "likedBy": ["u1"] }));

        apply_update(&mut data, "likedBy", &FieldUpdate::union("u1"), 0);
        apply_update(&mut data, "likedBy", &FieldUpdate::union("u2"), 0);

        assert_eq!(data["likedBy"], json!(["u1", "u2"]));
    }

    #[test]
    fn should_remove_missing_element_as_noop() {
        let mut data = fields(json!({ "likedBy": ["u1"] }));

        apply_update(&mut data, "likedBy", &FieldUpdate::remove("u9"), 0);

        assert_eq!(data["likedBy"], json!(["u1"]));
    }

    #[test]
    fn should_update_nested_field() {
        let mut data = fields(json!({ "participantsInfo": { "u1": { "name": "jora" } } }));

        apply_update(
            &mut data,
            "participantsInfo.u1.photoURL",
            &FieldUpdate::set("jora://pic"),
            0,
        );

        assert_eq!(
            data["participantsInfo"],
            json!({ "u1": { "name": "jora", "photoURL": "jora://pic" } })
        );
    }

    #[test]
    fn should_resolve_server_timestamp() {
        let mut data = Fields::new();

        apply_update(&mut data, "lastUpdated", &FieldUpdate::ServerTimestamp, 42);

        assert_eq!(data["lastUpdated"], json!(42));
    }

    #[test]
    fn should_merge_nested_objects() {
        let mut data = fields(json!({
            "name": "jora",
            "settings": { "darkMode": false, "lang": "ro" }
        }));

        merge_fields(&mut data, fields(json!({ "settings": { "darkMode": true } })));

        assert_eq!(
            Value::Object(data),
            json!({ "name": "jora", "settings": { "darkMode": true, "lang": "ro" } })
        );
    }

    #[test]
    fn should_decode_with_document_id() {
        #[derive(Deserialize)]
        struct Named {
            id: String,
            name: String,
        }

        let doc = Document::new(
            CollectionPath::new("users").doc("u1"),
            fields(json!({ "name": "valera" })),
        );

        let named: Named = doc.decode().unwrap();

        assert_eq!(named.id, "u1");
        assert_eq!(named.name, "valera");
    }
}
