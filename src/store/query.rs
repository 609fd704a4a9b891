use std::cmp::Ordering;

use serde_json::Value;

use super::{CollectionPath, Document};

#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    NotEq(String, Value),
    ArrayContains(String, Value),
    In(String, Vec<Value>),
    IdIn(Vec<String>),
}

impl Filter {
    fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::Eq(field, v) => doc.field(field) == Some(v),
            Filter::NotEq(field, v) => doc.field(field).is_some_and(|f| f != v),
            Filter::ArrayContains(field, v) => doc
                .field(field)
                .and_then(Value::as_array)
                .is_some_and(|a| a.contains(v)),
            Filter::In(field, values) => doc.field(field).is_some_and(|f| values.contains(f)),
            Filter::IdIn(ids) => ids.iter().any(|id| id == doc.id()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub collection: CollectionPath,
    pub filters: Vec<Filter>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(collection: &CollectionPath) -> Self {
        Self {
            collection: collection.clone(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(field.into(), value.into()));
        self
    }

    pub fn where_not_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::NotEq(field.into(), value.into()));
        self
    }

    pub fn where_array_contains(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters
            .push(Filter::ArrayContains(field.into(), value.into()));
        self
    }

    pub fn where_in(mut self, field: &str, values: Vec<Value>) -> Self {
        self.filters.push(Filter::In(field.into(), values));
        self
    }

    pub fn where_id_in(mut self, ids: Vec<String>) -> Self {
        self.filters.push(Filter::IdIn(ids));
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Documents lacking the ordered field are excluded, like a backend index would.
    pub fn matches(&self, doc: &Document) -> bool {
        doc.path.collection() == &self.collection
            && self.filters.iter().all(|f| f.matches(doc))
            && self
                .order_by
                .as_ref()
                .is_none_or(|(field, _)| doc.field(field).is_some())
    }

    pub fn apply<'a>(&self, docs: impl Iterator<Item = &'a Document>) -> Vec<Document> {
        let mut matched = docs.filter(|d| self.matches(d)).cloned().collect::<Vec<_>>();

        if let Some((field, direction)) = &self.order_by {
            matched.sort_by(|a, b| {
                let ord = compare(a.field(field), b.field(field)).then_with(|| a.id().cmp(b.id()));
                match direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }

        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }

        matched
    }
}

fn rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

pub(crate) fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (Value::Number(x), Value::Number(y)) => {
                let x = x.as_f64().unwrap_or_default();
                let y = y.as_f64().unwrap_or_default();
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
            (Value::String(x), Value::String(y)) => x.cmp(y),
            _ => rank(a).cmp(&rank(b)),
        },
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    fn doc(col: &CollectionPath, id: &str, data: Value) -> Document {
        Document::new(col.doc(id), data.as_object().cloned().unwrap())
    }

    #[test]
    fn should_filter_and_order_desc() {
        let chats = CollectionPath::new("chats");
        let docs = [
            doc(&chats, "c1", json!({ "participants": ["u1", "u2"], "lastMessageTime": 10 })),
            doc(&chats, "c2", json!({ "participants": ["u1", "u3"], "lastMessageTime": 30 })),
            doc(&chats, "c3", json!({ "participants": ["u2", "u3"], "lastMessageTime": 20 })),
        ];

        let q = Query::collection(&chats)
            .where_array_contains("participants", "u1")
            .order_by("lastMessageTime", Direction::Desc);

        let ids = q.apply(docs.iter()).iter().map(|d| d.id().to_string()).collect::<Vec<_>>();

        assert_eq!(ids, vec!["c2", "c1"]);
    }

    #[test]
    fn should_exclude_documents_without_order_field() {
        let posts = CollectionPath::new("posts");
        let docs = [
            doc(&posts, "p1", json!({ "createdAt": 1 })),
            doc(&posts, "p2", json!({})),
        ];

        let q = Query::collection(&posts).order_by("createdAt", Direction::Asc);

        assert_eq!(q.apply(docs.iter()).len(), 1);
    }

    #[test]
    fn should_match_not_eq_only_when_field_present() {
        let users = CollectionPath::new("users");
        let q = Query::collection(&users).where_not_eq("uid", "u1");

        assert!(q.matches(&doc(&users, "u2", json!({ "uid": "u2" }))));
        assert!(!q.matches(&doc(&users, "u1", json!({ "uid": "u1" }))));
        assert!(!q.matches(&doc(&users, "u3", json!({}))));
    }

    #[test]
    fn should_match_ids_and_limit() {
        let users = CollectionPath::new("users");
        let docs = [
            doc(&users, "a", json!({})),
            doc(&users, "b", json!({})),
            doc(&users, "c", json!({})),
        ];

        let q = Query::collection(&users)
            .where_id_in(vec!["a".into(), "c".into()])
            .limit(1);

        assert_eq!(q.apply(docs.iter()).len(), 1);
    }
}
