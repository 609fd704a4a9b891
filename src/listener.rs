use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use log::{debug, error, warn};
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::alert::{Alert, Alerts};
use crate::entity::{Entities, Entity};
use crate::store::{Document, ListenerId, Query, Store};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Idle,
    Subscribed,
    Errored,
    Unsubscribed,
}

/// What a screen renders for one query. Every snapshot replaces `items`.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewState<T> {
    pub status: Status,
    pub items: Vec<T>,
    /// Number of deliveries applied so far.
    pub revision: u64,
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            status: Status::Idle,
            items: Vec::new(),
            revision: 0,
        }
    }
}

type OnSnapshot<T> = Arc<dyn Fn(&[T]) + Send + Sync>;

/// Shared destination of listener deliveries.
pub struct View<T> {
    state: Arc<watch::Sender<ViewState<T>>>,
    alerts: Alerts,
    failure: String,
    on_snapshot: Option<OnSnapshot<T>>,
}

impl<T> Clone for View<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            alerts: self.alerts.clone(),
            failure: self.failure.clone(),
            on_snapshot: self.on_snapshot.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> View<T> {
    /// `failure` is the alert message shown when the subscription errors.
    pub fn new(alerts: &Alerts, failure: &str) -> Self {
        let (tx, _) = watch::channel(ViewState::default());
        Self {
            state: Arc::new(tx),
            alerts: alerts.clone(),
            failure: failure.to_string(),
            on_snapshot: None,
        }
    }

    pub fn state(&self) -> ViewState<T> {
        self.state.borrow().clone()
    }

    pub fn items(&self) -> Vec<T> {
        self.state.borrow().items.clone()
    }

    pub fn status(&self) -> Status {
        self.state.borrow().status
    }

    pub fn revision(&self) -> u64 {
        self.state.borrow().revision
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState<T>> {
        self.state.subscribe()
    }

    fn set_status(&self, status: Status) {
        self.state.send_modify(|s| s.status = status);
    }

    fn deliver(&self, items: Vec<T>) {
        if let Some(f) = &self.on_snapshot {
            f(&items);
        }
        self.state.send_modify(|s| {
            s.status = Status::Subscribed;
            s.items = items;
            s.revision += 1;
        });
    }

    fn fail(&self) {
        self.state.send_modify(|s| {
            s.status = Status::Errored;
            s.items.clear();
            s.revision += 1;
        });
        self.alerts.raise(Alert::error(self.failure.as_str()));
    }
}

impl<T: Entity> View<T> {
    /// Also upserts every delivered item into `entities`, and evicts the
    /// ids this view delivered before that the latest snapshot no longer has.
    pub fn feeding(mut self, entities: &Entities<T>) -> Self {
        let entities = entities.clone();
        let delivered = Mutex::new(HashSet::<String>::new());
        self.on_snapshot = Some(Arc::new(move |items: &[T]| {
            let current = items.iter().map(|i| i.id().to_string()).collect::<HashSet<_>>();
            let gone = {
                let mut seen = match delivered.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                let gone = seen.difference(&current).cloned().collect::<Vec<_>>();
                *seen = current;
                gone
            };
            entities.evict(&gone);
            entities.upsert_all(items.iter().cloned());
        }));
        self
    }
}

/// One realtime subscription. Released exactly once, on `unsubscribe` or drop.
pub struct Listener<T> {
    store: Store,
    id: Option<ListenerId>,
    task: Option<JoinHandle<()>>,
    view: View<T>,
}

impl<T> Listener<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub async fn open(store: &Store, query: &Query, view: &View<T>) -> Self {
        let mut listener = Self {
            store: store.clone(),
            id: None,
            task: None,
            view: view.clone(),
        };

        let mut registration = match store.listen(query).await {
            Ok(r) => r,
            Err(e) => {
                error!("failed to listen on {}: {e}", query.collection);
                view.fail();
                return listener;
            }
        };
        listener.id = Some(registration.id);
        view.set_status(Status::Subscribed);

        let view = view.clone();
        let collection = query.collection.clone();
        listener.task = Some(tokio::spawn(async move {
            while let Some(next) = registration.snapshots.next().await {
                match next {
                    Ok(snapshot) => view.deliver(decode_all(&snapshot.docs)),
                    Err(e) => {
                        error!("listener on {collection} failed: {e}");
                        view.fail();
                        break;
                    }
                }
            }
        }));

        listener
    }
}

impl<T> Listener<T> {
    pub fn id(&self) -> Option<ListenerId> {
        self.id
    }

    pub fn unsubscribe(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if let Some(id) = self.id.take() {
            self.store.unlisten(id);
            self.view.state.send_modify(|s| s.status = Status::Unsubscribed);
        }
    }
}

impl<T> Drop for Listener<T> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

fn decode_all<T: DeserializeOwned>(docs: &[Document]) -> Vec<T> {
    docs.iter()
        .filter_map(|d| match d.decode() {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("skipping undecodable document: {e}");
                None
            }
        })
        .collect()
}

/// Holds the single active listener for a logical query whose parameters
/// change over time.
pub struct ListenerSlot<T> {
    store: Store,
    view: View<T>,
    current: Option<(Query, Listener<T>)>,
}

impl<T> ListenerSlot<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(store: &Store, view: View<T>) -> Self {
        Self {
            store: store.clone(),
            view,
            current: None,
        }
    }

    /// Releases the current listener, then opens one for `query`. A query
    /// equal to the current one keeps the existing listener.
    pub async fn replace(&mut self, query: Query) {
        if self.query() == Some(&query) {
            return;
        }
        if let Some((old, mut listener)) = self.current.take() {
            debug!("replacing listener on {}", old.collection);
            listener.unsubscribe();
        }

        let listener = Listener::open(&self.store, &query, &self.view).await;
        self.current = Some((query, listener));
    }

    pub fn clear(&mut self) {
        if let Some((_, mut listener)) = self.current.take() {
            listener.unsubscribe();
        }
    }

    pub fn query(&self) -> Option<&Query> {
        self.current.as_ref().map(|(q, _)| q)
    }

    pub fn view(&self) -> &View<T> {
        &self.view
    }
}
