//! Backend self-test run by the `focus-hub` binary.

use std::fmt::Display;
use std::time::Duration;

use log::{error, info};
use serde_json::Value;

use crate::clock;
use crate::listener::{self, Listener, View};
use crate::state::AppState;
use crate::store::{CollectionPath, DocPath, Fields, Query};

const TEST: &str = "test";
const CONNECTION_TEST: &str = "connection-test";
const LISTENER_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Pass,
    Fail,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Check {
    pub name: &'static str,
    pub status: Status,
    pub message: String,
}

impl Check {
    fn pass(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            status: Status::Pass,
            message: message.into(),
        }
    }

    fn fail(name: &'static str, e: impl Display) -> Self {
        Self {
            name,
            status: Status::Fail,
            message: e.to_string(),
        }
    }

    fn from_result(name: &'static str, res: Result<String, String>) -> Self {
        match res {
            Ok(m) => Self::pass(name, m),
            Err(e) => Self::fail(name, e),
        }
    }
}

pub fn test_doc() -> DocPath {
    CollectionPath::new(TEST).doc(CONNECTION_TEST)
}

/// Runs every check, never stopping at the first failure.
pub async fn run(state: &AppState) -> Vec<Check> {
    let checks = vec![
        Check::from_result("Authentication", auth_round_trip(state).await),
        Check::from_result("Document Write", write(state).await),
        Check::from_result("Document Read", read(state).await),
        Check::from_result("Realtime Listener", listen(state).await),
    ];

    for c in &checks {
        match c.status {
            Status::Pass => info!("{}: {}", c.name, c.message),
            Status::Fail => error!("{}: {}", c.name, c.message),
        }
    }
    checks
}

pub fn all_passed(checks: &[Check]) -> bool {
    checks.iter().all(|c| c.status == Status::Pass)
}

async fn auth_round_trip(state: &AppState) -> Result<String, String> {
    let email = format!("{CONNECTION_TEST}-{}@focushub.app", uuid::Uuid::new_v4().simple());

    let principal = state
        .auth
        .sign_up(&email, "connection-test")
        .await
        .map_err(|e| e.to_string())?;
    state.auth.delete_current().await.map_err(|e| e.to_string())?;

    Ok(format!("signed up and removed {}", principal.uid))
}

async fn write(state: &AppState) -> Result<String, String> {
    let mut fields = Fields::new();
    fields.insert("message".into(), Value::from("Connection test successful"));
    fields.insert("timestamp".into(), Value::from(clock::now_millis()));

    state
        .store
        .set(&test_doc(), fields, true)
        .await
        .map_err(|e| e.to_string())?;

    Ok(format!("wrote {}", test_doc()))
}

async fn read(state: &AppState) -> Result<String, String> {
    let doc = state
        .store
        .get(&test_doc())
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("{} is missing", test_doc()))?;

    match doc.field("message").and_then(Value::as_str) {
        Some(m) => Ok(format!("read back \"{m}\"")),
        None => Err(format!("{} has no message", test_doc())),
    }
}

async fn listen(state: &AppState) -> Result<String, String> {
    let view = View::<Value>::new(state.app.alerts(), "Realtime listener failed");
    let query = Query::collection(&CollectionPath::new(TEST));
    let mut sub = Listener::open(&state.store, &query, &view).await;

    let mut rx = view.subscribe();
    let delivered = tokio::time::timeout(LISTENER_TIMEOUT, rx.wait_for(|s| s.revision > 0))
        .await
        .map(|r| r.map(|s| (s.status, s.items.len())));
    sub.unsubscribe();

    match delivered {
        Ok(Ok((listener::Status::Subscribed, n))) if n > 0 => Ok(format!("received {n} documents")),
        Ok(Ok((listener::Status::Subscribed, _))) => Err("snapshot was empty".into()),
        Ok(Ok(_)) => Err("listener failed".into()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("no snapshot within {LISTENER_TIMEOUT:?}")),
    }
}
