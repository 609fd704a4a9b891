use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, warn};

use crate::entity::{Entities, Entity};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Committed,
    RolledBack,
}

/// A local change that is shown before the backend confirms it.
#[derive(Clone, Debug)]
pub struct Mutation<S> {
    prior: S,
    optimistic: S,
    phase: Phase,
}

impl<S> Mutation<S> {
    pub fn begin(prior: S, change: impl FnOnce(&S) -> S) -> Self {
        let optimistic = change(&prior);
        Self {
            prior,
            optimistic,
            phase: Phase::Pending,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn visible(&self) -> &S {
        match self.phase {
            Phase::Pending | Phase::Committed => &self.optimistic,
            Phase::RolledBack => &self.prior,
        }
    }

    pub fn commit(&mut self) -> &S {
        if self.phase == Phase::Pending {
            self.phase = Phase::Committed;
        }
        self.visible()
    }

    pub fn roll_back(&mut self) -> &S {
        if self.phase == Phase::Pending {
            self.phase = Phase::RolledBack;
        }
        self.visible()
    }
}

/// Where optimistic values are shown.
pub trait Target<S> {
    fn read(&self, key: &str) -> Option<S>;

    fn write(&self, key: &str, value: S);
}

impl<T: Entity> Target<T> for Entities<T> {
    fn read(&self, key: &str) -> Option<T> {
        self.get(key)
    }

    fn write(&self, _key: &str, value: T) {
        self.upsert(value);
    }
}

/// Keys with a mutation in progress.
#[derive(Clone, Default)]
pub struct InFlight {
    keys: Arc<Mutex<HashSet<String>>>,
}

pub struct Guard {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for Guard {
    fn drop(&mut self) {
        lock(&self.keys).remove(&self.key);
    }
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, key: &str) -> Result<Guard, Error> {
        if !lock(&self.keys).insert(key.to_string()) {
            return Err(Error::InFlight(key.to_string()));
        }
        Ok(Guard {
            keys: self.keys.clone(),
            key: key.to_string(),
        })
    }

    pub fn is_pending(&self, key: &str) -> bool {
        lock(&self.keys).contains(key)
    }
}

fn lock(keys: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    match keys.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Shows `change` immediately, then runs `write`. A failed write applies
/// `undo` to whatever the target holds by then and hands back the write
/// error, so snapshots delivered in the meantime survive the rollback.
pub async fn apply<S, T, C, U, W, F, E>(
    target: &T,
    in_flight: &InFlight,
    key: &str,
    change: C,
    undo: U,
    write: W,
) -> Result<S, E>
where
    S: Clone,
    T: Target<S>,
    C: FnOnce(&S) -> S,
    U: FnOnce(&S) -> S,
    W: FnOnce(S) -> F,
    F: Future<Output = Result<(), E>>,
    E: From<Error>,
{
    let _guard = in_flight.begin(key)?;
    let prior = target
        .read(key)
        .ok_or_else(|| Error::Missing(key.to_string()))?;

    let mut mutation = Mutation::begin(prior, change);
    target.write(key, mutation.visible().clone());

    match write(mutation.visible().clone()).await {
        Ok(()) => {
            debug!("optimistic change on {key} committed");
            Ok(mutation.commit().clone())
        }
        Err(e) => {
            warn!("optimistic change on {key} rolled back");
            mutation.roll_back();
            if let Some(current) = target.read(key) {
                target.write(key, undo(&current));
            }
            Err(e)
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("a change to {0} is already in progress")]
    InFlight(String),
    #[error("nothing to change at {0}")]
    Missing(String),
}
