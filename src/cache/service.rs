use std::time::Duration;

use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{Key, Kv, Settings, Timed};
use crate::clock;
use crate::store::{Fields, model};
use crate::user::model::User;

/// On-device cache of the signed-in user's profile and settings.
/// Failures are logged and behave as misses.
#[derive(Clone)]
pub struct LocalCache {
    kv: Kv,
    namespace: String,
    ttl: Duration,
    clock: clock::Shared,
}

impl LocalCache {
    pub fn new(kv: Kv, namespace: &str, ttl: Duration, clock: clock::Shared) -> Self {
        Self {
            kv,
            namespace: namespace.to_string(),
            ttl,
            clock,
        }
    }

    pub async fn save_user_profile(&self, user: &User) {
        let entry = Timed {
            data: user,
            timestamp: self.clock.now().timestamp_millis(),
        };
        self.write(Key::UserProfile, &entry).await;
    }

    /// Returns the cached profile while it is younger than the TTL.
    pub async fn get_user_profile(&self, force_refresh: bool) -> Option<User> {
        if force_refresh {
            return None;
        }

        let entry = self.read::<Timed<User>>(Key::UserProfile).await?;
        let age = self.clock.now().timestamp_millis() - entry.timestamp;
        if age < 0 || age as u128 >= self.ttl.as_millis() {
            debug!("cached profile expired ({age}ms old)");
            return None;
        }

        Some(entry.data)
    }

    pub async fn save_settings(&self, settings: &Settings) {
        self.write(Key::UserSettings, settings).await;
    }

    pub async fn get_settings(&self) -> Option<Settings> {
        self.read(Key::UserSettings).await
    }

    /// Merges a partial settings blob into the stored one.
    pub async fn merge_settings(&self, partial: Fields) -> Settings {
        let mut current = self
            .read::<Fields>(Key::UserSettings)
            .await
            .unwrap_or_default();
        model::merge_fields(&mut current, partial);

        let merged = match serde_json::from_value::<Settings>(Value::Object(current)) {
            Ok(s) => s,
            Err(e) => {
                warn!("discarding malformed settings: {e}");
                Settings::default()
            }
        };
        self.save_settings(&merged).await;
        merged
    }

    pub async fn save_preferences(&self, preferences: &Value) {
        self.write(Key::UserPreferences, preferences).await;
    }

    pub async fn get_preferences(&self) -> Option<Value> {
        self.read(Key::UserPreferences).await
    }

    pub async fn save_stats(&self, stats: &Value) {
        self.write(Key::UserStats, stats).await;
    }

    pub async fn get_stats(&self) -> Option<Value> {
        self.read(Key::UserStats).await
    }

    pub async fn clear(&self) {
        let keys = Key::ALL
            .iter()
            .map(|k| k.namespaced(&self.namespace))
            .collect::<Vec<_>>();

        if let Err(e) = self.kv.remove_many(&keys).await {
            warn!("failed to clear local cache: {e}");
        }
    }
}

impl LocalCache {
    async fn write<T: Serialize + ?Sized>(&self, key: Key, value: &T) {
        let key = key.namespaced(&self.namespace);
        let res = match serde_json::to_string(value) {
            Ok(json) => self.kv.set(&key, json).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = res {
            warn!("failed to write {key}: {e}");
        }
    }

    async fn read<T: DeserializeOwned>(&self, key: Key) -> Option<T> {
        let key = key.namespaced(&self.namespace);
        match self.kv.get(&key).await {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!("failed to parse {key}: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("failed to read {key}: {e}");
                None
            }
        }
    }
}
