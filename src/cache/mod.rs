use std::fmt::Display;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::store::Fields;

pub mod client;
pub mod service;

pub use service::LocalCache;

type Result<T> = std::result::Result<T, Error>;
pub type Kv = Arc<dyn client::KeyValueStore + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    UserProfile,
    UserSettings,
    UserPreferences,
    UserStats,
}

impl Key {
    pub const ALL: [Key; 4] = [
        Key::UserProfile,
        Key::UserSettings,
        Key::UserPreferences,
        Key::UserStats,
    ];

    /// `@focushub` + `UserProfile` -> `@focushub_user_profile`
    pub fn namespaced(&self, namespace: &str) -> String {
        format!("{namespace}_{self}")
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::UserProfile => write!(f, "user_profile"),
            Key::UserSettings => write!(f, "user_settings"),
            Key::UserPreferences => write!(f, "user_preferences"),
            Key::UserStats => write!(f, "user_stats"),
        }
    }
}

/// Wrapper for entries that expire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Timed<T> {
    pub data: T,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub dark_mode: bool,
    #[serde(flatten)]
    pub extra: Fields,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    _Redis(#[from] redis::RedisError),
    #[error(transparent)]
    _ParseJson(#[from] serde_json::Error),
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn should_namespace_keys() {
        let keys = Key::ALL
            .iter()
            .map(|k| k.namespaced("@focushub"))
            .collect::<Vec<_>>();

        assert_eq!(
            keys,
            vec![
                "@focushub_user_profile",
                "@focushub_user_settings",
                "@focushub_user_preferences",
                "@focushub_user_stats",
            ]
        );
    }

    #[test]
    fn should_keep_unknown_settings() {
        let settings: Settings =
            serde_json::from_value(json!({ "darkMode": true, "language": "ro" })).unwrap();

        assert!(settings.dark_mode);
        assert_eq!(settings.extra["language"], json!("ro"));
        assert_eq!(
            serde_json::to_value(&settings).unwrap(),
            json!({ "darkMode": true, "language": "ro" })
        );
    }
}
