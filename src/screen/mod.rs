//! View models behind each private route. A screen opens its listeners on
//! `mount`, exposes projections of the central records, and releases every
//! listener on `unmount` or drop.

use crate::alert::Alerts;

pub mod chat_list;
pub mod conversation;
pub mod explore;
pub mod feed;
pub mod group_chat;
pub mod notifications;
pub mod profile;
pub mod settings;

pub use chat_list::ChatListScreen;
pub use conversation::ConversationScreen;
pub use explore::ExploreScreen;
pub use feed::FeedScreen;
pub use group_chat::GroupChatScreen;
pub use notifications::NotificationScreen;
pub use profile::ProfileScreen;
pub use settings::SettingsScreen;

/// Raises the alert for a failed action and passes the result through.
fn report<T>(alerts: &Alerts, res: crate::Result<T>) -> crate::Result<T> {
    if let Err(e) = &res {
        alerts.raise(e.alert());
    }
    res
}
