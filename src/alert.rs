use log::debug;
use tokio::sync::broadcast;

const CAPACITY: usize = 64;

/// A one-shot, user-visible modal message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new("Error", message)
    }
}

/// Fan-out of alerts to whatever presentation layer is listening.
#[derive(Clone)]
pub struct Alerts {
    tx: broadcast::Sender<Alert>,
}

impl Default for Alerts {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(CAPACITY);
        Self { tx }
    }
}

impl Alerts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self, alert: Alert) {
        if self.tx.send(alert).is_err() {
            debug!("alert dropped, nobody is listening");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Alert> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn should_deliver_to_subscribers() {
        let alerts = Alerts::new();
        let mut rx = alerts.subscribe();

        alerts.raise(Alert::error("Failed to load chats"));

        assert_eq!(rx.recv().await.unwrap(), Alert::error("Failed to load chats"));
    }

    #[test]
    fn should_drop_without_subscribers() {
        Alerts::new().raise(Alert::new("Notice", "nobody hears this"));
    }
}
