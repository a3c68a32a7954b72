//! Session and role change notifications.
//!
//! The hub is created once in `main` and handed to every handler through
//! [`crate::state::AppState`]. Subscribers that fall behind lose the oldest
//! events.

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::status::Role;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    RoleChanged { user_id: Uuid, role: Role },
    Removed { user_id: Uuid },
}

#[derive(Debug, Clone)]
pub struct SessionHub {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Returns how many subscribers received the event. Zero is not an error.
    pub fn publish(&self, event: SessionEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => 0,
        }
    }
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let hub = SessionHub::new();
        let mut rx = hub.subscribe();
        let user_id = Uuid::new_v4();

        assert_eq!(hub.publish(SessionEvent::Removed { user_id }), 1);
        assert_eq!(rx.recv().await.ok(), Some(SessionEvent::Removed { user_id }));
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let hub = SessionHub::new();
        let sent = hub.publish(SessionEvent::RoleChanged {
            user_id: Uuid::new_v4(),
            role: Role::Admin,
        });
        assert_eq!(sent, 0);
    }
}
