//! Short-lived user notifications.
//!
//! Every notification gets its own expiry timer; the app schedules
//! [`crate::Event::NotificationExpired`] with the id returned by [`NotificationBus::push`].

use serde::{Deserialize, Serialize};

use crate::{UnixTimeMs, MAX_ACTIVE_NOTIFICATIONS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    Success,
    Error,
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub message: String,
    pub created_at: UnixTimeMs,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationBus {
    next_id: u64,
    active: Vec<Notification>,
}

impl NotificationBus {
    pub fn push(&mut self, kind: NotificationKind, message: impl Into<String>, now: UnixTimeMs) -> NotificationId {
        self.next_id += 1;
        let id = NotificationId(self.next_id);
        self.active.push(Notification {
            id,
            kind,
            message: message.into(),
            created_at: now,
        });
        if self.active.len() > MAX_ACTIVE_NOTIFICATIONS {
            let overflow = self.active.len() - MAX_ACTIVE_NOTIFICATIONS;
            self.active.drain(..overflow);
        }
        id
    }

    /// Removes the notification if it is still shown.
    pub fn expire(&mut self, id: NotificationId) -> bool {
        let before = self.active.len();
        self.active.retain(|n| n.id != id);
        self.active.len() != before
    }

    pub fn dismiss(&mut self, id: NotificationId) -> bool {
        self.expire(id)
    }

    #[must_use]
    pub fn active(&self) -> &[Notification] {
        &self.active
    }

    #[must_use]
    pub fn latest(&self) -> Option<&Notification> {
        self.active.last()
    }
}
