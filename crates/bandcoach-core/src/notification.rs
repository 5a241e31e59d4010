//! Transient achievement notifications.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default time a notification stays visible.
pub const DEFAULT_TTL: Duration = Duration::from_millis(4000);

/// A fire-and-expire notification. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    /// e.g. "+0.1 Band".
    pub title: String,
    /// e.g. "Match Headings Cleared".
    pub subtitle: String,
    pub ttl: Duration,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        title: impl Into<String>,
        subtitle: impl Into<String>,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            subtitle: subtitle.into(),
            ttl,
            created_at: now,
        }
    }
}

/// Holds the notifications that have not yet expired.
///
/// Expiry is driven from outside: the session schedules an
/// [`expire`](NotificationEmitter::expire) call after each notification's TTL.
#[derive(Debug, Default)]
pub struct NotificationEmitter {
    ttl: Duration,
    active: Vec<Notification>,
}

impl NotificationEmitter {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            active: Vec::new(),
        }
    }

    pub fn emit(
        &mut self,
        title: impl Into<String>,
        subtitle: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Notification {
        let notification = Notification::new(title, subtitle, self.ttl, now);
        tracing::info!(
            title = %notification.title,
            subtitle = %notification.subtitle,
            "notification emitted"
        );
        self.active.push(notification.clone());
        notification
    }

    /// Drop the notification with `id`. Returns whether it was still active.
    pub fn expire(&mut self, id: Uuid) -> bool {
        let before = self.active.len();
        self.active.retain(|n| n.id != id);
        self.active.len() != before
    }

    pub fn active(&self) -> &[Notification] {
        &self.active
    }
}
