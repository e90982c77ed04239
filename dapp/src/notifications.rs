//! Short-lived user-facing status messages.
//!
//! At most one notification is visible. Each `notify` bumps a generation
//! counter and hands back an [`ExpiryTicket`]; an expiry only clears the
//! notification its ticket was issued for, so a timer started for an older
//! message can never remove a newer one.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

pub const DEFAULT_NOTIFICATION_LIFETIME: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
}

/// Identity of one `notify` call plus the delay after which to expire it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryTicket {
    generation: u64,
    delay: Duration,
}

impl ExpiryTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Delay in whole milliseconds, saturating, for browser timers.
    pub fn delay_millis(&self) -> u32 {
        u32::try_from(self.delay.as_millis()).unwrap_or(u32::MAX)
    }
}

/// Host hook that arranges for `sink.expire(ticket)` to run after
/// `ticket.delay()`.
pub type ExpiryScheduler = Arc<dyn Fn(NotificationSink, ExpiryTicket)>;

#[derive(Debug, Default)]
struct SinkState {
    current: Option<Notification>,
    generation: u64,
}

#[derive(Clone)]
pub struct NotificationSink {
    state: Arc<RwLock<SinkState>>,
    lifetime: Duration,
    scheduler: Option<ExpiryScheduler>,
}

impl fmt::Debug for NotificationSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationSink")
            .field("state", &self.state)
            .field("lifetime", &self.lifetime)
            .field("scheduled", &self.scheduler.is_some())
            .finish()
    }
}

impl NotificationSink {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            state: Arc::new(RwLock::new(SinkState::default())),
            lifetime,
            scheduler: None,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_NOTIFICATION_LIFETIME)
    }

    pub fn with_scheduler(mut self, scheduler: ExpiryScheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Replace whatever is showing and start a fresh expiry.
    pub fn notify(&self, message: impl Into<String>, kind: NotificationKind) -> ExpiryTicket {
        self.notify_at(message, kind, Utc::now())
    }

    pub fn notify_at(
        &self,
        message: impl Into<String>,
        kind: NotificationKind,
        now: DateTime<Utc>,
    ) -> ExpiryTicket {
        let ticket = {
            let mut state = self.state.write();
            state.generation += 1;
            state.current = Some(Notification {
                message: message.into(),
                kind,
                created_at: now,
            });
            ExpiryTicket {
                generation: state.generation,
                delay: self.lifetime,
            }
        };

        if let Some(scheduler) = &self.scheduler {
            scheduler(self.clone(), ticket);
        }
        ticket
    }

    /// Timer callback. Clears the notification only if `ticket` still names
    /// the current one.
    pub fn expire(&self, ticket: ExpiryTicket) -> bool {
        let mut state = self.state.write();
        if state.generation != ticket.generation || state.current.is_none() {
            return false;
        }
        state.current = None;
        true
    }

    /// For polling hosts: clear the current notification once its lifetime
    /// has elapsed at `now`.
    pub fn expire_due(&self, now: DateTime<Utc>) -> bool {
        let mut state = self.state.write();
        let due = match &state.current {
            Some(current) => matches!(
                now.signed_duration_since(current.created_at).to_std(),
                Ok(elapsed) if elapsed >= self.lifetime
            ),
            None => false,
        };
        if due {
            state.current = None;
        }
        due
    }

    /// Remove any visible notification and invalidate outstanding tickets.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.generation += 1;
        state.current = None;
    }

    pub fn current(&self) -> Option<Notification> {
        self.state.read().current.clone()
    }
}

impl Default for NotificationSink {
    fn default() -> Self {
        Self::with_defaults()
    }
}
