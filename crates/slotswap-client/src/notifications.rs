//! Unread-notification badge state.
//!
//! Every push notification bumps an unread counter and a generation number.
//! The generation only ever grows, so views that refetch on "something
//! happened" can key off it without caring which kind of notification
//! arrived. Acknowledging clears the badge but leaves the generation alone.

use tokio::sync::watch;
use tracing::debug;

/// Snapshot of the badge.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NotificationState {
    /// Notifications seen since the last acknowledgement.
    pub unread: u64,
    /// Total notifications seen over the life of the hub. Monotonic.
    pub generation: u64,
}

/// Shared badge. Cloning hands out another handle to the same state.
#[derive(Clone)]
pub struct NotificationHub {
    state: watch::Sender<NotificationState>,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationHub {
    pub fn new() -> Self {
        let (state, _) = watch::channel(NotificationState::default());
        Self { state }
    }

    /// Records one inbound notification. Watchers observe the unread count
    /// and generation move together.
    pub fn record_inbound(&self) {
        self.state.send_modify(|state| {
            state.unread += 1;
            state.generation += 1;
        });
        let state = *self.state.borrow();
        debug!(
            "Notification recorded, unread {} generation {}",
            state.unread, state.generation
        );
    }

    /// Clears the unread count. A no-op when nothing is unread, and watchers
    /// are not woken in that case.
    pub fn acknowledge_all(&self) {
        self.state.send_if_modified(|state| {
            if state.unread == 0 {
                return false;
            }
            state.unread = 0;
            true
        });
    }

    pub fn current(&self) -> NotificationState {
        *self.state.borrow()
    }

    /// Watch for badge changes.
    pub fn watch(&self) -> watch::Receiver<NotificationState> {
        self.state.subscribe()
    }
}
