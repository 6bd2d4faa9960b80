use std::fmt;
use tracing::debug;

/// Classified push notification.
///
/// The server publishes bare string bodies on the user notification queue.
/// Anything outside the known vocabulary maps to `Unknown` so that a newer
/// server never breaks an older client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// Another user proposed a swap for one of our slots.
    NewRequest,
    /// A swap we proposed was accepted.
    SwapAccepted,
    /// A swap we proposed was rejected.
    SwapRejected,
    /// Unrecognized body, counted but otherwise ignored.
    Unknown,
}

impl Notification {
    pub fn classify(body: &str) -> Self {
        match body {
            "NEW_REQUEST" => Notification::NewRequest,
            "SWAP_ACCEPTED" => Notification::SwapAccepted,
            "SWAP_REJECTED" => Notification::SwapRejected,
            other => {
                debug!("Unrecognized notification body: {}", other);
                Notification::Unknown
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Notification::NewRequest => "NEW_REQUEST",
            Notification::SwapAccepted => "SWAP_ACCEPTED",
            Notification::SwapRejected => "SWAP_REJECTED",
            Notification::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
