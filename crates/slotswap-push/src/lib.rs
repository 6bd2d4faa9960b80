//! Push notification channel for the SlotSwap client.
//!
//! The server publishes per-user notifications over a STOMP subscription
//! carried on a single WebSocket. This crate derives the subscriber identity
//! from the stored credential, speaks just enough STOMP 1.2 to hold that one
//! subscription, and keeps the connection alive with fixed-delay reconnects.

pub mod channel;
pub mod identity;
pub mod stomp;

pub use channel::{
    ChannelConfig, ChannelError, ChannelState, NOTIFICATIONS_DESTINATION, PushChannel,
    RECONNECT_DELAY,
};
pub use identity::subject_of;
