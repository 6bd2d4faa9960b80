//! Shared types for the SlotSwap client: calendar models, REST payloads
//! and push-notification classification.

pub mod api;
pub mod models;
pub mod notify;

pub use api::{CreateEventRequest, CreateSwapRequest, SwapResponseRequest, UpdateStatusRequest};
pub use models::{Event, EventStatus, SwapRequestView, SwapStatus};
pub use notify::Notification;
