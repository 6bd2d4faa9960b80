use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a calendar slot.
///
/// `SwapPending` is only ever set by the server while a swap request is in
/// flight for the slot; clients never assign it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Busy,
    Swappable,
    SwapPending,
}

impl EventStatus {
    /// A locked slot is held by an unresolved swap and cannot be edited.
    pub fn is_locked(self) -> bool {
        matches!(self, EventStatus::SwapPending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Busy => "BUSY",
            EventStatus::Swappable => "SWAPPABLE",
            EventStatus::SwapPending => "SWAP_PENDING",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A calendar slot as the server reports it.
///
/// Timestamps are wall-clock local times without a zone, matching the
/// server's representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub status: EventStatus,
    pub user_id: i64,
}

/// Resolution state of a swap request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwapStatus {
    Pending,
    Accepted,
    Rejected,
}

impl SwapStatus {
    pub fn is_pending(self) -> bool {
        matches!(self, SwapStatus::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SwapStatus::Pending => "PENDING",
            SwapStatus::Accepted => "ACCEPTED",
            SwapStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A swap request as presented to either party.
///
/// The server flattens both slots into display fields, so the same shape
/// serves the incoming and outgoing lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequestView {
    pub id: i64,
    pub status: SwapStatus,
    pub requester_id: i64,
    pub requester_name: String,
    pub desired_slot_title: String,
    pub offered_slot_title: String,
    pub offered_slot_start_time: NaiveDateTime,
}
