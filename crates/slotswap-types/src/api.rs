use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::EventStatus;

// -- Events --

/// Body for `POST /api/events`. The server assigns ownership and an
/// initial `BUSY` status; neither is part of the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

/// Body for `PUT /api/events/{id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: EventStatus,
}

// -- Swaps --

/// Body for `POST /api/swap-request`: offer `my_slot_id` in exchange for
/// `their_slot_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSwapRequest {
    pub my_slot_id: i64,
    pub their_slot_id: i64,
}

/// Body for `POST /api/swap-response/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapResponseRequest {
    pub accepted: bool,
}
