//! The user's own calendar and optimistic status edits.
//!
//! Toggling a slot between busy and swappable applies locally first so the
//! UI never waits on the round trip. The server's answer then either
//! confirms the edit or rolls it back, and a rejected edit triggers a full
//! refetch so the local list snaps back to the authoritative schedule.

use std::sync::{Arc, RwLock};

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::{debug, warn};

use slotswap_api::{ApiClient, ApiError};
use slotswap_types::{CreateEventRequest, Event, EventStatus};

/// A calendar entry the user wants to create.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

#[derive(Debug, Error)]
pub enum CreateEventError {
    #[error("event title must not be empty")]
    EmptyTitle,
    #[error("event must end after it starts")]
    EndNotAfterStart,
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Error)]
pub enum StatusChangeError {
    #[error("no event {0} in the local schedule")]
    UnknownEvent(i64),
    #[error("slot is locked by a pending swap")]
    Locked,
    #[error("status {0} is assigned by the server, not the client")]
    ReservedStatus(EventStatus),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Local copy of the user's events, newest first.
#[derive(Clone)]
pub struct ScheduleStore {
    api: ApiClient,
    events: Arc<RwLock<Vec<Event>>>,
}

impl ScheduleStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            events: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Snapshot of the local schedule.
    pub fn events(&self) -> Vec<Event> {
        self.events.read().expect("schedule lock poisoned").clone()
    }

    /// Replaces the local schedule with the server's.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let mut fetched = self.api.events().await?;
        fetched.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        debug!("Schedule refreshed with {} events", fetched.len());
        *self.events.write().expect("schedule lock poisoned") = fetched;
        Ok(())
    }

    /// Creates an event and refetches the schedule so the new entry lands in
    /// its sorted position.
    pub async fn create_event(&self, event: NewEvent) -> Result<Event, CreateEventError> {
        let title = event.title.trim();
        if title.is_empty() {
            return Err(CreateEventError::EmptyTitle);
        }
        if event.end_time <= event.start_time {
            return Err(CreateEventError::EndNotAfterStart);
        }

        let created = self
            .api
            .create_event(&CreateEventRequest {
                title: title.to_string(),
                start_time: event.start_time,
                end_time: event.end_time,
            })
            .await?;
        debug!("Created event {} '{}'", created.id, created.title);

        if let Err(error) = self.refresh().await {
            warn!("Schedule refetch after create failed: {}", error);
        }
        Ok(created)
    }

    /// Toggles a slot's status, optimistically.
    ///
    /// The new status is visible in [`events`](Self::events) before the
    /// server answers. A rejected edit restores the slot and refetches.
    /// Slots locked by a pending swap refuse the edit locally, and
    /// [`EventStatus::SwapPending`] itself cannot be requested.
    pub async fn set_status(
        &self,
        event_id: i64,
        status: EventStatus,
    ) -> Result<(), StatusChangeError> {
        if status == EventStatus::SwapPending {
            return Err(StatusChangeError::ReservedStatus(status));
        }

        let previous = {
            let mut events = self.events.write().expect("schedule lock poisoned");
            let event = events
                .iter_mut()
                .find(|event| event.id == event_id)
                .ok_or(StatusChangeError::UnknownEvent(event_id))?;
            if event.status.is_locked() {
                return Err(StatusChangeError::Locked);
            }
            if event.status == status {
                return Ok(());
            }
            let previous = event.status;
            event.status = status;
            previous
        };

        match self.api.update_event_status(event_id, status).await {
            Ok(updated) => {
                debug!("Status change confirmed for event {}", updated.id);
                Ok(())
            }
            Err(error) => {
                warn!("Status change rejected for event {}: {}", event_id, error);
                self.roll_back(event_id, status, previous);
                if let Err(error) = self.refresh().await {
                    warn!("Schedule refetch after rollback failed: {}", error);
                }
                if error.is_conflict() {
                    Err(StatusChangeError::Locked)
                } else {
                    Err(StatusChangeError::Api(error))
                }
            }
        }
    }

    /// Restores `previous` on the slot, but only if it still carries the
    /// optimistic value. A refetch that landed in between already holds the
    /// server's truth and must not be overwritten.
    fn roll_back(&self, event_id: i64, optimistic: EventStatus, previous: EventStatus) {
        let mut events = self.events.write().expect("schedule lock poisoned");
        if let Some(event) = events.iter_mut().find(|event| event.id == event_id) {
            if event.status == optimistic {
                event.status = previous;
            }
        }
    }
}
