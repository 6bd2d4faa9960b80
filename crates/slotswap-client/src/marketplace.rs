//! Browsing other users' swappable slots and proposing swaps.
//!
//! Proposing is deliberately not optimistic. The listing stays put until the
//! server accepts the proposal, because another user may grab the slot
//! first. Success removes the listing locally; failure refetches, which
//! drops any listing that was taken or withdrawn in the meantime.

use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::{debug, warn};

use slotswap_api::{ApiClient, ApiError};
use slotswap_types::{CreateSwapRequest, Event, EventStatus, SwapRequestView};

#[derive(Debug, Error)]
pub enum ProposeError {
    #[error("slot is no longer available")]
    Taken,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Local copy of the marketplace listings.
#[derive(Clone)]
pub struct MarketplaceStore {
    api: ApiClient,
    slots: Arc<RwLock<Vec<Event>>>,
}

impl MarketplaceStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            slots: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Snapshot of the listings.
    pub fn slots(&self) -> Vec<Event> {
        self.slots.read().expect("marketplace lock poisoned").clone()
    }

    /// Replaces the listings with the server's current marketplace.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let fetched = self.api.swappable_slots().await?;
        debug!("Marketplace refreshed with {} listings", fetched.len());
        *self.slots.write().expect("marketplace lock poisoned") = fetched;
        Ok(())
    }

    /// The user's own slots that can be offered in a swap.
    pub async fn offerable_slots(&self) -> Result<Vec<Event>, ApiError> {
        let events = self.api.events().await?;
        Ok(events
            .into_iter()
            .filter(|event| event.status == EventStatus::Swappable)
            .collect())
    }

    /// Offers one of the user's slots for another user's listing.
    ///
    /// On success the listing disappears from [`slots`](Self::slots). On
    /// failure the listings are refetched, and a conflict reports the slot
    /// as [`ProposeError::Taken`].
    pub async fn propose_swap(
        &self,
        offered_slot_id: i64,
        desired_slot_id: i64,
    ) -> Result<SwapRequestView, ProposeError> {
        let request = CreateSwapRequest {
            my_slot_id: offered_slot_id,
            their_slot_id: desired_slot_id,
        };
        match self.api.create_swap_request(&request).await {
            Ok(view) => {
                debug!("Swap proposed for slot {}", desired_slot_id);
                self.slots
                    .write()
                    .expect("marketplace lock poisoned")
                    .retain(|slot| slot.id != desired_slot_id);
                Ok(view)
            }
            Err(error) => {
                warn!("Swap proposal for slot {} failed: {}", desired_slot_id, error);
                if let Err(error) = self.refresh().await {
                    warn!("Marketplace refetch after failed proposal failed: {}", error);
                }
                if error.is_conflict() {
                    Err(ProposeError::Taken)
                } else {
                    Err(ProposeError::Api(error))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn listing(id: i64) -> Event {
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        Event {
            id,
            title: format!("Slot {}", id),
            start_time: date.and_hms_opt(9, 0, 0).unwrap(),
            end_time: date.and_hms_opt(10, 0, 0).unwrap(),
            status: EventStatus::Swappable,
            user_id: 7,
        }
    }

    #[test]
    fn clones_share_the_listings() {
        let store = MarketplaceStore::new(ApiClient::new(
            "http://localhost:0",
            Arc::new(None::<String>),
        ));
        let other = store.clone();

        *store.slots.write().unwrap() = vec![listing(1), listing(2)];
        assert_eq!(other.slots().len(), 2);
        assert_eq!(other.slots()[1].id, 2);
    }
}
