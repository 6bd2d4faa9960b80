//! Incoming and outgoing swap requests.
//!
//! Accepting or rejecting a request swaps slot ownership server-side and
//! flips other slots back to swappable, so the cheapest way to stay honest
//! is to refetch both lists after every response, successful or not.

use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use slotswap_api::{ApiClient, ApiError};
use slotswap_types::SwapRequestView;

/// Local copy of the user's swap requests.
#[derive(Clone)]
pub struct RequestsStore {
    api: ApiClient,
    incoming: Arc<RwLock<Vec<SwapRequestView>>>,
    outgoing: Arc<RwLock<Vec<SwapRequestView>>>,
}

impl RequestsStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            incoming: Arc::new(RwLock::new(Vec::new())),
            outgoing: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Requests other users sent to this user.
    pub fn incoming(&self) -> Vec<SwapRequestView> {
        self.incoming.read().expect("requests lock poisoned").clone()
    }

    /// Incoming requests still awaiting an answer.
    pub fn pending_incoming(&self) -> Vec<SwapRequestView> {
        self.incoming
            .read()
            .expect("requests lock poisoned")
            .iter()
            .filter(|request| request.status.is_pending())
            .cloned()
            .collect()
    }

    /// Requests this user sent to others.
    pub fn outgoing(&self) -> Vec<SwapRequestView> {
        self.outgoing.read().expect("requests lock poisoned").clone()
    }

    /// Refetches both lists. Neither is touched unless both fetches succeed.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let incoming = self.api.incoming_requests().await?;
        let outgoing = self.api.outgoing_requests().await?;
        debug!(
            "Requests refreshed, {} incoming {} outgoing",
            incoming.len(),
            outgoing.len()
        );
        *self.incoming.write().expect("requests lock poisoned") = incoming;
        *self.outgoing.write().expect("requests lock poisoned") = outgoing;
        Ok(())
    }

    /// Accepts or rejects an incoming request, then refetches both lists
    /// regardless of the outcome. Even a rejected response means the server
    /// state moved, or was never what the local lists claimed.
    pub async fn respond(
        &self,
        request_id: i64,
        accepted: bool,
    ) -> Result<SwapRequestView, ApiError> {
        let outcome = self.api.respond_to_swap(request_id, accepted).await;
        if let Err(error) = &outcome {
            warn!("Swap response for request {} failed: {}", request_id, error);
        }
        if let Err(error) = self.refresh().await {
            warn!("Requests refetch after response failed: {}", error);
        }
        outcome
    }
}
