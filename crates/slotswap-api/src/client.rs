//! HTTP client for the SlotSwapper REST API.

use std::sync::Arc;

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use tracing::debug;

use slotswap_types::{
    CreateEventRequest, CreateSwapRequest, Event, EventStatus, SwapRequestView,
    SwapResponseRequest, UpdateStatusRequest,
};

use crate::error::ApiError;

/// Source of the bearer credential attached to outgoing requests.
///
/// The credential is read at call time, so a login or logout takes effect
/// on the next request without rebuilding the client.
pub trait CredentialProvider: Send + Sync {
    fn credential(&self) -> Option<String>;
}

impl CredentialProvider for String {
    fn credential(&self) -> Option<String> {
        Some(self.clone())
    }
}

impl CredentialProvider for Option<String> {
    fn credential(&self) -> Option<String> {
        self.clone()
    }
}

/// Typed client for the SlotSwapper server.
///
/// Cloning is cheap and clones share the underlying connection pool.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, credentials: Arc<dyn CredentialProvider>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.credentials.credential() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("Server rejected request with {}: {}", status, body);
            return Err(ApiError::Status { status, body });
        }
        Ok(response.json().await?)
    }

    /// GET /api/events
    pub async fn events(&self) -> Result<Vec<Event>, ApiError> {
        self.execute(self.http.get(format!("{}/api/events", self.base_url)))
            .await
    }

    /// POST /api/events
    pub async fn create_event(&self, request: &CreateEventRequest) -> Result<Event, ApiError> {
        self.execute(
            self.http
                .post(format!("{}/api/events", self.base_url))
                .json(request),
        )
        .await
    }

    /// PUT /api/events/{id}/status
    pub async fn update_event_status(
        &self,
        event_id: i64,
        status: EventStatus,
    ) -> Result<Event, ApiError> {
        self.execute(
            self.http
                .put(format!("{}/api/events/{}/status", self.base_url, event_id))
                .json(&UpdateStatusRequest { status }),
        )
        .await
    }

    /// GET /api/swappable-slots
    pub async fn swappable_slots(&self) -> Result<Vec<Event>, ApiError> {
        self.execute(self.http.get(format!("{}/api/swappable-slots", self.base_url)))
            .await
    }

    /// POST /api/swap-request
    pub async fn create_swap_request(
        &self,
        request: &CreateSwapRequest,
    ) -> Result<SwapRequestView, ApiError> {
        self.execute(
            self.http
                .post(format!("{}/api/swap-request", self.base_url))
                .json(request),
        )
        .await
    }

    /// GET /api/swap-requests/incoming
    pub async fn incoming_requests(&self) -> Result<Vec<SwapRequestView>, ApiError> {
        self.execute(
            self.http
                .get(format!("{}/api/swap-requests/incoming", self.base_url)),
        )
        .await
    }

    /// GET /api/swap-requests/outgoing
    pub async fn outgoing_requests(&self) -> Result<Vec<SwapRequestView>, ApiError> {
        self.execute(
            self.http
                .get(format!("{}/api/swap-requests/outgoing", self.base_url)),
        )
        .await
    }

    /// POST /api/swap-response/{id}
    pub async fn respond_to_swap(
        &self,
        request_id: i64,
        accepted: bool,
    ) -> Result<SwapRequestView, ApiError> {
        self.execute(
            self.http
                .post(format!("{}/api/swap-response/{}", self.base_url, request_id))
                .json(&SwapResponseRequest { accepted }),
        )
        .await
    }
}
