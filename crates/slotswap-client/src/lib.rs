//! Client-side core for SlotSwapper.
//!
//! Wires the REST client, the push channel, and the local stores into one
//! handle per logged-in user. The stores keep local copies of server state
//! and reconcile them on every mutation: schedule edits apply optimistically
//! and roll back on rejection, marketplace proposals touch the listings only
//! on success, and swap responses refetch unconditionally.

pub mod config;
pub mod marketplace;
pub mod notifications;
pub mod requests;
pub mod schedule;
pub mod session;

pub use config::{ClientConfig, ConfigError};
pub use marketplace::{MarketplaceStore, ProposeError};
pub use notifications::{NotificationHub, NotificationState};
pub use requests::RequestsStore;
pub use schedule::{CreateEventError, NewEvent, ScheduleStore, StatusChangeError};
pub use session::{CREDENTIAL_KEY, CredentialStore, MemoryCredentialStore, SessionCredentials};

pub use slotswap_api::{ApiClient, ApiError};
pub use slotswap_push::{ChannelConfig, ChannelState, PushChannel};
pub use slotswap_types as types;
pub use slotswap_types::{Event, EventStatus, Notification, SwapRequestView, SwapStatus};

use std::sync::Arc;

/// One logged-in user's view of SlotSwapper.
///
/// All stores share the same [`ApiClient`], which reads the credential from
/// the [`CredentialStore`] on every request.
pub struct SlotSwap {
    config: ClientConfig,
    credentials: Arc<dyn CredentialStore>,
    pub api: ApiClient,
    pub notifications: NotificationHub,
    pub schedule: ScheduleStore,
    pub marketplace: MarketplaceStore,
    pub requests: RequestsStore,
}

impl SlotSwap {
    pub fn new(config: ClientConfig, credentials: Arc<dyn CredentialStore>) -> Self {
        let api = ApiClient::new(
            config.api_base.as_str(),
            Arc::new(SessionCredentials(credentials.clone())),
        );
        Self {
            schedule: ScheduleStore::new(api.clone()),
            marketplace: MarketplaceStore::new(api.clone()),
            requests: RequestsStore::new(api.clone()),
            notifications: NotificationHub::new(),
            api,
            config,
            credentials,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    /// Opens the push channel. Inbound notifications feed
    /// [`notifications`](Self::notifications).
    ///
    /// The channel binds the credential held at this moment; after a login
    /// or logout, shut it down and open a new one.
    pub fn connect_push(&self) -> Result<PushChannel, ConfigError> {
        self.connect_push_with(|_| {})
    }

    /// Like [`connect_push`](Self::connect_push), with a hook invoked for
    /// each notification after the badge is bumped.
    pub fn connect_push_with<F>(&self, mut on_notification: F) -> Result<PushChannel, ConfigError>
    where
        F: FnMut(Notification) + Send + 'static,
    {
        let endpoint = self.config.ws_endpoint()?;
        let credential = self.credentials.credential();
        let hub = self.notifications.clone();
        Ok(PushChannel::open(
            ChannelConfig::new(endpoint),
            credential,
            move |notification| {
                hub.record_inbound();
                on_notification(notification);
            },
        ))
    }
}
