//! Credential custody.
//!
//! The browser build keeps the login token in local storage under a single
//! well-known key. This is the same contract with the storage behind a trait,
//! so desktop and test builds can plug in their own.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use slotswap_api::CredentialProvider;

/// Storage key the credential lives under.
pub const CREDENTIAL_KEY: &str = "jwt_token";

/// Minimal key-value store holding the session credential.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, value: &str);
    fn remove(&self, key: &str);

    /// The stored login credential, if any.
    fn credential(&self) -> Option<String> {
        self.get(CREDENTIAL_KEY)
    }

    /// Called after login.
    fn store_credential(&self, token: &str) {
        self.put(CREDENTIAL_KEY, token);
    }

    /// Called on logout, or when the server stops accepting the credential.
    fn clear_credential(&self) {
        self.remove(CREDENTIAL_KEY);
    }
}

/// In-memory store for tests and short-lived tools.
#[derive(Default)]
pub struct MemoryCredentialStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .expect("credential lock poisoned")
            .get(key)
            .cloned()
    }

    fn put(&self, key: &str, value: &str) {
        self.values
            .write()
            .expect("credential lock poisoned")
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values
            .write()
            .expect("credential lock poisoned")
            .remove(key);
    }
}

/// Bridges a [`CredentialStore`] into the API client, which reads the token
/// fresh on every call.
pub struct SessionCredentials(pub Arc<dyn CredentialStore>);

impl CredentialProvider for SessionCredentials {
    fn credential(&self) -> Option<String> {
        self.0.credential()
    }
}
