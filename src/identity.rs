use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    guest::{GuestId, GuestIdentityProvider},
    models::Principal,
    storage::{CREDENTIAL_KEY, PRINCIPAL_KEY, SharedStorage},
};

/// Bearer token issued at login. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Who a remote cart call is made as. Exactly one mode per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Bearer(Credential),
    Guest(GuestId),
}

/// Resolves the request identity from durable storage and owns the
/// persisted session keys.
#[derive(Clone)]
pub struct IdentityResolver {
    storage: SharedStorage,
    guest: GuestIdentityProvider,
}

impl IdentityResolver {
    pub fn new(storage: SharedStorage) -> Self {
        let guest = GuestIdentityProvider::new(storage.clone());
        Self { storage, guest }
    }

    pub fn guest(&self) -> &GuestIdentityProvider {
        &self.guest
    }

    /// A stored credential takes precedence; otherwise the guest id is used,
    /// created on first use.
    pub fn resolve(&self) -> Identity {
        match self.credential() {
            Some(credential) => Identity::Bearer(credential),
            None => Identity::Guest(self.guest.get_or_create()),
        }
    }

    pub fn credential(&self) -> Option<Credential> {
        self.storage
            .get(CREDENTIAL_KEY)
            .filter(|token| !token.is_empty())
            .map(Credential)
    }

    pub fn persist_session(&self, credential: &Credential, principal: &Principal) {
        self.storage.set(CREDENTIAL_KEY, credential.expose());
        match serde_json::to_string(principal) {
            Ok(raw) => self.storage.set(PRINCIPAL_KEY, &raw),
            Err(err) => tracing::warn!(error = %err, "failed to cache principal"),
        }
    }

    pub fn forget_session(&self) {
        self.storage.remove(CREDENTIAL_KEY);
        self.storage.remove(PRINCIPAL_KEY);
    }

    /// Stored credential plus the cached principal, if it still parses.
    pub fn load_session(&self) -> Option<(Credential, Option<Principal>)> {
        let credential = self.credential()?;
        let principal = self.storage.get(PRINCIPAL_KEY).and_then(|raw| {
            serde_json::from_str(&raw)
                .inspect_err(|err| tracing::warn!(error = %err, "cached principal is unreadable"))
                .ok()
        });
        Some((credential, principal))
    }
}
