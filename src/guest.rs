use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::{GUEST_ID_KEY, SharedStorage};

/// Opaque token identifying an anonymous cart owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestId(String);

impl GuestId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GuestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issues and persists the guest identifier for this storage profile.
#[derive(Clone)]
pub struct GuestIdentityProvider {
    storage: SharedStorage,
}

impl GuestIdentityProvider {
    pub fn new(storage: SharedStorage) -> Self {
        Self { storage }
    }

    /// Never overwrites an identifier that already exists.
    pub fn get_or_create(&self) -> GuestId {
        if let Some(existing) = self.current() {
            return existing;
        }
        let id = GuestId(Uuid::new_v4().to_string());
        self.storage.set(GUEST_ID_KEY, id.as_str());
        tracing::debug!(guest_id = %id, "issued guest identifier");
        id
    }

    pub fn current(&self) -> Option<GuestId> {
        self.storage
            .get(GUEST_ID_KEY)
            .filter(|value| !value.is_empty())
            .map(GuestId)
    }

    pub fn remove(&self) {
        self.storage.remove(GUEST_ID_KEY);
    }
}
