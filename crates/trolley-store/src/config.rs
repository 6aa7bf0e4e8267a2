//! Storage key layout configuration.

use serde::{Deserialize, Serialize};
use trolley_core::IdentityId;

/// Key layout for cart persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Namespace prefix for all cart keys.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Key segment for the offline cart slot.
    #[serde(default = "default_offline_key")]
    pub offline_key: String,
}

fn default_namespace() -> String {
    "cart".to_string()
}

fn default_offline_key() -> String {
    "offline".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            offline_key: default_offline_key(),
        }
    }
}

impl StoreConfig {
    /// Storage key for the offline cart.
    pub fn offline_storage_key(&self) -> String {
        format!("{}:{}", self.namespace, self.offline_key)
    }

    /// Storage key for an identity-scoped cart.
    pub fn identity_storage_key(&self, identity_id: &IdentityId) -> String {
        format!("{}:identity:{}", self.namespace, identity_id)
    }
}
