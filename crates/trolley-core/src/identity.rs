//! Authentication state observed by cart routing and reconciliation.

use crate::ids::IdentityId;
use serde::{Deserialize, Serialize};

/// Current identity of the session, or none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityState {
    /// No authenticated identity.
    Anonymous,
    /// Authenticated with the given identity id.
    Authenticated(IdentityId),
}

impl IdentityState {
    /// Check whether the state is anonymous.
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// Check whether the state carries an authenticated identity.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// The identity id, if authenticated.
    pub fn identity_id(&self) -> Option<&IdentityId> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(id) => Some(id),
        }
    }
}

impl Default for IdentityState {
    fn default() -> Self {
        Self::Anonymous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_state() {
        let state = IdentityState::Anonymous;
        assert!(state.is_anonymous());
        assert!(!state.is_authenticated());
        assert!(state.identity_id().is_none());
    }

    #[test]
    fn test_authenticated_state() {
        let state = IdentityState::Authenticated(IdentityId::new("user-1"));
        assert!(state.is_authenticated());
        assert_eq!(state.identity_id().unwrap().as_str(), "user-1");
    }
}
