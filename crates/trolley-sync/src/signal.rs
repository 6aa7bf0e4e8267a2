//! The identity signal consumed by store routing and reconciliation.

use tokio::sync::watch;
use trolley_core::{IdentityId, IdentityState};

/// Publisher handle for the session's identity state.
///
/// The authentication layer drives this; the cart engine only
/// observes it. Every subscription replays the current state before
/// any transition, so a subscriber always has a value to act on.
pub struct IdentitySignal {
    tx: watch::Sender<IdentityState>,
}

impl IdentitySignal {
    /// Create a signal with the given initial state.
    pub fn new(initial: IdentityState) -> Self {
        Self {
            tx: watch::Sender::new(initial),
        }
    }

    /// Create a signal starting anonymous.
    pub fn anonymous() -> Self {
        Self::new(IdentityState::Anonymous)
    }

    /// The current identity state.
    pub fn current(&self) -> IdentityState {
        self.tx.borrow().clone()
    }

    /// Publish a new identity state.
    pub fn set(&self, state: IdentityState) {
        self.tx.send_replace(state);
    }

    /// Publish an authenticated state.
    pub fn sign_in(&self, identity_id: impl Into<IdentityId>) {
        self.set(IdentityState::Authenticated(identity_id.into()));
    }

    /// Publish an anonymous state.
    pub fn sign_out(&self) {
        self.set(IdentityState::Anonymous);
    }

    /// Subscribe to identity state changes.
    pub fn subscribe(&self) -> watch::Receiver<IdentityState> {
        self.tx.subscribe()
    }
}

impl Default for IdentitySignal {
    fn default() -> Self {
        Self::anonymous()
    }
}
