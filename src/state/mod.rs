// State management module
//
// Provides the StateManager which wraps RuntimeState with thread-safe access
// using Arc<RwLock<T>> and emits change events for whatever shell is attached.

use crate::models::{InstalledState, Variant};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Change events emitted when the runtime state is modified
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// The target file was (re)classified and the result differs from before
    StateClassified { state: InstalledState },

    /// A swap completed
    VariantSwapped { from: Variant, to: Variant },

    /// The target changed behind our back
    DriftDetected {
        expected: InstalledState,
        observed: InstalledState,
    },

    /// The target was missing at startup and the SteamVR build was installed
    Bootstrapped,
}

/// Derived runtime state, never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeState {
    /// Which variant is believed to be installed
    pub installed: InstalledState,

    /// Digest of the target as last observed, `None` when it was missing or never hashed
    pub last_digest: Option<String>,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            installed: InstalledState::Unknown,
            last_digest: None,
        }
    }
}

/// Thread-safe holder of [`RuntimeState`] with event emission
///
/// Owned by [`VariantManager`](crate::services::VariantManager). A UI shell
/// reads through the manager and listens via [`subscribe()`](Self::subscribe);
/// it holds no state of its own.
pub struct StateManager {
    state: Arc<RwLock<RuntimeState>>,

    /// Multiple subscribers can listen for state changes
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    /// Create a new StateManager with a broadcast buffer of 100 events
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(RuntimeState::default())),
            state_tx,
        }
    }

    pub fn snapshot(&self) -> RuntimeState {
        self.state.read().unwrap().clone()
    }

    pub fn installed(&self) -> InstalledState {
        self.state.read().unwrap().installed
    }

    /// Replace the observed state, emitting `StateClassified` if it changed
    pub fn observe(&self, installed: InstalledState, digest: Option<String>) -> Vec<StateChange> {
        let mut state = self.state.write().unwrap();
        let changed = state.installed != installed;

        state.installed = installed;
        state.last_digest = digest;

        let mut changes = Vec::new();
        if changed {
            changes.push(StateChange::StateClassified { state: installed });
        }
        drop(state);

        self.emit(&changes);
        changes
    }

    /// Emit an arbitrary event (drift, swap, bootstrap)
    pub fn notify(&self, change: StateChange) {
        self.emit(std::slice::from_ref(&change));
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn emit(&self, changes: &[StateChange]) {
        for change in changes {
            // Ignore send errors - it's OK if no one is listening
            let _ = self.state_tx.send(change.clone());
        }
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_unknown() {
        let state = StateManager::new();
        assert_eq!(state.installed(), InstalledState::Unknown);
        assert_eq!(state.snapshot().last_digest, None);
    }

    #[test]
    fn test_observe_emits_only_on_change() {
        let state = StateManager::new();
        let steamvr = InstalledState::Installed(Variant::SteamVr);

        let changes = state.observe(steamvr, Some("aa".to_string()));
        assert_eq!(changes, vec![StateChange::StateClassified { state: steamvr }]);

        let changes = state.observe(steamvr, Some("aa".to_string()));
        assert!(changes.is_empty());
        assert_eq!(state.snapshot().last_digest.as_deref(), Some("aa"));
    }

    #[test]
    fn test_subscriber_receives_notifications() {
        let state = StateManager::new();
        let mut rx = state.subscribe();

        state.notify(StateChange::Bootstrapped);
        assert_eq!(rx.try_recv().unwrap(), StateChange::Bootstrapped);
    }
}
