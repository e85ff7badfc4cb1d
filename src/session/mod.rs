//! Session storage: which participant is in which flow.
//!
//! The engine only ever sees a [`Session`]; where it lives is behind
//! [`SessionStore`] so the in-process map can be swapped for an
//! external cache or a persistent store without touching the engine.
//! The default backend is a `DashMap`, which serializes access per key.

use dashmap::DashMap;

use crate::core::config;
use crate::flow::Session;

/// Keyed session storage. One session per participant at most.
pub trait SessionStore: Send + Sync {
    /// Returns a copy of the participant's active session, if any.
    fn get(&self, participant: i64) -> Option<Session>;

    /// Stores (or replaces) the participant's session.
    fn put(&self, participant: i64, session: Session);

    /// Removes and returns the participant's session, if any.
    fn remove(&self, participant: i64) -> Option<Session>;
}

/// In-process session store. Does not survive restarts; participants
/// mid-flow after a restart simply get no reply to their next answer
/// and restart the flow.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<i64, Session>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, participant: i64) -> Option<Session> {
        self.sessions.get(&participant).map(|entry| entry.clone())
    }

    fn put(&self, participant: i64, session: Session) {
        self.sessions.insert(participant, session);
    }

    fn remove(&self, participant: i64) -> Option<Session> {
        self.sessions.remove(&participant).map(|(_, session)| session)
    }
}

/// What a flow entry point does when the participant already has an
/// active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Silently discard the old session and start the new flow.
    Replace,
    /// Refuse the new flow until the participant sends /cancel.
    RequireCancel,
}

impl ConflictPolicy {
    /// Parses a SESSION_CONFLICT_POLICY value; unknown values fall
    /// back to Replace with a warning.
    pub fn parse(value: &str) -> Self {
        match value {
            "require-cancel" => ConflictPolicy::RequireCancel,
            "replace" => ConflictPolicy::Replace,
            other => {
                log::warn!("Unknown SESSION_CONFLICT_POLICY '{}', using 'replace'", other);
                ConflictPolicy::Replace
            }
        }
    }

    pub fn from_env() -> Self {
        Self::parse(config::session::CONFLICT_POLICY.as_str())
    }

    /// Whether a flow entry point may proceed given that the participant
    /// does (or does not) already have an active session.
    pub fn allows_new_flow(&self, has_active_session: bool) -> bool {
        match self {
            ConflictPolicy::Replace => true,
            ConflictPolicy::RequireCancel => !has_active_session,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{Draft, FlowState};

    #[test]
    fn test_put_get_remove_round_trip() {
        let store = InMemorySessionStore::new();
        assert!(store.get(1).is_none());

        store.put(1, Session::new_project());
        let session = store.get(1).unwrap();
        assert_eq!(session.state, FlowState::AwaitingName);
        assert!(matches!(session.draft, Draft::Project(_)));

        let removed = store.remove(1).unwrap();
        assert_eq!(removed.state, FlowState::AwaitingName);
        assert!(store.get(1).is_none());
        assert!(store.remove(1).is_none());
    }

    #[test]
    fn test_sessions_are_per_participant() {
        let store = InMemorySessionStore::new();
        store.put(1, Session::new_project());
        store.put(2, Session::search());

        assert!(matches!(store.get(1).unwrap().draft, Draft::Project(_)));
        assert!(matches!(store.get(2).unwrap().draft, Draft::Search(_)));

        store.remove(1);
        assert!(store.get(2).is_some());
    }

    #[test]
    fn test_put_replaces_existing_session() {
        let store = InMemorySessionStore::new();
        store.put(1, Session::new_project());
        store.put(1, Session::update_choosing());

        assert_eq!(store.get(1).unwrap().state, FlowState::ChoosingProject);
    }

    #[test]
    fn test_conflict_policy_parse() {
        assert_eq!(ConflictPolicy::parse("replace"), ConflictPolicy::Replace);
        assert_eq!(ConflictPolicy::parse("require-cancel"), ConflictPolicy::RequireCancel);
        assert_eq!(ConflictPolicy::parse("nonsense"), ConflictPolicy::Replace);
        assert_eq!(ConflictPolicy::parse(""), ConflictPolicy::Replace);
    }

    #[test]
    fn test_require_cancel_blocks_entry_until_cancelled() {
        let store = InMemorySessionStore::new();
        store.put(1, Session::new_project());

        assert!(!ConflictPolicy::RequireCancel.allows_new_flow(store.get(1).is_some()));
        assert!(ConflictPolicy::RequireCancel.allows_new_flow(store.get(2).is_some()));

        store.remove(1);
        assert!(ConflictPolicy::RequireCancel.allows_new_flow(store.get(1).is_some()));
    }

    #[test]
    fn test_replace_policy_overwrites_active_session() {
        let store = InMemorySessionStore::new();
        store.put(1, Session::new_project());

        assert!(ConflictPolicy::Replace.allows_new_flow(store.get(1).is_some()));
        store.put(1, Session::search());
        assert!(matches!(store.get(1).unwrap().draft, Draft::Search(_)));
    }
}
