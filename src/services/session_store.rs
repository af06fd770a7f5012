use crate::models::SessionState;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw).ok().map(Self)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug)]
struct Entry {
    state: SessionState,
    last_seen: Instant,
}

/// Server-side session slots with an idle TTL. Sessions never share state.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<SessionId, Entry>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Current state of `id`; expired and unknown sessions read as empty.
    /// Reading refreshes the idle timer.
    pub fn load(&self, id: SessionId) -> SessionState {
        let now = Instant::now();
        if let Some(mut entry) = self.sessions.get_mut(&id) {
            if now.duration_since(entry.last_seen) <= self.ttl {
                entry.last_seen = now;
                return entry.state.clone();
            }
        }
        // Expired entries are dropped lazily here as well as by the sweeper
        self.sessions
            .remove_if(&id, |_, e| now.duration_since(e.last_seen) > self.ttl);
        SessionState::Empty
    }

    /// Mints a new session id and registers an empty slot for it. Only ids
    /// minted here are ever honoured.
    pub fn open(&self) -> SessionId {
        let id = SessionId::new();
        self.store(id, SessionState::Empty);
        id
    }

    /// Whether `id` belongs to a live session of this store.
    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions
            .get(&id)
            .is_some_and(|e| Instant::now().duration_since(e.last_seen) <= self.ttl)
    }

    /// Replaces the slot for `id`.
    pub fn store(&self, id: SessionId, state: SessionState) {
        self.sessions.insert(
            id,
            Entry {
                state,
                last_seen: Instant::now(),
            },
        );
    }

    /// Drops every session idle for longer than the TTL and returns how many went.
    pub fn evict_expired(&self) -> usize {
        let before = self.sessions.len();
        let ttl = self.ttl;
        let now = Instant::now();
        self.sessions
            .retain(|_, entry| now.duration_since(entry.last_seen) <= ttl);
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalyzedFile, MetadataReport};
    use std::path::PathBuf;

    fn analyzed(name: &str) -> SessionState {
        SessionState::Analyzed(AnalyzedFile {
            filename: name.to_string(),
            filepath: PathBuf::from(format!("uploads/{}", name)),
            metadata: MetadataReport::from_tool_output("Make : Canon", format!("uploads/{}", name)),
        })
    }

    #[test]
    fn test_unknown_session_is_empty() {
        let store = SessionStore::new(Duration::from_secs(60));
        assert_eq!(store.load(SessionId::new()), SessionState::Empty);
    }

    #[test]
    fn test_only_minted_ids_are_known() {
        let store = SessionStore::new(Duration::from_secs(60));
        let minted = store.open();

        assert!(store.contains(minted));
        assert_eq!(store.load(minted), SessionState::Empty);
        assert!(!store.contains(SessionId::new()));
    }

    #[test]
    fn test_expired_session_is_unknown() {
        let store = SessionStore::new(Duration::from_millis(0));
        let id = store.open();
        std::thread::sleep(Duration::from_millis(5));
        assert!(!store.contains(id));
    }

    #[test]
    fn test_store_overwrites_single_slot() {
        let store = SessionStore::new(Duration::from_secs(60));
        let id = SessionId::new();

        store.store(id, analyzed("a.jpg"));
        store.store(id, analyzed("b.jpg"));

        assert_eq!(store.len(), 1);
        assert_eq!(store.load(id).analyzed().unwrap().filename, "b.jpg");
    }

    #[test]
    fn test_sessions_are_independent() {
        let store = SessionStore::new(Duration::from_secs(60));
        let (a, b) = (SessionId::new(), SessionId::new());

        store.store(a, analyzed("a.jpg"));
        assert_eq!(store.load(b), SessionState::Empty);
        assert_eq!(store.load(a).analyzed().unwrap().filename, "a.jpg");
    }

    #[test]
    fn test_expired_sessions_are_evicted() {
        let store = SessionStore::new(Duration::from_millis(20));
        let id = SessionId::new();
        store.store(id, analyzed("a.jpg"));

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(store.evict_expired(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_expired_session_reads_empty() {
        let store = SessionStore::new(Duration::from_millis(20));
        let id = SessionId::new();
        store.store(id, analyzed("a.jpg"));

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(store.load(id), SessionState::Empty);
        assert!(store.is_empty());
    }

    #[test]
    fn test_session_id_parse() {
        let id = SessionId::new();
        assert_eq!(SessionId::parse(&id.to_string()), Some(id));
        assert_eq!(SessionId::parse("not-a-uuid"), None);
    }
}
