use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

pub type SessionId = Uuid;

struct Entry<S> {
    session: Arc<Mutex<S>>,
    last_seen: Instant,
}

/// In-memory store of per-visitor sessions.
///
/// Each session sits behind its own async mutex so one visitor's actions run
/// one at a time while other visitors are unaffected. When the store is
/// full, sessions matched by the retention rule (and sessions currently in
/// use) are evicted only if nothing else can go.
pub struct SessionCache<S> {
    entries: RwLock<HashMap<SessionId, Entry<S>>>,
    max_sessions: usize,
    idle_timeout: Duration,
    retain: Option<fn(&S) -> bool>,
}

impl<S> SessionCache<S> {
    pub fn new(max_sessions: usize, idle_timeout: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
            idle_timeout,
            retain: None,
        }
    }

    /// Marks sessions for which `retain` holds as the last to be evicted.
    pub fn with_retention(mut self, retain: fn(&S) -> bool) -> Self {
        self.retain = Some(retain);
        self
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<Mutex<S>>> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get_mut(id)?;
        entry.last_seen = Instant::now();
        Some(Arc::clone(&entry.session))
    }

    /// Stores a fresh session under a new id.
    pub fn insert(&self, session: S) -> (SessionId, Arc<Mutex<S>>) {
        let id = Uuid::new_v4();
        let session = self.put(id, session);
        debug!("Created session {}", id);
        (id, session)
    }

    /// Swaps whatever is stored under `id` for `session`.
    pub fn replace(&self, id: SessionId, session: S) -> Arc<Mutex<S>> {
        let session = self.put(id, session);
        debug!("Reset session {}", id);
        session
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops sessions not touched within the idle timeout.
    pub fn evict_idle(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        let timeout = self.idle_timeout;
        entries.retain(|_, e| e.last_seen.elapsed() < timeout);
        let evicted = before - entries.len();
        if evicted > 0 {
            info!("Evicted {} idle sessions", evicted);
        }
        evicted
    }

    fn put(&self, id: SessionId, session: S) -> Arc<Mutex<S>> {
        let session = Arc::new(Mutex::new(session));
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if !entries.contains_key(&id) && entries.len() >= self.max_sessions {
            let timeout = self.idle_timeout;
            entries.retain(|_, e| e.last_seen.elapsed() < timeout);
            if entries.len() >= self.max_sessions {
                let victim = entries
                    .iter()
                    .filter(|(_, e)| !self.is_retained(e))
                    .min_by_key(|(_, e)| e.last_seen)
                    .or_else(|| entries.iter().min_by_key(|(_, e)| e.last_seen))
                    .map(|(k, _)| *k);
                if let Some(victim) = victim {
                    entries.remove(&victim);
                    info!("Session limit reached, dropped session {}", victim);
                }
            }
        }

        entries.insert(
            id,
            Entry {
                session: Arc::clone(&session),
                last_seen: Instant::now(),
            },
        );
        session
    }

    fn is_retained(&self, entry: &Entry<S>) -> bool {
        let Some(retain) = self.retain else {
            return false;
        };
        match entry.session.try_lock() {
            Ok(session) => retain(&*session),
            Err(_) => true,
        }
    }
}
