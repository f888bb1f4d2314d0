//! In-memory Lease Store used by tests.

use async_trait::async_trait;
use recorder_common::{Lease, RecorderError, Result};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::LeaseStore;

/// Lease Store with Consul's CAS semantics held in a mutex
#[derive(Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<String, Lease>>,
    kv: Mutex<HashMap<String, String>>,
    next_id: AtomicUsize,
    creates: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session as if another run had created it
    pub fn insert_session(&self, id: &str) {
        self.sessions
            .lock()
            .unwrap()
            .insert(id.to_string(), Lease::new(id, "consul-srv-updater", "test-node"));
    }

    /// Forget a session without releasing its keys (store-side expiry)
    pub fn expire_session(&self, id: &str) {
        self.sessions.lock().unwrap().remove(id);
    }

    /// Bind a key directly, bypassing the CAS check
    pub fn bind(&self, key: &str, session: &str) {
        self.kv
            .lock()
            .unwrap()
            .insert(key.to_string(), session.to_string());
    }

    /// Raw binding, ignoring session liveness
    pub fn binding(&self, key: &str) -> Option<String> {
        self.kv.lock().unwrap().get(key).cloned()
    }

    /// Number of sessions created through `create_session`
    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn has_session(&self, id: &str) -> bool {
        self.sessions.lock().unwrap().contains_key(id)
    }

    /// Make every subsequent call fail with a store error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RecorderError::Store("connection refused".to_string()));
        }
        Ok(())
    }

    /// Binding for `key` whose session is still alive
    fn live_binding(&self, key: &str) -> Option<String> {
        let sessions = self.sessions.lock().unwrap();
        self.kv
            .lock()
            .unwrap()
            .get(key)
            .filter(|id| sessions.contains_key(*id))
            .cloned()
    }
}

#[async_trait]
impl LeaseStore for MemoryStore {
    async fn create_session(&self, name: &str) -> Result<String> {
        self.check()?;
        let id = format!("L{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.sessions
            .lock()
            .unwrap()
            .insert(id.clone(), Lease::new(&id, name, "test-node"));
        Ok(id)
    }

    async fn session_info(&self, id: &str) -> Result<Option<Lease>> {
        self.check()?;
        Ok(self.sessions.lock().unwrap().get(id).cloned())
    }

    async fn destroy_session(&self, id: &str) -> Result<()> {
        self.check()?;
        self.sessions.lock().unwrap().remove(id);
        self.kv.lock().unwrap().retain(|_, bound| bound != id);
        Ok(())
    }

    async fn kv_get(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        Ok(self.live_binding(key))
    }

    async fn kv_acquire(&self, key: &str, session: &str) -> Result<bool> {
        self.check()?;
        if !self.has_session(session) {
            return Err(RecorderError::Store(format!("invalid session {}", session)));
        }
        match self.live_binding(key) {
            Some(bound) if bound != session => Ok(false),
            _ => {
                self.bind(key, session);
                Ok(true)
            }
        }
    }
}
