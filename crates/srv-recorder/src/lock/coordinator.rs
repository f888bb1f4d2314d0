//! Acquire/verify protocol over the leadership key.

use recorder_common::{Lease, Result};
use std::sync::Arc;

use crate::state::AppState;
use crate::store::LeaseStore;

/// Leadership key for a resource in a datacenter
pub fn lock_key(prefix: &str, datacenter: &str) -> String {
    format!("{}/{}/leader", prefix.trim_end_matches('/'), datacenter)
}

/// Decides leadership for one lease
pub struct LockCoordinator {
    store: Arc<dyn LeaseStore>,
    key: String,
}

impl LockCoordinator {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            key: state.lock_key.clone(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// True iff the key is currently bound to this lease
    pub async fn have_lock(&self, lease: &Lease) -> Result<bool> {
        let bound = self.store.kv_get(&self.key).await?;
        tracing::debug!(key = %self.key, bound = ?bound, "Read lock key");
        Ok(bound.as_deref() == Some(lease.id.as_str()))
    }

    /// Compare-and-swap the key to this lease.
    ///
    /// Succeeds when the key was unbound or already bound to this lease.
    pub async fn acquire_lock(&self, lease: &Lease) -> Result<bool> {
        let acquired = self.store.kv_acquire(&self.key, &lease.id).await?;
        tracing::debug!(key = %self.key, lease_id = %lease.id, acquired, "Acquire attempt");
        Ok(acquired)
    }

    /// `acquire_lock || have_lock`.
    ///
    /// Acquire alone covers first acquisition and, under the store's CAS
    /// contract, re-acquisition by the same lease. The read covers stores that
    /// report a no-op re-acquire as a failure. It only ever answers for this
    /// lease id, so it cannot report leadership while another lease holds the
    /// key. No state is kept between calls.
    pub async fn try_become_leader(&self, lease: &Lease) -> Result<bool> {
        if self.acquire_lock(lease).await? {
            return Ok(true);
        }

        let held = self.have_lock(lease).await?;
        if held {
            tracing::debug!(key = %self.key, lease_id = %lease.id, "Acquire refused but key already held");
        }
        Ok(held)
    }
}
