//! Lease lifecycle against the Lease Store, backed by the local cache.

use recorder_common::{Lease, RecorderError, Result};
use std::sync::Arc;

use super::LeaseCache;
use crate::state::AppState;
use crate::store::LeaseStore;

/// Creates, validates and destroys this process's lease
pub struct LeaseManager {
    store: Arc<dyn LeaseStore>,
    cache: LeaseCache,
    session_name: String,
}

impl LeaseManager {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            cache: state.cache.clone(),
            session_name: state.config.session_name.clone(),
        }
    }

    /// Reuse the cached lease if the store still recognizes it, otherwise
    /// mint a new one.
    pub async fn obtain_lease(&self) -> Result<Lease> {
        if let Some(cached) = self.cache.load().await {
            if self.validate(&cached).await? {
                tracing::info!(lease_id = %cached.id, "Reusing cached lease");
                return Ok(cached);
            }
            tracing::info!(lease_id = %cached.id, "Cached lease is no longer valid");
        }

        self.create_lease().await
    }

    /// Mint a lease, re-read its full record and persist it.
    ///
    /// Every failure here is returned to the caller; a run without a lease
    /// cannot continue.
    pub async fn create_lease(&self) -> Result<Lease> {
        let id = self.store.create_session(&self.session_name).await?;

        let lease = self.store.session_info(&id).await?.ok_or_else(|| {
            RecorderError::Store(format!("session {} vanished right after creation", id))
        })?;

        self.cache.store(&lease).await?;

        tracing::info!(
            lease_id = %lease.id,
            node = %lease.node,
            cache = %self.cache.path().display(),
            "Created lease"
        );
        Ok(lease)
    }

    /// True iff the store still recognizes the lease id.
    ///
    /// A store error is returned rather than read as "invalid": an unreachable
    /// store and an expired lease are not the same answer.
    pub async fn validate(&self, lease: &Lease) -> Result<bool> {
        let valid = self.store.session_info(&lease.id).await?.is_some();
        tracing::debug!(lease_id = %lease.id, valid, "Validated lease");
        Ok(valid)
    }

    /// Best-effort release: destroy the lease, then drop the cache file.
    pub async fn destroy_lease(&self, lease: &Lease) {
        if let Err(e) = self.store.destroy_session(&lease.id).await {
            tracing::warn!(lease_id = %lease.id, error = %e, "unable to destroy lease");
        } else {
            tracing::info!(lease_id = %lease.id, "Destroyed lease");
        }

        self.cache.clear().await;
    }

    /// The lease recorded on disk, unvalidated
    pub async fn cached_lease(&self) -> Option<Lease> {
        self.cache.load().await
    }
}
