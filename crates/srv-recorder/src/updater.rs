//! One recorder run: obtain a lease, try to lead, publish if leading.

use recorder_common::Result;

use crate::cluster::distinct_addresses;
use crate::dns::SrvRecord;
use crate::lease::LeaseManager;
use crate::lock::LockCoordinator;
use crate::state::AppState;

/// How a run ended. Every variant is a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Leader, record published with this many targets
    Published { targets: usize },
    /// Leader, but no live members to publish
    NoMembers,
    /// Another lease holds the lock key
    NotLeader,
    /// Cached lease destroyed on request
    Released,
}

/// Drives the lease manager and lock coordinator for one run
pub struct SrvUpdater<'a> {
    state: &'a AppState,
    leases: LeaseManager,
    lock: LockCoordinator,
}

impl<'a> SrvUpdater<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            state,
            leases: LeaseManager::new(state),
            lock: LockCoordinator::new(state),
        }
    }

    pub async fn update(&self) -> Result<RunOutcome> {
        let lease = self.leases.obtain_lease().await?;

        if let Some(address) = &self.state.config.redis.advertise_addr {
            self.state.members.announce(address).await?;
        }

        if !self.lock.try_become_leader(&lease).await? {
            tracing::info!(key = %self.lock.key(), lease_id = %lease.id, "unable to lock key, not the leader");
            return Ok(RunOutcome::NotLeader);
        }

        tracing::info!(key = %self.lock.key(), lease_id = %lease.id, "Holding leadership");
        self.publish().await
    }

    /// Step down: destroy the cached lease and forget it
    pub async fn release(&self) -> Result<RunOutcome> {
        match self.leases.cached_lease().await {
            Some(lease) => self.leases.destroy_lease(&lease).await,
            None => tracing::info!("No cached lease to release"),
        }
        Ok(RunOutcome::Released)
    }

    async fn publish(&self) -> Result<RunOutcome> {
        let members = self.state.members.members().await?;
        let addresses = distinct_addresses(&members);

        if addresses.is_empty() {
            tracing::warn!("No live members, skipping record update");
            return Ok(RunOutcome::NoMembers);
        }

        let record = &self.state.config.record;
        let srv = SrvRecord::from_addresses(
            record.name.as_deref().unwrap_or_default(),
            record.ttl,
            record.priority,
            record.weight,
            record.port,
            &addresses,
        );

        self.state.publisher.upsert(&srv.to_record_set()).await?;

        tracing::info!(name = %srv.name, targets = srv.targets.len(), "Record published");
        Ok(RunOutcome::Published {
            targets: srv.targets.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::{RecordPublisher, RecordSet};
    use crate::state::tests::{StaticMembers, test_state};
    use crate::store::memory::MemoryStore;
    use async_trait::async_trait;
    use recorder_common::{Lease, Member, RecorderError};
    use std::sync::{Arc, Mutex};
    use tokio_test::assert_err;

    const KEY: &str = "consul.io/srv_recorder/dc1/leader";

    #[derive(Default)]
    struct RecordingPublisher {
        published: Mutex<Vec<RecordSet>>,
    }

    #[async_trait]
    impl RecordPublisher for RecordingPublisher {
        async fn upsert(&self, record: &RecordSet) -> recorder_common::Result<()> {
            self.published.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn members(addresses: &[&str]) -> Arc<StaticMembers> {
        Arc::new(StaticMembers(
            addresses
                .iter()
                .enumerate()
                .map(|(i, a)| Member {
                    name: format!("node-{}", i),
                    address: a.to_string(),
                })
                .collect(),
        ))
    }

    fn setup(
        dir: &std::path::Path,
        store: Arc<MemoryStore>,
        addresses: &[&str],
    ) -> (AppState, Arc<RecordingPublisher>) {
        let publisher = Arc::new(RecordingPublisher::default());
        let mut state = test_state(dir, store);
        state.config.record.name = Some("_http._tcp.example.com.".to_string());
        state.config.record.port = 8080;
        state.members = members(addresses);
        state.publisher = publisher.clone();
        (state, publisher)
    }

    #[tokio::test]
    async fn test_fresh_start_leads_and_publishes() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let (state, publisher) = setup(dir.path(), store.clone(), &["10.0.0.2", "10.0.0.1"]);

        let outcome = SrvUpdater::new(&state).update().await.unwrap();

        assert_eq!(outcome, RunOutcome::Published { targets: 2 });
        assert_eq!(store.binding(KEY).as_deref(), Some("L1"));
        assert_eq!(state.cache.load().await.unwrap().id, "L1");

        let published = publisher.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].name, "_http._tcp.example.com.");
        assert_eq!(published[0].record_type, "SRV");
        assert_eq!(
            published[0].records,
            vec!["10 10 8080 10.0.0.1", "10 10 8080 10.0.0.2"]
        );
    }

    #[tokio::test]
    async fn test_restart_reuses_lease_and_lock() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let (state, publisher) = setup(dir.path(), store.clone(), &["10.0.0.1"]);

        SrvUpdater::new(&state).update().await.unwrap();
        let outcome = SrvUpdater::new(&state).update().await.unwrap();

        assert_eq!(outcome, RunOutcome::Published { targets: 1 });
        assert_eq!(store.create_count(), 1);
        assert_eq!(store.binding(KEY).as_deref(), Some("L1"));
        assert_eq!(publisher.published.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_expired_lease_with_live_holder_skips_action() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        store.insert_session("peer");
        store.bind(KEY, "peer");
        let (state, publisher) = setup(dir.path(), store.clone(), &["10.0.0.1"]);
        state.cache.store(&Lease::new("expired", "consul-srv-updater", "web-1")).await.unwrap();

        let outcome = SrvUpdater::new(&state).update().await.unwrap();

        assert_eq!(outcome, RunOutcome::NotLeader);
        assert_eq!(store.create_count(), 1);
        assert_ne!(state.cache.load().await.unwrap().id, "expired");
        assert!(publisher.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expired_lease_and_released_binding_leads() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        // Binding left behind by a dead peer whose lease the store dropped
        store.bind(KEY, "L0");
        let (state, _publisher) = setup(dir.path(), store.clone(), &["10.0.0.1"]);
        state.cache.store(&Lease::new("L0", "consul-srv-updater", "web-1")).await.unwrap();

        let outcome = SrvUpdater::new(&state).update().await.unwrap();

        assert_eq!(outcome, RunOutcome::Published { targets: 1 });
        assert_eq!(store.binding(KEY).as_deref(), Some("L1"));
    }

    #[tokio::test]
    async fn test_no_members_skips_publish() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let (state, publisher) = setup(dir.path(), store, &[]);

        let outcome = SrvUpdater::new(&state).update().await.unwrap();

        assert_eq!(outcome, RunOutcome::NoMembers);
        assert!(publisher.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        store.set_failing(true);
        let (state, publisher) = setup(dir.path(), store, &["10.0.0.1"]);

        let err = assert_err!(SrvUpdater::new(&state).update().await);

        assert!(matches!(err, RecorderError::Store(_)));
        assert_eq!(err.exit_code(), 1);
        assert!(publisher.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_release_destroys_cached_lease() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let (state, _publisher) = setup(dir.path(), store.clone(), &["10.0.0.1"]);

        SrvUpdater::new(&state).update().await.unwrap();
        let outcome = SrvUpdater::new(&state).release().await.unwrap();

        assert_eq!(outcome, RunOutcome::Released);
        assert!(!store.has_session("L1"));
        assert!(store.binding(KEY).is_none());
        assert!(state.cache.load().await.is_none());

        // Nothing cached: still a clean release
        assert_eq!(
            SrvUpdater::new(&state).release().await.unwrap(),
            RunOutcome::Released
        );
    }
}
