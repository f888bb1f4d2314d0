//! Cluster membership.
//!
//! The leader enumerates live members to build the SRV record. Backends
//! live next to their Lease Store (`ConsulClient`, `RedisStore`).

use async_trait::async_trait;
use recorder_common::{Member, Result};

/// Source of the current live cluster members
#[async_trait]
pub trait MemberSource: Send + Sync {
    async fn members(&self) -> Result<Vec<Member>>;

    /// Register this instance as a member at `address`.
    ///
    /// Sources that discover members on their own (Consul agents) ignore it.
    async fn announce(&self, _address: &str) -> Result<()> {
        Ok(())
    }
}

/// Sorted, de-duplicated member addresses
pub fn distinct_addresses(members: &[Member]) -> Vec<String> {
    let mut addresses: Vec<String> = members
        .iter()
        .map(|m| m.address.clone())
        .filter(|a| !a.is_empty())
        .collect();
    addresses.sort();
    addresses.dedup();
    addresses
}
