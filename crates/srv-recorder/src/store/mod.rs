//! Lease Store backends.
//!
//! The coordination service is consumed through five calls: session
//! create/info/destroy plus a get and a compare-and-swap acquire on one key.
//!
//! - `consul` - Consul HTTP API (sessions + KV acquire)
//! - `redis` - Redis emulation of the same contract

mod consul;
#[cfg(test)]
pub mod memory;
mod redis;

pub use consul::ConsulClient;
pub use self::redis::RedisStore;

use async_trait::async_trait;
use recorder_common::{Lease, Result};

/// Session and key-value primitives of the coordination service
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Create a session with the given display name, returning its identifier
    async fn create_session(&self, name: &str) -> Result<String>;

    /// Full session record, or `None` if the store no longer knows the id
    async fn session_info(&self, id: &str) -> Result<Option<Lease>>;

    /// Destroy a session, releasing any key it holds
    async fn destroy_session(&self, id: &str) -> Result<()>;

    /// Session currently bound to `key`, if any
    async fn kv_get(&self, key: &str) -> Result<Option<String>>;

    /// Bind `key` to `session`.
    ///
    /// Succeeds only if the key is unbound or already bound to `session`.
    async fn kv_acquire(&self, key: &str, session: &str) -> Result<bool>;
}
