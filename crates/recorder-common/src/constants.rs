//! Shared constants for the SRV recorder.

/// Default Consul HTTP API address
pub const DEFAULT_CONSUL_ADDR: &str = "http://127.0.0.1:8500";

/// Default Redis connection URL
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Display name given to every lease this process creates
pub const DEFAULT_SESSION_NAME: &str = "consul-srv-updater";

/// Resource name the lock key is derived from
pub const DEFAULT_KEY_PREFIX: &str = "consul.io/srv_recorder";

/// Datacenter used when none is configured and the backend cannot report one
pub const DEFAULT_DATACENTER: &str = "dc1";

/// Lease cache file name inside the data directory
pub const SESSION_FILE: &str = "session.json";

/// Redis session expiry in seconds (15 minutes)
pub const DEFAULT_REDIS_SESSION_TTL_SECS: u64 = 900;

/// Redis membership entry expiry in seconds (5 minutes)
pub const DEFAULT_MEMBER_TTL_SECS: u64 = 300;

/// Default SRV record TTL in seconds
pub const DEFAULT_RECORD_TTL_SECS: i64 = 60;

/// Default SRV priority and weight
pub const DEFAULT_SRV_PRIORITY: u16 = 10;
pub const DEFAULT_SRV_WEIGHT: u16 = 10;

/// Route53 is a global service; its API lives in us-east-1
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Consul member status for a live agent
pub const CONSUL_MEMBER_ALIVE: u8 = 1;

/// Redis key prefixes
pub mod redis_keys {
    /// Session record: srv_recorder:session:{session_id}
    pub const SESSION_PREFIX: &str = "srv_recorder:session:";

    /// Lock binding: srv_recorder:kv:{lock_key}
    pub const KV_PREFIX: &str = "srv_recorder:kv:";

    /// Sorted set of registered members, scored by expiry timestamp
    pub const MEMBERS: &str = "srv_recorder:members";
}

/// HTTP header names
pub mod headers {
    /// Consul ACL token header
    pub const X_CONSUL_TOKEN: &str = "X-Consul-Token";
}
