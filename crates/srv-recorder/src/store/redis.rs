//! Redis emulation of the Lease Store contract.
//!
//! Sessions are JSON lease records with an expiry. The lock key holds the
//! bound session id; a binding whose session has expired counts as released.
//!
//! One multiplexed connection, no reconnect and no retry: a transport error
//! ends the run like any other store error.

use async_trait::async_trait;
use rand::Rng;
use recorder_common::constants::redis_keys::{KV_PREFIX, MEMBERS, SESSION_PREFIX};
use recorder_common::{Lease, Member, RecorderError, Result};
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use serde_json::Value;

use super::LeaseStore;
use crate::cluster::MemberSource;

/// Bind KEYS[1] to ARGV[1] unless another live session holds it.
/// ARGV[2] is the session key prefix.
const ACQUIRE_SCRIPT: &str = r#"
if redis.call('EXISTS', ARGV[2] .. ARGV[1]) == 0 then
    return redis.error_reply('invalid session ' .. ARGV[1])
end
local current = redis.call('GET', KEYS[1])
if current and current ~= ARGV[1] and redis.call('EXISTS', ARGV[2] .. current) == 1 then
    return 0
end
redis.call('SET', KEYS[1], ARGV[1])
return 1
"#;

fn store_err(what: &str) -> impl FnOnce(redis::RedisError) -> RecorderError + '_ {
    move |e| RecorderError::Store(format!("{}: {}", what, e))
}

fn session_key(id: &str) -> String {
    format!("{}{}", SESSION_PREFIX, id)
}

fn kv_key(key: &str) -> String {
    format!("{}{}", KV_PREFIX, key)
}

/// Redis-backed Lease Store and member registry
pub struct RedisStore {
    redis: MultiplexedConnection,
    node_label: String,
    session_ttl_secs: u64,
    member_ttl_secs: u64,
}

impl RedisStore {
    /// Open a single connection to Redis
    pub async fn connect(
        url: &str,
        node_label: String,
        session_ttl_secs: u64,
        member_ttl_secs: u64,
    ) -> Result<Self> {
        let client = redis::Client::open(url).map_err(store_err("failed to create Redis client"))?;
        let redis = client
            .get_multiplexed_async_connection()
            .await
            .map_err(store_err("failed to connect to Redis"))?;

        Ok(Self {
            redis,
            node_label,
            session_ttl_secs,
            member_ttl_secs,
        })
    }

    async fn session_exists(&self, id: &str) -> Result<bool> {
        let mut conn = self.redis.clone();
        conn.exists(session_key(id))
            .await
            .map_err(store_err("unable to retrieve session"))
    }
}

#[async_trait]
impl LeaseStore for RedisStore {
    async fn create_session(&self, name: &str) -> Result<String> {
        let id = format!("{:032x}", rand::rng().random::<u128>());

        let mut lease = Lease::new(&id, name, &self.node_label);
        lease.extra.insert(
            "TTL".to_string(),
            Value::String(format!("{}s", self.session_ttl_secs)),
        );
        lease.extra.insert(
            "CreateTime".to_string(),
            Value::from(chrono::Utc::now().timestamp()),
        );

        let mut conn = self.redis.clone();
        let _: () = conn
            .set_ex(session_key(&id), serde_json::to_string(&lease)?, self.session_ttl_secs)
            .await
            .map_err(store_err("unable to create session"))?;

        Ok(id)
    }

    async fn session_info(&self, id: &str) -> Result<Option<Lease>> {
        let mut conn = self.redis.clone();
        let data: Option<String> = conn
            .get(session_key(id))
            .await
            .map_err(store_err("unable to retrieve session"))?;

        match data {
            Some(d) => Ok(Some(serde_json::from_str(&d)?)),
            None => Ok(None),
        }
    }

    async fn destroy_session(&self, id: &str) -> Result<()> {
        let mut conn = self.redis.clone();
        let _: () = conn
            .del(session_key(id))
            .await
            .map_err(store_err("unable to destroy session"))?;
        Ok(())
    }

    async fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.redis.clone();
        let bound: Option<String> = conn
            .get(kv_key(key))
            .await
            .map_err(store_err("unable to get key"))?;

        let Some(id) = bound else {
            return Ok(None);
        };

        if self.session_exists(&id).await? {
            Ok(Some(id))
        } else {
            Ok(None)
        }
    }

    async fn kv_acquire(&self, key: &str, session: &str) -> Result<bool> {
        let mut conn = self.redis.clone();
        let acquired: i32 = redis::Script::new(ACQUIRE_SCRIPT)
            .key(kv_key(key))
            .arg(session)
            .arg(SESSION_PREFIX)
            .invoke_async(&mut conn)
            .await
            .map_err(store_err("unable to acquire lock"))?;

        Ok(acquired == 1)
    }
}

#[async_trait]
impl MemberSource for RedisStore {
    async fn members(&self) -> Result<Vec<Member>> {
        let now = chrono::Utc::now().timestamp();
        let mut conn = self.redis.clone();

        let _: () = conn
            .zrembyscore(MEMBERS, "-inf", now)
            .await
            .map_err(|e| RecorderError::Membership(format!("unable to prune members: {}", e)))?;

        let entries: Vec<String> = conn
            .zrangebyscore(MEMBERS, now, "+inf")
            .await
            .map_err(|e| RecorderError::Membership(format!("unable to list members: {}", e)))?;

        Ok(entries
            .into_iter()
            .filter(|address| !address.is_empty())
            .map(|address| Member {
                name: address.clone(),
                address,
            })
            .collect())
    }

    /// Entries are keyed by address, so re-announcing refreshes the expiry
    async fn announce(&self, address: &str) -> Result<()> {
        let expires = chrono::Utc::now().timestamp() + self.member_ttl_secs as i64;

        let mut conn = self.redis.clone();
        let _: () = conn
            .zadd(MEMBERS, address, expires)
            .await
            .map_err(|e| RecorderError::Membership(format!("unable to register member: {}", e)))?;

        tracing::debug!(address = %address, node = %self.node_label, expires, "Member registered");
        Ok(())
    }
}
