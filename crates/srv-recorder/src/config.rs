//! Configuration management for the SRV recorder.

use anyhow::{Context, Result};
use clap::ValueEnum;
use recorder_common::RecorderError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use recorder_common::constants::{
    DEFAULT_AWS_REGION, DEFAULT_CONSUL_ADDR, DEFAULT_KEY_PREFIX, DEFAULT_MEMBER_TTL_SECS,
    DEFAULT_RECORD_TTL_SECS, DEFAULT_REDIS_SESSION_TTL_SECS, DEFAULT_REDIS_URL,
    DEFAULT_SESSION_NAME, DEFAULT_SRV_PRIORITY, DEFAULT_SRV_WEIGHT,
};

/// Coordination service holding leases and the lock key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Consul,
    Redis,
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Directory holding the lease cache (required)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Lease Store backend
    #[serde(default)]
    pub backend: Backend,

    /// Display name of created leases
    #[serde(default = "default_session_name")]
    pub session_name: String,

    /// Resource name the lock key is derived from
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Datacenter segment of the lock key (discovered if unset)
    #[serde(default)]
    pub datacenter: Option<String>,

    /// Log the record instead of publishing it
    #[serde(default)]
    pub dry_run: bool,

    #[serde(default)]
    pub consul: ConsulConfig,

    #[serde(default)]
    pub redis: RedisConfig,

    #[serde(default)]
    pub record: RecordConfig,
}

/// Consul agent connection
#[derive(Debug, Clone, Deserialize)]
pub struct ConsulConfig {
    #[serde(default = "default_consul_addr")]
    pub address: String,

    /// ACL token
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            address: default_consul_addr(),
            token: None,
        }
    }
}

/// Redis backend settings
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Session expiry in seconds
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Membership entry expiry in seconds
    #[serde(default = "default_member_ttl")]
    pub member_ttl_secs: u64,

    /// Address this instance registers as a member (not registered if unset)
    #[serde(default)]
    pub advertise_addr: Option<String>,

    /// Owner label written into leases and member entries
    #[serde(default = "generate_node_label")]
    pub node_label: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            session_ttl_secs: default_session_ttl(),
            member_ttl_secs: default_member_ttl(),
            advertise_addr: None,
            node_label: generate_node_label(),
        }
    }
}

/// Published SRV record
#[derive(Debug, Clone, Deserialize)]
pub struct RecordConfig {
    /// Fully qualified record name, e.g. `_http._tcp.example.com.`
    #[serde(default)]
    pub name: Option<String>,

    /// Route53 hosted zone id
    #[serde(default)]
    pub zone_id: Option<String>,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default = "default_record_ttl")]
    pub ttl: i64,

    #[serde(default = "default_priority")]
    pub priority: u16,

    #[serde(default = "default_weight")]
    pub weight: u16,

    /// Service port advertised in every target
    #[serde(default)]
    pub port: u16,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            name: None,
            zone_id: None,
            region: default_region(),
            ttl: default_record_ttl(),
            priority: default_priority(),
            weight: default_weight(),
            port: 0,
        }
    }
}

// Default value functions
fn default_session_name() -> String { DEFAULT_SESSION_NAME.to_string() }
fn default_key_prefix() -> String { DEFAULT_KEY_PREFIX.to_string() }
fn default_consul_addr() -> String { DEFAULT_CONSUL_ADDR.to_string() }
fn default_redis_url() -> String { DEFAULT_REDIS_URL.to_string() }
fn default_session_ttl() -> u64 { DEFAULT_REDIS_SESSION_TTL_SECS }
fn default_member_ttl() -> u64 { DEFAULT_MEMBER_TTL_SECS }
fn default_region() -> String { DEFAULT_AWS_REGION.to_string() }
fn default_record_ttl() -> i64 { DEFAULT_RECORD_TTL_SECS }
fn default_priority() -> u16 { DEFAULT_SRV_PRIORITY }
fn default_weight() -> u16 { DEFAULT_SRV_WEIGHT }

fn generate_node_label() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    format!("recorder-{:08x}", rng.random::<u32>())
}

impl AppConfig {
    /// Load configuration from file, with CLI overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let settings = config::Config::builder()
                .add_source(config::File::with_name(config_path))
                .build()
                .context("Failed to load config file")?;

            settings
                .try_deserialize()
                .context("Failed to parse config")?
        } else {
            tracing::debug!(path = %config_path, "Config file not found, using defaults");
            Self::default()
        };

        // Apply CLI overrides
        if let Some(ref data_dir) = args.data_dir {
            config.data_dir = Some(data_dir.clone());
        }
        if let Some(backend) = args.backend {
            config.backend = backend;
        }
        if let Some(ref addr) = args.consul_addr {
            config.consul.address = addr.clone();
        }
        if let Some(ref token) = args.consul_token {
            config.consul.token = Some(token.clone());
        }
        if let Some(ref url) = args.redis_url {
            config.redis.url = url.clone();
        }
        if let Some(ref dc) = args.datacenter {
            config.datacenter = Some(dc.clone());
        }
        // releasing never publishes
        if args.dry_run || args.release {
            config.dry_run = true;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject missing required options before any remote call
    pub fn validate(&self) -> recorder_common::Result<()> {
        self.data_dir()?;

        if self.dry_run {
            return Ok(());
        }

        if self.record.name.as_deref().is_none_or(str::is_empty) {
            return Err(RecorderError::Config("record.name is required".to_string()));
        }
        if self.record.zone_id.as_deref().is_none_or(str::is_empty) {
            return Err(RecorderError::Config("record.zone_id is required".to_string()));
        }
        if self.record.port == 0 {
            return Err(RecorderError::Config("record.port is required".to_string()));
        }

        Ok(())
    }

    /// The data directory, or a configuration error if unset
    pub fn data_dir(&self) -> recorder_common::Result<&Path> {
        match self.data_dir.as_deref() {
            Some(dir) if !dir.as_os_str().is_empty() => Ok(dir),
            _ => Err(RecorderError::Config(
                "data directory is required (--data-dir)".to_string(),
            )),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            backend: Backend::default(),
            session_name: default_session_name(),
            key_prefix: default_key_prefix(),
            datacenter: None,
            dry_run: false,
            consul: ConsulConfig::default(),
            redis: RedisConfig::default(),
            record: RecordConfig::default(),
        }
    }
}
