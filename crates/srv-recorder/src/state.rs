//! Process context shared by the lease manager, lock coordinator and updater.

use anyhow::{Context, Result};
use recorder_common::constants::DEFAULT_DATACENTER;
use recorder_common::RecorderError;
use std::sync::Arc;

use crate::cluster::MemberSource;
use crate::config::{AppConfig, Backend};
use crate::dns::{DryRunPublisher, RecordPublisher, Route53Publisher};
use crate::lease::LeaseCache;
use crate::lock::lock_key;
use crate::store::{ConsulClient, LeaseStore, RedisStore};

/// Everything one run needs, built once at startup
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// Lease Store (sessions + lock key)
    pub store: Arc<dyn LeaseStore>,

    /// Cluster membership source
    pub members: Arc<dyn MemberSource>,

    /// DNS record publisher
    pub publisher: Arc<dyn RecordPublisher>,

    /// Local lease cache
    pub cache: LeaseCache,

    /// Leadership key in the Lease Store
    pub lock_key: String,
}

impl AppState {
    /// Create the context, connecting to the configured backend
    pub async fn new(config: AppConfig) -> Result<Self> {
        let cache = LeaseCache::new(config.data_dir()?);

        let (store, members, datacenter): (Arc<dyn LeaseStore>, Arc<dyn MemberSource>, String) =
            match config.backend {
                Backend::Consul => {
                    let client = Arc::new(ConsulClient::new(
                        &config.consul.address,
                        config.consul.token.clone(),
                    )?);
                    let datacenter = match &config.datacenter {
                        Some(dc) => dc.clone(),
                        None => client.datacenter().await?,
                    };
                    tracing::info!(address = %config.consul.address, datacenter = %datacenter, "Using Consul");
                    (
                        client.clone() as Arc<dyn LeaseStore>,
                        client as Arc<dyn MemberSource>,
                        datacenter,
                    )
                }
                Backend::Redis => {
                    let redis = Arc::new(
                        RedisStore::connect(
                            &config.redis.url,
                            config.redis.node_label.clone(),
                            config.redis.session_ttl_secs,
                            config.redis.member_ttl_secs,
                        )
                        .await?,
                    );
                    let datacenter = config
                        .datacenter
                        .clone()
                        .unwrap_or_else(|| DEFAULT_DATACENTER.to_string());
                    tracing::info!(url = %config.redis.url, datacenter = %datacenter, "Using Redis");
                    (
                        redis.clone() as Arc<dyn LeaseStore>,
                        redis as Arc<dyn MemberSource>,
                        datacenter,
                    )
                }
            };

        let publisher: Arc<dyn RecordPublisher> = if config.dry_run {
            Arc::new(DryRunPublisher)
        } else {
            let zone_id = config
                .record
                .zone_id
                .clone()
                .ok_or_else(|| RecorderError::Config("record.zone_id is required".to_string()))
                .context("Failed to configure Route53")?;
            Arc::new(Route53Publisher::new(zone_id, config.record.region.clone()).await)
        };

        let lock_key = lock_key(&config.key_prefix, &datacenter);

        Ok(Self {
            config,
            store,
            members,
            publisher,
            cache,
            lock_key,
        })
    }
}
