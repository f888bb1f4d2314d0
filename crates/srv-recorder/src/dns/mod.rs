//! DNS record publication.
//!
//! The leader renders live members into one SRV record set and upserts it.
//!
//! - `route53` - AWS Route53 hosted zone

mod route53;

pub use route53::Route53Publisher;

use async_trait::async_trait;
use recorder_common::{Result, SrvTarget};
use serde::Serialize;

/// Record set handed to a publisher
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSet {
    pub name: String,
    pub ttl: i64,
    pub record_type: String,
    pub records: Vec<String>,
}

/// `_service._proto.name. TTL class SRV priority weight port target.`
#[derive(Debug, Clone)]
pub struct SrvRecord {
    pub name: String,
    pub ttl: i64,
    pub targets: Vec<SrvTarget>,
}

impl SrvRecord {
    /// One target per address, all sharing priority, weight and port
    pub fn from_addresses(
        name: &str,
        ttl: i64,
        priority: u16,
        weight: u16,
        port: u16,
        addresses: &[String],
    ) -> Self {
        let targets = addresses
            .iter()
            .map(|address| SrvTarget {
                priority,
                weight,
                port,
                target: address.clone(),
            })
            .collect();

        Self {
            name: name.to_string(),
            ttl,
            targets,
        }
    }

    pub fn to_record_set(&self) -> RecordSet {
        RecordSet {
            name: self.name.clone(),
            ttl: self.ttl,
            record_type: "SRV".to_string(),
            records: self.targets.iter().map(SrvTarget::to_record_value).collect(),
        }
    }
}

/// Idempotent create-or-replace of a record set
#[async_trait]
pub trait RecordPublisher: Send + Sync {
    async fn upsert(&self, record: &RecordSet) -> Result<()>;
}

/// Publisher that only logs the record set
pub struct DryRunPublisher;

#[async_trait]
impl RecordPublisher for DryRunPublisher {
    async fn upsert(&self, record: &RecordSet) -> Result<()> {
        tracing::info!(
            name = %record.name,
            ttl = record.ttl,
            records = ?record.records,
            "Dry run, not publishing {} record",
            record.record_type
        );
        Ok(())
    }
}
