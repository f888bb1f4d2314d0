//! Route53 record publisher.

use async_trait::async_trait;
use aws_sdk_route53::Client;
use aws_sdk_route53::config::Region;
use aws_sdk_route53::error::DisplayErrorContext;
use aws_sdk_route53::types::{
    Change, ChangeAction, ChangeBatch, ResourceRecord, ResourceRecordSet, RrType,
};
use recorder_common::{RecorderError, Result};

use super::{RecordPublisher, RecordSet};

fn dns_err(what: &str, e: impl std::fmt::Display) -> RecorderError {
    RecorderError::Dns(format!("{}: {}", what, e))
}

/// Publishes record sets into one hosted zone
pub struct Route53Publisher {
    client: Client,
    zone_id: String,
}

impl Route53Publisher {
    /// Build a client from the default AWS credential chain
    pub async fn new(zone_id: String, region: String) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region))
            .load()
            .await;

        Self {
            client: Client::new(&config),
            zone_id,
        }
    }

    fn change_batch(record: &RecordSet) -> Result<ChangeBatch> {
        let records = record
            .records
            .iter()
            .map(|value| ResourceRecord::builder().value(value).build())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| dns_err("invalid record value", e))?;

        let record_set = ResourceRecordSet::builder()
            .name(&record.name)
            .r#type(RrType::from(record.record_type.as_str()))
            .ttl(record.ttl)
            .set_resource_records(Some(records))
            .build()
            .map_err(|e| dns_err("invalid record set", e))?;

        let change = Change::builder()
            .action(ChangeAction::Upsert)
            .resource_record_set(record_set)
            .build()
            .map_err(|e| dns_err("invalid change", e))?;

        ChangeBatch::builder()
            .changes(change)
            .build()
            .map_err(|e| dns_err("invalid change batch", e))
    }
}

#[async_trait]
impl RecordPublisher for Route53Publisher {
    async fn upsert(&self, record: &RecordSet) -> Result<()> {
        tracing::info!(
            "updating {} {} record with {} targets",
            record.name,
            record.record_type,
            record.records.len()
        );

        let batch = Self::change_batch(record)?;

        let response = self
            .client
            .change_resource_record_sets()
            .hosted_zone_id(&self.zone_id)
            .change_batch(batch)
            .send()
            .await
            .map_err(|e| dns_err("unable to update record", DisplayErrorContext(&e)))?;

        tracing::debug!(change = ?response.change_info(), "change submitted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_batch_is_single_upsert() {
        let record = RecordSet {
            name: "_http._tcp.example.com.".to_string(),
            ttl: 60,
            record_type: "SRV".to_string(),
            records: vec!["10 10 8080 10.0.0.1".to_string()],
        };

        let batch = Route53Publisher::change_batch(&record).unwrap();
        let changes = batch.changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action(), &ChangeAction::Upsert);

        let set = changes[0].resource_record_set().unwrap();
        assert_eq!(set.name(), "_http._tcp.example.com.");
        assert_eq!(set.ttl(), Some(60));
    }
}
