use std::sync::Arc;

use ondemand_core::{AppResult, NonEmptyString};
use ondemand_domain::{DnsRecord, WorkloadRunningEvent};
use tracing::info;

use crate::platform_ports::{NamingService, TaskNetworkResolver};

/// Points the fixed server name at the public address of a running task.
#[derive(Clone)]
pub struct EndpointPublisher {
    resolver: Arc<dyn TaskNetworkResolver>,
    naming_service: Arc<dyn NamingService>,
    record_name: NonEmptyString,
    ttl_seconds: u32,
}

impl EndpointPublisher {
    /// Creates an endpoint publisher for one record name.
    pub fn new(
        resolver: Arc<dyn TaskNetworkResolver>,
        naming_service: Arc<dyn NamingService>,
        record_name: impl Into<String>,
        ttl_seconds: u32,
    ) -> AppResult<Self> {
        Ok(Self {
            resolver,
            naming_service,
            record_name: NonEmptyString::new(record_name)?,
            ttl_seconds,
        })
    }

    /// Resolves the task address and upserts the server record.
    ///
    /// Safe to repeat for the same event; the record converges to the latest address.
    pub async fn publish(&self, event: &WorkloadRunningEvent) -> AppResult<DnsRecord> {
        let network_interface_id = self
            .resolver
            .describe_task(event.cluster_id(), event.task_id())
            .await?;
        let address = self
            .resolver
            .describe_network_interface(&network_interface_id)
            .await?;

        let record = DnsRecord::new(self.record_name.as_str(), address, self.ttl_seconds)?;
        self.naming_service.upsert_record(&record).await?;

        info!(
            task_id = event.task_id(),
            network_interface_id = %network_interface_id,
            record_name = record.name(),
            address = %record.address(),
            "published server endpoint"
        );

        Ok(record)
    }
}
