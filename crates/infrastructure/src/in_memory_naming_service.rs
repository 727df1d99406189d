use std::collections::HashMap;

use async_trait::async_trait;
use ondemand_application::NamingService;
use ondemand_core::AppResult;
use ondemand_domain::{DnsRecord, DnsRecordType};
use tokio::sync::RwLock;

/// In-process naming service keyed by record name and type.
#[derive(Default)]
pub struct InMemoryNamingService {
    records: RwLock<HashMap<(String, DnsRecordType), DnsRecord>>,
}

impl InMemoryNamingService {
    /// Creates an empty naming service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the published record for a name and type.
    pub async fn record(&self, name: &str, record_type: DnsRecordType) -> Option<DnsRecord> {
        self.records
            .read()
            .await
            .get(&(name.to_owned(), record_type))
            .cloned()
    }

    /// Returns how many records are published.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns true when no record is published.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl NamingService for InMemoryNamingService {
    async fn upsert_record(&self, record: &DnsRecord) -> AppResult<()> {
        self.records.write().await.insert(
            (record.name().to_owned(), record.record_type()),
            record.clone(),
        );
        Ok(())
    }
}
