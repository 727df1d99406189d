use async_trait::async_trait;
use ondemand_core::AppResult;
use ondemand_domain::DnsRecord;

/// Naming service holding the published server record.
#[async_trait]
pub trait NamingService: Send + Sync {
    /// Creates or replaces the record with the same name and type.
    async fn upsert_record(&self, record: &DnsRecord) -> AppResult<()>;
}
