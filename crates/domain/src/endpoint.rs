use std::net::IpAddr;

use ondemand_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// Default time-to-live for the published server record.
pub const DEFAULT_DNS_RECORD_TTL_SECONDS: u32 = 30;

/// Notification that the platform moved a workload task to running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadRunningEvent {
    cluster_id: NonEmptyString,
    task_id: NonEmptyString,
}

impl WorkloadRunningEvent {
    /// Creates a validated running event.
    pub fn new(cluster_id: impl Into<String>, task_id: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            cluster_id: NonEmptyString::new(cluster_id)?,
            task_id: NonEmptyString::new(task_id)?,
        })
    }

    /// Returns cluster identifier.
    #[must_use]
    pub fn cluster_id(&self) -> &str {
        self.cluster_id.as_str()
    }

    /// Returns task identifier.
    #[must_use]
    pub fn task_id(&self) -> &str {
        self.task_id.as_str()
    }
}

/// Address record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DnsRecordType {
    /// IPv4 address record.
    A,
    /// IPv6 address record.
    Aaaa,
}

impl DnsRecordType {
    /// Returns the record type matching the address family.
    #[must_use]
    pub fn for_address(address: IpAddr) -> Self {
        match address {
            IpAddr::V4(_) => Self::A,
            IpAddr::V6(_) => Self::Aaaa,
        }
    }

    /// Returns wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
        }
    }
}

/// Address record pointing the fixed server name at the workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    name: NonEmptyString,
    address: IpAddr,
    ttl_seconds: u32,
}

impl DnsRecord {
    /// Creates a validated record.
    pub fn new(name: impl Into<String>, address: IpAddr, ttl_seconds: u32) -> AppResult<Self> {
        if ttl_seconds == 0 {
            return Err(AppError::Validation(
                "dns record ttl_seconds must be greater than zero".to_owned(),
            ));
        }

        let name = name.into().trim().trim_end_matches('.').to_ascii_lowercase();

        Ok(Self {
            name: NonEmptyString::new(name)?,
            address,
            ttl_seconds,
        })
    }

    /// Returns normalized record name without trailing dot.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the published address.
    #[must_use]
    pub fn address(&self) -> IpAddr {
        self.address
    }

    /// Returns record time-to-live.
    #[must_use]
    pub fn ttl_seconds(&self) -> u32 {
        self.ttl_seconds
    }

    /// Returns record type derived from the address family.
    #[must_use]
    pub fn record_type(&self) -> DnsRecordType {
        DnsRecordType::for_address(self.address)
    }
}
