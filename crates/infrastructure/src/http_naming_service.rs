use async_trait::async_trait;
use ondemand_application::NamingService;
use ondemand_core::{AppError, AppResult};
use ondemand_domain::DnsRecord;
use serde_json::{Value, json};

/// HTTP adapter for the hosted-zone change API.
#[derive(Clone)]
pub struct HttpNamingService {
    http_client: reqwest::Client,
    base_url: reqwest::Url,
    zone_id: String,
    api_token: Option<String>,
}

impl HttpNamingService {
    /// Creates a naming service adapter for one hosted zone.
    pub fn new(
        http_client: reqwest::Client,
        base_url: &str,
        zone_id: impl Into<String>,
        api_token: Option<String>,
    ) -> AppResult<Self> {
        let base_url = reqwest::Url::parse(base_url).map_err(|error| {
            AppError::Validation(format!(
                "invalid naming service base url '{base_url}': {error}"
            ))
        })?;
        let zone_id = zone_id.into();
        if zone_id.trim().is_empty() {
            return Err(AppError::Validation(
                "naming service zone id must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            http_client,
            base_url,
            zone_id,
            api_token,
        })
    }

    fn changes_url(&self) -> AppResult<reqwest::Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                AppError::Validation("naming service base url cannot carry a path".to_owned())
            })?
            .pop_if_empty()
            .extend(["zones", self.zone_id.as_str(), "changes"]);
        Ok(url)
    }
}

fn upsert_change_payload(record: &DnsRecord) -> Value {
    json!({
        "changes": [{
            "action": "UPSERT",
            "record": {
                "name": record.name(),
                "type": record.record_type().as_str(),
                "ttl": record.ttl_seconds(),
                "records": [{ "value": record.address().to_string() }],
            },
        }],
    })
}

#[async_trait]
impl NamingService for HttpNamingService {
    async fn upsert_record(&self, record: &DnsRecord) -> AppResult<()> {
        let mut builder = self
            .http_client
            .post(self.changes_url()?)
            .json(&upsert_change_payload(record));
        if let Some(token) = self.api_token.as_deref() {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|error| {
            AppError::NamingUpdateFailed(format!(
                "failed to upsert record '{}': {error}",
                record.name()
            ))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response body unavailable>".to_owned());
            return Err(AppError::NamingUpdateFailed(format!(
                "upsert of record '{}' failed with status {status}: {body}",
                record.name()
            )));
        }

        Ok(())
    }
}
