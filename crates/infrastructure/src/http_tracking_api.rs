//! HTTP adapter over the upstream tracking and alert API.

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use stocklens_application::{AlertSource, AuditTrailSource, TrackingQuery};
use stocklens_core::{AppError, AppResult};
use stocklens_domain::{AlertFeed, AlertKind, AlertSnapshot, AlertThresholds, AuditRecord};
use tracing::debug;
use url::Url;

/// Read-only client for `GET /tracking` and `GET /alerts`.
#[derive(Clone)]
pub struct HttpTrackingApi {
    http_client: reqwest::Client,
    base_url: Url,
    bearer_token: Option<String>,
}

impl HttpTrackingApi {
    /// Creates a client rooted at `base_url`, e.g. `http://host/api`.
    #[must_use]
    pub fn new(http_client: reqwest::Client, base_url: Url) -> Self {
        Self {
            http_client,
            base_url,
            bearer_token: None,
        }
    }

    /// Sends `Authorization: Bearer <token>` with every request.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    fn endpoint(&self, resource: &str) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                AppError::Validation(format!(
                    "tracking api base url '{}' cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push(resource);
        Ok(url)
    }

    fn tracking_url(&self, query: &TrackingQuery) -> AppResult<Url> {
        let mut url = self.endpoint("tracking")?;
        url.query_pairs_mut()
            .append_pair("entityId", query.entity_id.as_str())
            .append_pair("limit", query.limit.to_string().as_str());
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> AppResult<T> {
        let mut request = self.http_client.get(url.clone());
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|error| {
            AppError::Internal(format!("tracking api request to '{url}' failed: {error}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response body unavailable>".to_owned());
            return Err(AppError::Internal(format!(
                "tracking api request to '{url}' failed with status {status}: {body}"
            )));
        }

        response.json::<T>().await.map_err(|error| {
            AppError::Internal(format!(
                "tracking api response from '{url}' could not be decoded: {error}"
            ))
        })
    }
}

#[async_trait]
impl AuditTrailSource for HttpTrackingApi {
    async fn list_tracking_records(&self, query: TrackingQuery) -> AppResult<Vec<AuditRecord>> {
        let url = self.tracking_url(&query)?;
        let records = self
            .get_json::<TrackingResponse>(url)
            .await?
            .into_records();

        debug!(
            entity_id = %query.entity_id,
            record_count = records.len(),
            "fetched tracking records"
        );
        Ok(records)
    }
}

#[async_trait]
impl AlertSource for HttpTrackingApi {
    async fn fetch_alerts(&self) -> AppResult<AlertFeed> {
        let url = self.endpoint("alerts")?;
        let feed = self.get_json::<AlertsResponse>(url).await?.into_feed();

        debug!(alert_count = feed.alerts.len(), "fetched alert feed");
        Ok(feed)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TrackingResponse {
    Bare(Vec<AuditRecord>),
    Envelope { data: Vec<AuditRecord> },
}

impl TrackingResponse {
    fn into_records(self) -> Vec<AuditRecord> {
        match self {
            Self::Bare(records) | Self::Envelope { data: records } => records,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AlertsResponse {
    low_shade_alerts: Vec<AlertEntry>,
    high_shade_alerts: Vec<AlertEntry>,
    low_stocks: Vec<AlertEntry>,
    thresholds: AlertThresholds,
}

impl AlertsResponse {
    fn into_feed(self) -> AlertFeed {
        let alerts = self
            .low_shade_alerts
            .into_iter()
            .map(|entry| entry.into_snapshot(AlertKind::LowShade))
            .chain(
                self.high_shade_alerts
                    .into_iter()
                    .map(|entry| entry.into_snapshot(AlertKind::HighShade)),
            )
            .chain(
                self.low_stocks
                    .into_iter()
                    .map(|entry| entry.into_snapshot(AlertKind::LowStock)),
            )
            .collect();

        AlertFeed {
            alerts,
            thresholds: self.thresholds,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlertEntry {
    #[serde(alias = "stockId")]
    entity_id: String,
    #[serde(default)]
    shade_id: Option<String>,
    #[serde(default)]
    product: String,
    quantity: i64,
    #[serde(default)]
    code: Option<String>,
}

impl AlertEntry {
    fn into_snapshot(self, kind: AlertKind) -> AlertSnapshot {
        AlertSnapshot {
            kind,
            entity_id: self.entity_id,
            shade_id: self.shade_id,
            product: self.product,
            quantity: self.quantity,
            code: self.code,
        }
    }
}
