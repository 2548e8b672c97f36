use crate::business_models::LocalBusinessDisplay;
use crate::config::redact_url;
use crate::errors::AppError;
use crate::job_models::JobDisplay;
use crate::webhook_models::*;
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// A record kind that can be relayed one-per-request to a webhook.
pub trait RelayRecord {
    type Payload: Serialize;

    /// Singular noun used in log lines.
    const NOUN: &'static str;
    /// Counted label used in summary messages.
    const PLURAL: &'static str;

    fn payload(&self) -> Self::Payload;
    fn label(&self) -> RecordLabel;
}

impl RelayRecord for JobDisplay {
    type Payload = JobWebhookPayload;
    const NOUN: &'static str = "job";
    const PLURAL: &'static str = "job(s)";

    fn payload(&self) -> Self::Payload {
        JobWebhookPayload::from(self)
    }

    fn label(&self) -> RecordLabel {
        RecordLabel::JobTitle(self.job_title.clone())
    }
}

impl RelayRecord for LocalBusinessDisplay {
    type Payload = BusinessWebhookPayload;
    const NOUN: &'static str = "business";
    const PLURAL: &'static str = "business(es)";

    fn payload(&self) -> Self::Payload {
        BusinessWebhookPayload::from(self)
    }

    fn label(&self) -> RecordLabel {
        RecordLabel::BusinessName(self.name.clone())
    }
}

enum DispatchFailure {
    /// The webhook answered with a non-success status.
    Rejected(String),
    /// No response was received.
    Transport(String),
}

/// Forwards records to an ingestion webhook, one HTTP call per record.
///
/// Calls are strictly sequential with a fixed pause between them; a failed
/// record is recorded and the batch continues.
#[derive(Clone)]
pub struct WebhookRelay {
    client: reqwest::Client,
    delay: Duration,
}

impl WebhookRelay {
    pub fn new(timeout: Duration, delay: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::external(format!("Failed to create webhook client: {}", e)))?;

        Ok(Self { client, delay })
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Checks a batch before anything is sent.
    pub fn validate<R>(records: &[R], webhook_url: &str) -> Result<Url, AppError> {
        if records.is_empty() {
            return Err(AppError::BadRequest("No data to send".to_string()));
        }
        if webhook_url.trim().is_empty() {
            return Err(AppError::BadRequest("Webhook URL is required".to_string()));
        }
        Url::parse(webhook_url.trim())
            .map_err(|_| AppError::BadRequest("Invalid webhook URL format".to_string()))
    }

    /// Sends every record and tallies the outcomes.
    ///
    /// Only validation problems return `Err`; per-record failures are reported
    /// in the summary.
    pub async fn relay<R: RelayRecord>(
        &self,
        records: &[R],
        webhook_url: &str,
    ) -> Result<RelaySummary, AppError> {
        let url = Self::validate(records, webhook_url)?;
        tracing::info!(
            "Relaying {} {} to {}",
            records.len(),
            R::PLURAL,
            redact_url(url.as_str())
        );

        let mut results = Vec::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            let label = record.label();

            match self.dispatch(&url, &record.payload()).await {
                Ok(()) => results.push(DispatchOutcome::ok(label)),
                Err(DispatchFailure::Rejected(error)) => {
                    tracing::warn!("Webhook rejected {} #{}: {}", R::NOUN, index, error);
                    results.push(DispatchOutcome::failed(label, error));
                }
                Err(DispatchFailure::Transport(error)) => {
                    tracing::error!("Webhook request for {} #{} failed: {}", R::NOUN, index, error);
                    results.push(DispatchOutcome::failed(label, error));
                    // No pause after a request that never got a response
                    continue;
                }
            }

            if index + 1 < records.len() && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        let summary = RelaySummary::from_outcomes(R::PLURAL, results);
        tracing::info!("{}", summary.message);
        Ok(summary)
    }

    async fn dispatch<P: Serialize>(&self, url: &Url, payload: &P) -> Result<(), DispatchFailure> {
        let response = self
            .client
            .post(url.clone())
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| DispatchFailure::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DispatchFailure::Rejected(format!(
                "Status {}: {}",
                status, error_text
            )));
        }

        Ok(())
    }
}
