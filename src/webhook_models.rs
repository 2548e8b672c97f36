use crate::business_models::LocalBusinessDisplay;
use crate::job_models::JobDisplay;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/clay-webhook`.
#[derive(Debug, Clone, Deserialize)]
pub struct JobRelayRequest {
    #[serde(default)]
    pub jobs: Vec<JobDisplay>,
    #[serde(rename = "webhookUrl", default)]
    pub webhook_url: Option<String>,
}

/// Body of `POST /api/clay-webhook-businesses`.
#[derive(Debug, Clone, Deserialize)]
pub struct BusinessRelayRequest {
    #[serde(default)]
    pub businesses: Vec<LocalBusinessDisplay>,
    #[serde(rename = "webhookUrl", default)]
    pub webhook_url: Option<String>,
}

/// JSON sent to the webhook for one job (one job = one row in Clay).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobWebhookPayload {
    pub job_title: String,
    pub employer_name: String,
    pub employer_website: Option<String>,
    pub job_employment_type: String,
    pub job_apply_link: String,
    pub job_country: String,
}

impl From<&JobDisplay> for JobWebhookPayload {
    fn from(job: &JobDisplay) -> Self {
        Self {
            job_title: job.job_title.clone(),
            employer_name: job.employer_name.clone(),
            employer_website: job.employer_website.clone(),
            job_employment_type: job.job_employment_type.clone(),
            job_apply_link: job.job_apply_link.clone(),
            job_country: job.job_country.clone(),
        }
    }
}

/// JSON sent to the webhook for one business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessWebhookPayload {
    pub business_name: String,
    pub address: String,
    pub phone_number: Option<String>,
    pub rating: f64,
    pub review_count: u64,
    pub business_type: String,
    /// Subtypes joined with `", "`.
    pub subtypes: String,
    pub business_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zipcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    pub place_link: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opening_status: Option<String>,
}

impl From<&LocalBusinessDisplay> for BusinessWebhookPayload {
    fn from(b: &LocalBusinessDisplay) -> Self {
        Self {
            business_name: b.name.clone(),
            address: b.best_address().to_string(),
            phone_number: b.phone_number.clone(),
            rating: b.rating,
            review_count: b.review_count,
            business_type: b.business_type.clone(),
            subtypes: b.subtypes.join(", "),
            business_status: b.business_status.clone(),
            website: b.website.clone(),
            verified: b.verified,
            city: b.city.clone(),
            state: b.state.clone(),
            country: b.country.clone(),
            zipcode: b.zipcode.clone(),
            district: b.district.clone(),
            place_link: b.place_link.clone(),
            latitude: b.latitude,
            longitude: b.longitude,
            opening_status: b.opening_status.clone(),
        }
    }
}

/// Which record an outcome belongs to; serialized as `job_title` or `business_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordLabel {
    JobTitle(String),
    BusinessName(String),
}

/// Result of relaying a single record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    #[serde(flatten)]
    pub label: RecordLabel,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchOutcome {
    pub fn ok(label: RecordLabel) -> Self {
        Self {
            label,
            success: true,
            error: None,
        }
    }

    pub fn failed(label: RecordLabel, error: impl Into<String>) -> Self {
        Self {
            label,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Response of a relay batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelaySummary {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<DispatchOutcome>>,
}

impl RelaySummary {
    /// Aggregates per-record outcomes. `plural` is the counted label ("job(s)", "business(es)").
    pub fn from_outcomes(plural: &str, results: Vec<DispatchOutcome>) -> Self {
        let success_count = results.iter().filter(|r| r.success).count();
        let failure_count = results.len() - success_count;

        let (success, message) = if failure_count == 0 {
            (
                true,
                format!(
                    "Successfully sent {} {} to Clay.com (each as a separate webhook)",
                    success_count, plural
                ),
            )
        } else if success_count == 0 {
            (
                false,
                format!("Failed to send all {} {} to Clay.com", failure_count, plural),
            )
        } else {
            (
                true,
                format!(
                    "Sent {} {} successfully, {} failed",
                    success_count, plural, failure_count
                ),
            )
        };

        Self {
            success,
            message,
            success_count: Some(success_count),
            failure_count: Some(failure_count),
            results: Some(results),
        }
    }

    /// Batch refused before any record was sent.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            success_count: None,
            failure_count: None,
            results: None,
        }
    }

    /// True when at least one record was attempted and none succeeded.
    pub fn all_failed(&self) -> bool {
        self.success_count == Some(0) && self.failure_count.unwrap_or(0) > 0
    }
}
