use crate::business_models::{
    LocalBusinessDisplay, LocalBusinessSearchParams, LocalBusinessSearchResponse,
};
use crate::credential_models::{ApiKeyProfile, ServiceType};
use crate::credential_store::{mutate, SharedCredentialStore};
use crate::errors::AppError;
use crate::job_models::{JobDisplay, JobSearchParams, JobSearchResponse};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

const INVALID_KEY_MESSAGE: &str = "Invalid API key. Please check your RapidAPI key.";
const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Please try again later.";
const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your internet connection.";

/// Non-success answer from a RapidAPI provider, before it is mapped to `AppError`.
#[derive(Debug, Clone)]
pub struct ProviderFailure {
    pub status: StatusCode,
    pub message: String,
    /// Parsed error body, when it was JSON.
    pub details: Option<Value>,
}

/// Shared HTTP plumbing for RapidAPI-hosted search endpoints.
#[derive(Clone)]
pub struct RapidApiClient {
    client: Client,
    store: SharedCredentialStore,
}

impl RapidApiClient {
    pub fn new(store: SharedCredentialStore, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::external(format!("Failed to create RapidAPI client: {}", e)))?;

        Ok(Self { client, store })
    }

    /// `https://{host}` unless the host already carries a scheme.
    pub fn base_url(host: &str) -> String {
        let host = host.trim().trim_end_matches('/');
        if host.starts_with("http") {
            host.to_string()
        } else {
            format!("https://{}", host)
        }
    }

    /// First active profile for `service`, with a message that says what is missing.
    pub async fn resolve_credential(
        &self,
        service: ServiceType,
    ) -> Result<ApiKeyProfile, AppError> {
        let store = self.store.lock().await;
        let profiles = store.by_service(service);

        if profiles.is_empty() {
            return Err(AppError::ApiKey(format!(
                "{} API key is not configured. Please add your RapidAPI key in Settings.",
                service.label()
            )));
        }

        profiles.into_iter().find(|p| p.is_active).ok_or_else(|| {
            AppError::ApiKey(format!(
                "No active {} API key found. Please activate an API key.",
                service.label()
            ))
        })
    }

    /// Runs `GET {base}/search` with the profile's credential.
    ///
    /// Returns the decoded body on success, or the raw failure so callers can
    /// tailor the error message.
    pub async fn search<T: DeserializeOwned>(
        &self,
        credential: &ApiKeyProfile,
        query: &[(&'static str, String)],
    ) -> Result<Result<T, ProviderFailure>, AppError> {
        let host = credential.effective_host();
        let endpoint = format!("{}/search", Self::base_url(host));
        let url = reqwest::Url::parse_with_params(&endpoint, query)
            .map_err(|e| AppError::external(format!("Failed to build URL: {}", e)))?;

        // Query strings may carry user input; the key never appears in logs
        tracing::info!("Calling {} with profile {}", endpoint, credential.id);

        let response = self
            .client
            .get(url)
            .header("X-RapidAPI-Key", &credential.api_key)
            .header("X-RapidAPI-Host", host)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Request to {} failed: {}", endpoint, e);
                AppError::external(NETWORK_ERROR_MESSAGE)
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::external(format!("An unexpected error occurred: {}", e)))?;

        if !status.is_success() {
            let (message, details) = extract_error_message(&body, status);
            tracing::error!("API error from {}: {} {}", endpoint, status, message);
            return Ok(Err(ProviderFailure {
                status,
                message,
                details,
            }));
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| AppError::external(format!("An unexpected error occurred: {}", e)))?;
        let api_status = value.get("status").and_then(Value::as_str).unwrap_or("");
        if api_status != "OK" {
            return Err(AppError::external(format!("API returned status: {}", api_status)));
        }

        let decoded = serde_json::from_value(value)
            .map_err(|e| AppError::external(format!("An unexpected error occurred: {}", e)))?;

        self.record_usage(credential).await;
        Ok(Ok(decoded))
    }

    /// Usage bookkeeping only; a storage failure never fails the search.
    async fn record_usage(&self, credential: &ApiKeyProfile) {
        let id = credential.id.clone();
        if let Err(e) = mutate(&self.store, move |store| store.record_usage(&id)).await {
            tracing::warn!("Failed to record usage for {}: {}", credential.id, e);
        }
    }
}

/// Maps the status codes every provider shares; `None` for anything else.
fn common_failure(failure: &ProviderFailure) -> Option<AppError> {
    match failure.status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Some(AppError::ApiKey(INVALID_KEY_MESSAGE.to_string()))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            Some(AppError::RateLimited(RATE_LIMIT_MESSAGE.to_string()))
        }
        _ => None,
    }
}

/// Best human-readable message from an error body.
///
/// Looks at `message`, then `error` (string or object), then `errors[]`;
/// falls back to the raw text, then to a generic status line.
pub fn extract_error_message(body: &str, status: StatusCode) -> (String, Option<Value>) {
    let fallback = format!("API request failed with status {}", status.as_u16());

    let Ok(json) = serde_json::from_str::<Value>(body) else {
        let message = if body.trim().is_empty() {
            fallback
        } else {
            body.to_string()
        };
        return (message, None);
    };

    let message = if let Some(msg) = json.get("message").and_then(Value::as_str) {
        msg.to_string()
    } else if let Some(error) = json.get("error").filter(|e| !e.is_null()) {
        match error {
            Value::String(s) => s.clone(),
            other => other
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| other.to_string()),
        }
    } else if let Some(errors) = json
        .get("errors")
        .and_then(Value::as_array)
        .filter(|e| !e.is_empty())
    {
        errors
            .iter()
            .map(|e| match e.get("message").and_then(Value::as_str) {
                Some(m) => m.to_string(),
                None => e.as_str().map(str::to_string).unwrap_or_else(|| e.to_string()),
            })
            .collect::<Vec<_>>()
            .join(", ")
    } else {
        fallback
    };

    (message, Some(json))
}

/// Client for the JSearch job-listings API.
#[derive(Clone)]
pub struct JobSearchService {
    api: RapidApiClient,
}

impl JobSearchService {
    pub fn new(api: RapidApiClient) -> Self {
        Self { api }
    }

    pub async fn search(&self, params: &JobSearchParams) -> Result<JobSearchResponse, AppError> {
        if params.query.trim().is_empty() {
            return Err(AppError::BadRequest("Search query is required".to_string()));
        }

        let credential = self.api.resolve_credential(ServiceType::JobSearch).await?;
        if let Some(fields) = params.sanitized_fields() {
            tracing::debug!("Fields parameter: {}", fields);
        }

        match self.api.search(&credential, &params.to_query_pairs()).await? {
            Ok(response) => Ok(response),
            Err(failure) => Err(Self::map_failure(failure, params)),
        }
    }

    /// Searches and converts every record to its display form.
    pub async fn search_display(
        &self,
        params: &JobSearchParams,
    ) -> Result<Vec<JobDisplay>, AppError> {
        let response = self.search(params).await?;
        tracing::info!("Job search returned {} record(s)", response.data.len());
        Ok(response.data.iter().map(JobDisplay::from_raw).collect())
    }

    /// 400s get a hint about the `fields` parameter, the most common cause.
    fn map_failure(failure: ProviderFailure, params: &JobSearchParams) -> AppError {
        if let Some(err) = common_failure(&failure) {
            return err;
        }

        let status = failure.status.as_u16();
        if failure.status != StatusCode::BAD_REQUEST {
            return AppError::ExternalApiError {
                message: failure.message,
                status: Some(status),
            };
        }

        let lower = failure.message.to_lowercase();
        let details = failure.details.as_ref();
        let names_fields = details.is_some_and(|d| {
            d.get("param").and_then(Value::as_str) == Some("fields")
                || d.get("field").is_some_and(|f| !f.is_null() && f != &Value::Bool(false))
                || d.as_str().is_some_and(|s| s.to_lowercase().contains("field"))
        });
        let is_fields_error = lower.contains("field") || lower.contains("invalid") || names_fields;

        let message = match (is_fields_error, params.fields.as_deref().filter(|f| !f.is_empty())) {
            (true, Some(fields)) => format!(
                "{} (Fields parameter: {}). Some field names may not be supported by the API. Try selecting fewer fields or different fields.",
                failure.message, fields
            ),
            _ => match details.and_then(|d| d.get("param")).and_then(Value::as_str) {
                Some(param) => format!("{} (Parameter: {})", failure.message, param),
                None => failure.message,
            },
        };

        AppError::ExternalApiError {
            message,
            status: Some(status),
        }
    }
}

/// Client for the Local Business Data API.
#[derive(Clone)]
pub struct LocalBusinessService {
    api: RapidApiClient,
}

impl LocalBusinessService {
    pub fn new(api: RapidApiClient) -> Self {
        Self { api }
    }

    pub async fn search(
        &self,
        params: &LocalBusinessSearchParams,
    ) -> Result<LocalBusinessSearchResponse, AppError> {
        if params.query.trim().is_empty() {
            return Err(AppError::BadRequest("Search query is required".to_string()));
        }

        let credential = self.api.resolve_credential(ServiceType::LocalBusiness).await?;

        match self.api.search(&credential, &params.to_query_pairs()).await? {
            Ok(response) => Ok(response),
            Err(failure) => Err(Self::map_failure(failure)),
        }
    }

    /// Only a JSON `message` is surfaced; other bodies get the generic status line.
    fn map_failure(failure: ProviderFailure) -> AppError {
        if let Some(err) = common_failure(&failure) {
            return err;
        }

        let status = failure.status.as_u16();
        let message = failure
            .details
            .as_ref()
            .and_then(|d| d.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("API request failed with status {}", status));

        AppError::ExternalApiError {
            message,
            status: Some(status),
        }
    }

    pub async fn search_display(
        &self,
        params: &LocalBusinessSearchParams,
    ) -> Result<Vec<LocalBusinessDisplay>, AppError> {
        let response = self.search(params).await?;
        tracing::info!("Local business search returned {} record(s)", response.data.len());
        Ok(response.data.iter().map(LocalBusinessDisplay::from_raw).collect())
    }
}
