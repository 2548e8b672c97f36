use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Minimum trimmed length of a plausible RapidAPI key.
pub const MIN_API_KEY_LEN: usize = 20;

pub const DEFAULT_JOB_SEARCH_HOST: &str = "jsearch.p.rapidapi.com";
pub const DEFAULT_LOCAL_BUSINESS_HOST: &str = "local-business-data.p.rapidapi.com";

/// Third-party API a credential profile is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceType {
    JobSearch,
    LocalBusiness,
}

impl ServiceType {
    pub fn default_host(self) -> &'static str {
        match self {
            ServiceType::JobSearch => DEFAULT_JOB_SEARCH_HOST,
            ServiceType::LocalBusiness => DEFAULT_LOCAL_BUSINESS_HOST,
        }
    }

    /// Human label used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            ServiceType::JobSearch => "Job Search",
            ServiceType::LocalBusiness => "Local Business",
        }
    }
}

/// A named API key plus quota metadata, as persisted in the credential store.
///
/// Field names serialize in camelCase so stores written by the browser
/// dashboard load unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyProfile {
    pub id: String,
    pub name: String,
    pub host: String,
    pub api_key: String,
    pub credits_per_month: u64,
    pub credits_used: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpm_limit: Option<u32>,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<ServiceType>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Display bucket for the quota bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageLevel {
    Normal,
    Warning,
    Critical,
}

impl UsageLevel {
    pub fn from_percentage(pct: f64) -> Self {
        if pct >= 90.0 {
            UsageLevel::Critical
        } else if pct >= 75.0 {
            UsageLevel::Warning
        } else {
            UsageLevel::Normal
        }
    }
}

impl ApiKeyProfile {
    /// Explicit service type, otherwise inferred from the host name.
    pub fn service_type(&self) -> ServiceType {
        if let Some(service) = self.service_type {
            return service;
        }
        if self.host.contains("local-business") {
            ServiceType::LocalBusiness
        } else {
            ServiceType::JobSearch
        }
    }

    /// Host to call, falling back to the service default when unset.
    pub fn effective_host(&self) -> &str {
        if self.host.trim().is_empty() {
            self.service_type().default_host()
        } else {
            self.host.trim()
        }
    }

    pub fn usage_percentage(&self) -> f64 {
        clamp_percentage(self.credits_used, self.credits_per_month)
    }

    pub fn usage_level(&self) -> UsageLevel {
        UsageLevel::from_percentage(self.usage_percentage())
    }

    /// Masked copy safe to return from the API.
    pub fn to_view(&self) -> ApiKeyView {
        ApiKeyView {
            id: self.id.clone(),
            name: self.name.clone(),
            host: self.host.clone(),
            api_key: mask_secret(&self.api_key),
            credits_per_month: self.credits_per_month,
            credits_used: self.credits_used,
            rpm_limit: self.rpm_limit,
            is_active: self.is_active,
            service_type: self.service_type(),
            usage_percentage: self.usage_percentage(),
            usage_level: self.usage_level(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Profile as shown to API clients: secret masked, derived usage included.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyView {
    pub id: String,
    pub name: String,
    pub host: String,
    pub api_key: String,
    pub credits_per_month: u64,
    pub credits_used: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpm_limit: Option<u32>,
    pub is_active: bool,
    pub service_type: ServiceType,
    pub usage_percentage: f64,
    pub usage_level: UsageLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a profile; id, usage and timestamps are assigned by the store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApiKey {
    pub name: String,
    pub host: String,
    pub api_key: String,
    pub credits_per_month: u64,
    #[serde(default)]
    pub rpm_limit: Option<u32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub service_type: Option<ServiceType>,
}

fn default_true() -> bool {
    true
}

/// Partial update. An empty `api_key` keeps the stored secret.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyUpdate {
    pub name: Option<String>,
    pub host: Option<String>,
    pub api_key: Option<String>,
    pub credits_per_month: Option<u64>,
    /// Negative values are stored as zero.
    pub credits_used: Option<i64>,
    /// Absent keeps the limit; `null` or `0` removes it.
    #[serde(default, deserialize_with = "present")]
    pub rpm_limit: Option<Option<u32>>,
    pub is_active: Option<bool>,
    pub service_type: Option<ServiceType>,
}

/// Distinguishes an explicit `null` from a missing field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Aggregate quota figures across every stored profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeySummary {
    pub total_credits: u64,
    pub credits_used: u64,
    pub active_accounts: usize,
    pub usage_percentage: f64,
}

impl ApiKeySummary {
    pub fn from_profiles(profiles: &[ApiKeyProfile]) -> Self {
        let total_credits = profiles.iter().map(|p| p.credits_per_month).sum();
        let credits_used = profiles.iter().map(|p| p.credits_used).sum();
        let active_accounts = profiles.iter().filter(|p| p.is_active).count();

        Self {
            total_credits,
            credits_used,
            active_accounts,
            usage_percentage: clamp_percentage(credits_used, total_credits),
        }
    }
}

/// Reasonable-format check: at least `MIN_API_KEY_LEN` characters once trimmed.
pub fn validate_api_key(key: &str) -> bool {
    key.trim().chars().count() >= MIN_API_KEY_LEN
}

/// Keeps the first and last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}

fn clamp_percentage(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (used as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}
