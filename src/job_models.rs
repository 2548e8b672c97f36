use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `date_posted` filter accepted by JSearch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatePosted {
    #[serde(rename = "all")]
    All,
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "3days")]
    ThreeDays,
    #[serde(rename = "week")]
    Week,
    #[serde(rename = "month")]
    Month,
}

impl DatePosted {
    pub fn as_str(self) -> &'static str {
        match self {
            DatePosted::All => "all",
            DatePosted::Today => "today",
            DatePosted::ThreeDays => "3days",
            DatePosted::Week => "week",
            DatePosted::Month => "month",
        }
    }
}

/// Query for `GET /search` on JSearch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobSearchParams {
    pub query: String,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub num_pages: Option<u32>,
    #[serde(default)]
    pub date_posted: Option<DatePosted>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub work_from_home: Option<bool>,
    #[serde(default)]
    pub employment_types: Option<String>,
    #[serde(default)]
    pub job_requirements: Option<String>,
    #[serde(default)]
    pub radius: Option<f64>,
    #[serde(default)]
    pub exclude_job_publishers: Option<String>,
    #[serde(default)]
    pub fields: Option<String>,
}

impl JobSearchParams {
    /// Query pairs in the order the provider documents them.
    ///
    /// Empty strings are dropped; `fields` is trimmed per entry and omitted
    /// entirely when no entry survives.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("query", self.query.clone())];

        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(num_pages) = self.num_pages {
            pairs.push(("num_pages", num_pages.to_string()));
        }
        push_non_empty(&mut pairs, "country", self.country.as_deref());
        push_non_empty(&mut pairs, "language", self.language.as_deref());
        if let Some(date_posted) = self.date_posted {
            pairs.push(("date_posted", date_posted.as_str().to_string()));
        }
        if let Some(wfh) = self.work_from_home {
            pairs.push(("work_from_home", wfh.to_string()));
        }
        push_non_empty(&mut pairs, "employment_types", self.employment_types.as_deref());
        push_non_empty(&mut pairs, "job_requirements", self.job_requirements.as_deref());
        if let Some(radius) = self.radius {
            pairs.push(("radius", radius.to_string()));
        }
        push_non_empty(
            &mut pairs,
            "exclude_job_publishers",
            self.exclude_job_publishers.as_deref(),
        );
        if let Some(fields) = self.sanitized_fields() {
            pairs.push(("fields", fields));
        }

        pairs
    }

    /// Comma-separated field list with whitespace and empty entries removed.
    pub fn sanitized_fields(&self) -> Option<String> {
        let fields = self.fields.as_deref()?;
        let cleaned = fields
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .collect::<Vec<_>>()
            .join(",");
        (!cleaned.is_empty()).then_some(cleaned)
    }
}

pub(crate) fn push_non_empty(
    pairs: &mut Vec<(&'static str, String)>,
    name: &'static str,
    value: Option<&str>,
) {
    if let Some(v) = value.filter(|v| !v.is_empty()) {
        pairs.push((name, v.to_string()));
    }
}

/// Raw JSearch response; records stay untyped until converted for display.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobSearchResponse {
    pub status: String,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub parameters: Value,
    #[serde(default)]
    pub data: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ApplyOption {
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub apply_link: String,
    #[serde(default)]
    pub is_direct: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct JobHighlights {
    #[serde(rename = "Qualifications", default)]
    pub qualifications: Vec<String>,
    #[serde(rename = "Benefits", default)]
    pub benefits: Vec<String>,
    #[serde(rename = "Responsibilities", default)]
    pub responsibilities: Vec<String>,
}

/// Display record for a job listing: every field present, defaults filled in.
///
/// Deserializing goes through [`JobDisplay::from_raw`], so partial records
/// posted by clients are accepted.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(from = "Value")]
pub struct JobDisplay {
    pub job_id: String,
    pub job_title: String,
    pub employer_name: String,
    pub employer_logo: Option<String>,
    pub employer_website: Option<String>,
    pub job_publisher: String,
    pub job_employment_type: String,
    pub job_employment_types: Vec<String>,
    pub job_apply_link: String,
    pub job_apply_is_direct: bool,
    pub apply_options: Vec<ApplyOption>,
    pub job_description: String,
    pub job_is_remote: bool,
    pub job_posted_at: String,
    pub job_posted_at_timestamp: i64,
    pub job_posted_at_datetime_utc: String,
    pub job_location: String,
    pub job_city: String,
    pub job_state: String,
    pub job_country: String,
    pub job_latitude: f64,
    pub job_longitude: f64,
    pub job_benefits: Option<Vec<String>>,
    pub job_google_link: String,
    pub job_salary: Option<f64>,
    pub job_min_salary: Option<f64>,
    pub job_max_salary: Option<f64>,
    pub job_salary_period: Option<String>,
    pub job_highlights: JobHighlights,
    pub job_onet_soc: String,
    pub job_onet_job_zone: String,
}

impl From<Value> for JobDisplay {
    fn from(value: Value) -> Self {
        Self::from_raw(&value)
    }
}

impl JobDisplay {
    /// Converts a provider record, tolerating missing, null and mistyped fields.
    pub fn from_raw(job: &Value) -> Self {
        Self {
            job_id: str_or_empty(job, "job_id"),
            job_title: str_or_empty(job, "job_title"),
            employer_name: str_or_empty(job, "employer_name"),
            employer_logo: opt_str(job, "employer_logo"),
            employer_website: opt_str(job, "employer_website"),
            job_publisher: str_or_empty(job, "job_publisher"),
            job_employment_type: str_or_empty(job, "job_employment_type"),
            job_employment_types: string_list(job.get("job_employment_types")).unwrap_or_default(),
            job_apply_link: str_or_empty(job, "job_apply_link"),
            job_apply_is_direct: bool_or_false(job, "job_apply_is_direct"),
            apply_options: apply_options(job.get("apply_options")),
            job_description: str_or_empty(job, "job_description"),
            job_is_remote: bool_or_false(job, "job_is_remote"),
            job_posted_at: str_or_empty(job, "job_posted_at"),
            job_posted_at_timestamp: job
                .get("job_posted_at_timestamp")
                .and_then(Value::as_i64)
                .unwrap_or(0),
            job_posted_at_datetime_utc: str_or_empty(job, "job_posted_at_datetime_utc"),
            job_location: str_or_empty(job, "job_location"),
            job_city: str_or_empty(job, "job_city"),
            job_state: str_or_empty(job, "job_state"),
            job_country: str_or_empty(job, "job_country"),
            job_latitude: job.get("job_latitude").and_then(Value::as_f64).unwrap_or(0.0),
            job_longitude: job.get("job_longitude").and_then(Value::as_f64).unwrap_or(0.0),
            job_benefits: string_list(job.get("job_benefits")),
            job_google_link: str_or_empty(job, "job_google_link"),
            job_salary: job.get("job_salary").and_then(Value::as_f64),
            job_min_salary: job.get("job_min_salary").and_then(Value::as_f64),
            job_max_salary: job.get("job_max_salary").and_then(Value::as_f64),
            job_salary_period: opt_str(job, "job_salary_period"),
            job_highlights: highlights(job.get("job_highlights")),
            job_onet_soc: str_or_empty(job, "job_onet_soc"),
            job_onet_job_zone: str_or_empty(job, "job_onet_job_zone"),
        }
    }
}

/// Non-null value rendered as a string; numbers and booleans are stringified.
pub(crate) fn opt_str(record: &Value, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

pub(crate) fn str_or_empty(record: &Value, key: &str) -> String {
    opt_str(record, key).unwrap_or_default()
}

pub(crate) fn bool_or_false(record: &Value, key: &str) -> bool {
    record.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Array of strings; non-string entries are dropped. `None` when not an array.
pub(crate) fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    let items = value?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
    )
}

fn apply_options(value: Option<&Value>) -> Vec<ApplyOption> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

fn highlights(value: Option<&Value>) -> JobHighlights {
    match value {
        Some(h) if h.is_object() => JobHighlights {
            qualifications: string_list(h.get("Qualifications")).unwrap_or_default(),
            benefits: string_list(h.get("Benefits")).unwrap_or_default(),
            responsibilities: string_list(h.get("Responsibilities")).unwrap_or_default(),
        },
        _ => JobHighlights::default(),
    }
}
