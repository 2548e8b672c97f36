//! CSV serialization of display records.
//!
//! Fields are quoted only when they contain a comma, a double quote or a
//! newline; lines are joined with `\n` and carry no trailing newline.

use crate::business_models::LocalBusinessDisplay;
use crate::job_models::JobDisplay;
use chrono::{DateTime, Utc};

pub const JOB_EXPORT_PREFIX: &str = "job-search-results";
pub const BUSINESS_EXPORT_PREFIX: &str = "local-business-results";

const JOB_HEADERS: [&str; 10] = [
    "Job Title",
    "Employer Name",
    "Employer Logo",
    "Employer Website",
    "Job Publisher",
    "Employment Type",
    "Country",
    "Job Posted At",
    "Job Description",
    "Source Link",
];

const BUSINESS_HEADERS: [&str; 14] = [
    "Business Name",
    "Address",
    "Phone Number",
    "Rating",
    "Review Count",
    "Type",
    "Subtypes",
    "Business Status",
    "Website",
    "City",
    "State",
    "Country",
    "Zipcode",
    "Place Link",
];

pub fn escape_csv_field(field: Option<&str>) -> String {
    let Some(value) = field else {
        return String::new();
    };

    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn render(headers: &[&str], rows: impl Iterator<Item = Vec<String>>) -> String {
    let mut lines = vec![headers.join(",")];
    lines.extend(rows.map(|row| row.join(",")));
    lines.join("\n")
}

pub fn jobs_to_csv(jobs: &[JobDisplay]) -> String {
    if jobs.is_empty() {
        return String::new();
    }

    let rows = jobs.iter().map(|job| {
        vec![
            escape_csv_field(Some(&job.job_title)),
            escape_csv_field(Some(&job.employer_name)),
            escape_csv_field(job.employer_logo.as_deref()),
            escape_csv_field(job.employer_website.as_deref()),
            escape_csv_field(Some(&job.job_publisher)),
            escape_csv_field(Some(&job.job_employment_type)),
            escape_csv_field(Some(&job.job_country)),
            escape_csv_field(Some(&job.job_posted_at)),
            escape_csv_field(Some(&job.job_description)),
            escape_csv_field(Some(&job.job_apply_link)),
        ]
    });

    render(&JOB_HEADERS, rows)
}

pub fn businesses_to_csv(businesses: &[LocalBusinessDisplay]) -> String {
    if businesses.is_empty() {
        return String::new();
    }

    let rows = businesses.iter().map(|b| {
        vec![
            escape_csv_field(Some(&b.name)),
            escape_csv_field(Some(b.best_address())),
            escape_csv_field(b.phone_number.as_deref()),
            escape_csv_field(Some(&b.rating.to_string())),
            escape_csv_field(Some(&b.review_count.to_string())),
            escape_csv_field(Some(&b.business_type)),
            escape_csv_field(Some(&b.subtypes.join(", "))),
            escape_csv_field(Some(&b.business_status)),
            escape_csv_field(b.website.as_deref()),
            escape_csv_field(b.city.as_deref()),
            escape_csv_field(b.state.as_deref()),
            escape_csv_field(b.country.as_deref()),
            escape_csv_field(b.zipcode.as_deref()),
            escape_csv_field(Some(&b.place_link)),
        ]
    });

    render(&BUSINESS_HEADERS, rows)
}

/// `{prefix}-YYYY-MM-DDTHH-MM-SS.csv`
pub fn export_filename(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}-{}.csv", prefix, now.format("%Y-%m-%dT%H-%M-%S"))
}
