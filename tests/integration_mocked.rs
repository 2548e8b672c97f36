/// Integration tests with mocked external APIs
/// Exercises the search clients and the webhook relay against wiremock servers
use leadscout::business_models::{LocalBusinessDisplay, LocalBusinessSearchParams};
use leadscout::credential_models::{NewApiKey, ServiceType};
use leadscout::credential_store::{CredentialStore, SharedCredentialStore};
use leadscout::errors::AppError;
use leadscout::job_models::{JobDisplay, JobSearchParams};
use leadscout::services::{JobSearchService, LocalBusinessService, RapidApiClient};
use leadscout::webhook_relay::WebhookRelay;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET: &str = "test-rapidapi-key-0123456789";

/// Store holding one active profile that points at the mock server
fn store_for(host: String, service: ServiceType) -> (SharedCredentialStore, String) {
    let mut store = CredentialStore::in_memory();
    let profile = store
        .add(NewApiKey {
            name: "mock".to_string(),
            host,
            api_key: SECRET.to_string(),
            credits_per_month: 100,
            rpm_limit: None,
            is_active: true,
            service_type: Some(service),
        })
        .unwrap();
    (store.into_shared(), profile.id)
}

fn job_params(query: &str) -> JobSearchParams {
    JobSearchParams {
        query: query.to_string(),
        page: Some(1),
        num_pages: Some(1),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_job_search_success_normalizes_records() {
    let mock_server = MockServer::start().await;

    let mock_response = serde_json::json!({
        "status": "OK",
        "request_id": "req-1",
        "parameters": {"query": "rust developer"},
        "data": [
            {
                "job_id": "1",
                "job_title": "Rust Developer",
                "employer_name": "Acme",
                "job_salary": null
            },
            {"job_id": "2", "job_title": "Backend Engineer"}
        ]
    });

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("query", "rust developer"))
        .and(query_param("page", "1"))
        .and(header("X-RapidAPI-Key", SECRET))
        .respond_with(ResponseTemplate::new(200).set_body_json(&mock_response))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (store, id) = store_for(mock_server.uri(), ServiceType::JobSearch);
    let api = RapidApiClient::new(store.clone(), Duration::from_secs(5)).unwrap();
    let service = JobSearchService::new(api);

    let jobs = service.search_display(&job_params("rust developer")).await.unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].employer_name, "Acme");
    assert_eq!(jobs[1].employer_name, "");

    // Usage is counted, not enforced
    assert_eq!(store.lock().await.get(&id).unwrap().credits_used, 1);
}

#[tokio::test]
async fn test_job_search_without_credentials() {
    let store = CredentialStore::in_memory().into_shared();
    let api = RapidApiClient::new(store, Duration::from_secs(5)).unwrap();
    let service = JobSearchService::new(api);

    let err = service.search(&job_params("anything")).await.unwrap_err();
    assert!(matches!(err, AppError::ApiKey(ref m) if m.contains("not configured")));
}

#[tokio::test]
async fn test_job_search_with_inactive_credential() {
    let (store, id) = store_for("jsearch.p.rapidapi.com".to_string(), ServiceType::JobSearch);
    store.lock().await.set_active(&id, false).unwrap();

    let api = RapidApiClient::new(store, Duration::from_secs(5)).unwrap();
    let err = JobSearchService::new(api)
        .search(&job_params("anything"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ApiKey(ref m) if m.contains("No active")));
}

#[tokio::test]
async fn test_job_search_invalid_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "message": "You are not subscribed to this API."
        })))
        .mount(&mock_server)
        .await;

    let (store, id) = store_for(mock_server.uri(), ServiceType::JobSearch);
    let api = RapidApiClient::new(store.clone(), Duration::from_secs(5)).unwrap();

    let err = JobSearchService::new(api)
        .search(&job_params("rust"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ApiKey(ref m) if m.starts_with("Invalid API key")));

    // Failed calls are not counted
    assert_eq!(store.lock().await.get(&id).unwrap().credits_used, 0);
}

#[tokio::test]
async fn test_job_search_rate_limited() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too many requests"))
        .mount(&mock_server)
        .await;

    let (store, _) = store_for(mock_server.uri(), ServiceType::JobSearch);
    let api = RapidApiClient::new(store, Duration::from_secs(5)).unwrap();

    let err = JobSearchService::new(api)
        .search(&job_params("rust"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::RateLimited(_)));
}

#[tokio::test]
async fn test_job_search_fields_error_is_explained() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("fields", "job_title,not_a_field"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": {"message": "Invalid fields requested"}
        })))
        .mount(&mock_server)
        .await;

    let (store, _) = store_for(mock_server.uri(), ServiceType::JobSearch);
    let api = RapidApiClient::new(store, Duration::from_secs(5)).unwrap();

    let mut params = job_params("rust");
    params.fields = Some("job_title, not_a_field,".to_string());

    let err = JobSearchService::new(api).search(&params).await.unwrap_err();
    assert_eq!(err.upstream_status(), Some(400));
    let text = err.to_string();
    assert!(text.contains("Invalid fields requested"));
    assert!(text.contains("Fields parameter"));
}

#[tokio::test]
async fn test_job_search_non_ok_status_in_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"status": "ERROR", "data": []})),
        )
        .mount(&mock_server)
        .await;

    let (store, _) = store_for(mock_server.uri(), ServiceType::JobSearch);
    let api = RapidApiClient::new(store, Duration::from_secs(5)).unwrap();

    let err = JobSearchService::new(api)
        .search(&job_params("rust"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("API returned status: ERROR"));
}

#[tokio::test]
async fn test_local_business_search_uses_business_profile() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("query", "coffee in seattle"))
        .and(query_param("limit", "5"))
        .and(query_param("extract_emails_and_contacts", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "OK",
            "data": [{
                "business_id": "0xabc",
                "name": "Bean There",
                "street_address": "12 Pike St",
                "full_address": "12 Pike St, Seattle, WA",
                "rating": 4.7,
                "review_count": 321,
                "type": "Coffee shop",
                "subtypes": ["Coffee shop", "Cafe"],
                "verified": true
            }]
        })))
        .mount(&mock_server)
        .await;

    let mut store = CredentialStore::in_memory();
    // A job-search profile must not be picked for business searches
    store
        .add(NewApiKey {
            name: "jobs".to_string(),
            host: "http://127.0.0.1:1".to_string(),
            api_key: SECRET.to_string(),
            credits_per_month: 100,
            rpm_limit: None,
            is_active: true,
            service_type: Some(ServiceType::JobSearch),
        })
        .unwrap();
    store
        .add(NewApiKey {
            name: "biz".to_string(),
            host: mock_server.uri(),
            api_key: SECRET.to_string(),
            credits_per_month: 100,
            rpm_limit: None,
            is_active: true,
            service_type: Some(ServiceType::LocalBusiness),
        })
        .unwrap();

    let api = RapidApiClient::new(store.into_shared(), Duration::from_secs(5)).unwrap();
    let service = LocalBusinessService::new(api);

    let params = LocalBusinessSearchParams {
        query: "coffee in seattle".to_string(),
        limit: Some(5),
        extract_emails_and_contacts: Some(false),
        ..Default::default()
    };
    let businesses = service.search_display(&params).await.unwrap();
    assert_eq!(businesses.len(), 1);
    assert_eq!(businesses[0].address, "12 Pike St");
    assert_eq!(businesses[0].name, "Bean There");
    assert_eq!(businesses[0].review_count, 321);
}

#[tokio::test]
async fn test_local_business_upstream_error_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
            "message": "Service temporarily unavailable"
        })))
        .mount(&mock_server)
        .await;

    let (store, _) = store_for(mock_server.uri(), ServiceType::LocalBusiness);
    let api = RapidApiClient::new(store, Duration::from_secs(5)).unwrap();

    let params = LocalBusinessSearchParams {
        query: "dentists".to_string(),
        ..Default::default()
    };
    let err = LocalBusinessService::new(api).search(&params).await.unwrap_err();
    assert_eq!(err.upstream_status(), Some(503));
    assert!(err.to_string().contains("Service temporarily unavailable"));
}

// ============ Webhook relay ============

fn jobs(titles: &[&str]) -> Vec<JobDisplay> {
    titles
        .iter()
        .map(|t| {
            JobDisplay::from_raw(&serde_json::json!({
                "job_title": t,
                "employer_name": "Acme",
                "job_employment_type": "Full-time",
                "job_apply_link": "https://apply.example",
                "job_country": "US"
            }))
        })
        .collect()
}

#[tokio::test]
async fn test_relay_sends_one_request_per_record() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_json(serde_json::json!({
            "job_title": "A",
            "employer_name": "Acme",
            "employer_website": null,
            "job_employment_type": "Full-time",
            "job_apply_link": "https://apply.example",
            "job_country": "US"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&mock_server)
        .await;

    let relay = WebhookRelay::new(Duration::from_secs(5), Duration::ZERO).unwrap();
    let summary = relay
        .relay(&jobs(&["A", "B", "C"]), &format!("{}/hook", mock_server.uri()))
        .await
        .unwrap();

    assert!(summary.success);
    assert_eq!(summary.success_count, Some(3));
    assert_eq!(summary.failure_count, Some(0));
    assert_eq!(
        summary.message,
        "Successfully sent 3 job(s) to Clay.com (each as a separate webhook)"
    );
}

#[tokio::test]
async fn test_relay_partial_failure_continues() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_json(serde_json::json!({
            "job_title": "Bad",
            "employer_name": "Acme",
            "employer_website": null,
            "job_employment_type": "Full-time",
            "job_apply_link": "https://apply.example",
            "job_country": "US"
        })))
        .respond_with(ResponseTemplate::new(422).set_body_string("missing column"))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let relay = WebhookRelay::new(Duration::from_secs(5), Duration::ZERO).unwrap();
    let summary = relay
        .relay(&jobs(&["Good", "Bad", "Also good"]), &format!("{}/hook", mock_server.uri()))
        .await
        .unwrap();

    assert!(summary.success);
    assert_eq!(summary.success_count, Some(2));
    assert_eq!(summary.failure_count, Some(1));
    assert_eq!(summary.message, "Sent 2 job(s) successfully, 1 failed");

    let results = summary.results.unwrap();
    assert!(!results[1].success);
    assert_eq!(results[1].error.as_deref(), Some("Status 422: missing column"));
}

#[tokio::test]
async fn test_relay_all_failed_businesses() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let businesses: Vec<LocalBusinessDisplay> = ["One", "Two"]
        .iter()
        .map(|n| LocalBusinessDisplay::from_raw(&serde_json::json!({"name": n})))
        .collect();

    let relay = WebhookRelay::new(Duration::from_secs(5), Duration::ZERO).unwrap();
    let summary = relay
        .relay(&businesses, &format!("{}/hook", mock_server.uri()))
        .await
        .unwrap();

    assert!(!summary.success);
    assert!(summary.all_failed());
    assert_eq!(summary.message, "Failed to send all 2 business(es) to Clay.com");
}

#[tokio::test]
async fn test_relay_waits_between_records() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&mock_server)
        .await;

    let relay = WebhookRelay::new(Duration::from_secs(5), Duration::from_millis(50)).unwrap();
    let started = std::time::Instant::now();
    relay
        .relay(&jobs(&["A", "B", "C"]), &mock_server.uri())
        .await
        .unwrap();

    // Two pauses: none after the last record
    assert!(started.elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn test_relay_unreachable_webhook_records_errors() {
    // Port 9 on localhost is expected to refuse connections
    let relay = WebhookRelay::new(Duration::from_secs(2), Duration::ZERO).unwrap();
    let summary = relay
        .relay(&jobs(&["A", "B"]), "http://127.0.0.1:9/hook")
        .await
        .unwrap();

    assert!(summary.all_failed());
    let results = summary.results.unwrap();
    assert!(results.iter().all(|r| r.error.is_some()));
}
